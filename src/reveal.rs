//! Progressive reveal of assistant text
//!
//! The engine types a turn out on a fixed local cadence; the gate flips the
//! turn to complete once the engine reports the reveal finished.

mod engine;
mod gate;

pub use engine::{
    RevealCadence, RevealFrames, RevealHandle, RevealId, RevealSink, TypingRevealEngine,
    DEFAULT_INTERVAL, DEFAULT_STEP_CHARS,
};
pub use gate::RevealGate;
