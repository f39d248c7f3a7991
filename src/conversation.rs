//! Conversation data model
//!
//! Turns, citations and the per-session append-only store.

mod store;
mod turn;

pub use store::{ConversationStore, StoreError};
pub use turn::{Citation, CitationSource, RevealState, Role, Turn, TurnOrigin, TurnView};
