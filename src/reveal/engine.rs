//! Typing reveal engine

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Default characters revealed per tick
pub const DEFAULT_STEP_CHARS: usize = 3;

/// Default delay between ticks
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(20);

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Identifies one call to `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RevealId(pub u64);

/// How fast text is typed out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealCadence {
    pub step_chars: usize,
    pub interval: Duration,
}

impl RevealCadence {
    pub fn new(step_chars: usize, interval: Duration) -> Self {
        Self {
            step_chars: step_chars.max(1),
            interval: interval.max(MIN_INTERVAL),
        }
    }
}

impl Default for RevealCadence {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_CHARS, DEFAULT_INTERVAL)
    }
}

/// Lazy, finite sequence of progressively longer prefixes of a text.
///
/// Steps count `char`s, so every prefix ends on a character boundary. The
/// last prefix is the full text; empty text yields nothing.
#[derive(Debug)]
pub struct RevealFrames {
    text: String,
    step_chars: usize,
    shown_chars: usize,
    total_chars: usize,
}

impl RevealFrames {
    pub fn new(text: impl Into<String>, step_chars: usize) -> Self {
        let text = text.into();
        let total_chars = text.chars().count();
        Self {
            text,
            step_chars: step_chars.max(1),
            shown_chars: 0,
            total_chars,
        }
    }
}

impl Iterator for RevealFrames {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.shown_chars >= self.total_chars {
            return None;
        }
        self.shown_chars = (self.shown_chars + self.step_chars).min(self.total_chars);
        let end = self
            .text
            .char_indices()
            .nth(self.shown_chars)
            .map_or(self.text.len(), |(offset, _)| offset);
        self.text.get(..end).map(str::to_string)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total_chars - self.shown_chars).div_ceil(self.step_chars);
        (remaining, Some(remaining))
    }
}

/// Receiver of reveal output
#[async_trait]
pub trait RevealSink: Send + Sync {
    /// The visible prefix after a tick
    async fn frame(&self, reveal: RevealId, turn_index: usize, visible: &str);

    /// Emitted exactly once, after the last frame, unless cancelled
    async fn completed(&self, reveal: RevealId, turn_index: usize);
}

/// Handle to a running reveal
#[derive(Debug, Clone)]
pub struct RevealHandle {
    id: RevealId,
    turn_index: usize,
    token: CancellationToken,
}

impl RevealHandle {
    pub fn id(&self) -> RevealId {
        self.id
    }

    pub fn turn_index(&self) -> usize {
        self.turn_index
    }

    /// Stop ticking. No completion is emitted afterwards.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[cfg(test)]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Owns at most one active reveal at a time
#[derive(Debug, Default)]
pub struct TypingRevealEngine {
    next_id: u64,
    active: Option<RevealHandle>,
}

impl TypingRevealEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start typing out `text` for the turn at `turn_index`.
    ///
    /// Any reveal still running is cancelled first.
    pub fn start(
        &mut self,
        turn_index: usize,
        text: impl Into<String>,
        cadence: RevealCadence,
        sink: Arc<dyn RevealSink>,
    ) -> RevealHandle {
        if let Some(stale) = self.cancel_active() {
            tracing::debug!(
                reveal = stale.id.0,
                turn_index = stale.turn_index,
                "Superseding active reveal"
            );
        }

        self.next_id += 1;
        let handle = RevealHandle {
            id: RevealId(self.next_id),
            turn_index,
            token: CancellationToken::new(),
        };
        self.active = Some(handle.clone());

        let id = handle.id;
        let token = handle.token.clone();
        let frames = RevealFrames::new(text, cadence.step_chars);
        tracing::debug!(
            reveal = id.0,
            turn_index,
            ticks = frames.size_hint().0,
            "Starting reveal"
        );

        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(Instant::now() + cadence.interval, cadence.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            for visible in frames {
                tokio::select! {
                    biased;

                    () = token.cancelled() => {
                        tracing::debug!(reveal = id.0, "Reveal cancelled");
                        return;
                    }

                    _ = ticker.tick() => {}
                }
                // A cancel can land between the tick and the frame
                if token.is_cancelled() {
                    return;
                }
                sink.frame(id, turn_index, &visible).await;
            }

            if token.is_cancelled() {
                return;
            }
            sink.completed(id, turn_index).await;
        });

        handle
    }

    /// Cancel the running reveal, if any, and return its handle
    pub fn cancel_active(&mut self) -> Option<RevealHandle> {
        let handle = self.active.take()?;
        handle.cancel();
        Some(handle)
    }

    /// Forget the active handle once its completion has been observed
    pub fn finish(&mut self, reveal: RevealId) {
        if self.active.as_ref().is_some_and(|h| h.id == reveal) {
            self.active = None;
        }
    }

    #[cfg(test)]
    pub fn active(&self) -> Option<&RevealHandle> {
        self.active.as_ref()
    }
}

impl Drop for TypingRevealEngine {
    fn drop(&mut self) {
        self.cancel_active();
    }
}
