//! Reveal gate
//!
//! Citations, suggestions and the display timestamp of a turn stay hidden
//! until the gate sees its reveal complete and marks the turn complete.

use super::engine::{RevealHandle, RevealId};
use crate::conversation::{ConversationStore, StoreError};

/// Watches at most one reveal
#[derive(Debug, Default)]
pub struct RevealGate {
    watching: Option<(RevealId, usize)>,
}

impl RevealGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watch(&mut self, handle: &RevealHandle) {
        self.watching = Some((handle.id(), handle.turn_index()));
    }

    /// Stop watching without completing. Returns the turn index that was watched.
    pub fn release(&mut self) -> Option<usize> {
        self.watching.take().map(|(_, index)| index)
    }

    #[cfg(test)]
    pub fn watching(&self) -> Option<usize> {
        self.watching.map(|(_, index)| index)
    }

    /// Handle a completion signal.
    ///
    /// Only the watched reveal unlocks its turn; signals from cancelled or
    /// superseded reveals are ignored. Returns the index that was completed.
    pub fn on_completed(
        &mut self,
        reveal: RevealId,
        store: &mut ConversationStore,
    ) -> Result<Option<usize>, StoreError> {
        match self.watching {
            Some((id, index)) if id == reveal => {
                self.watching = None;
                store.mark_complete(index)?;
                Ok(Some(index))
            }
            _ => Ok(None),
        }
    }
}
