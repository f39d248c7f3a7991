//! Append-only conversation store
//!
//! One store per mounted session. Turns are only ever appended, flipped
//! forward through their reveal states, or dropped all at once by `clear`.

use super::turn::{RevealState, Turn};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("No turn at index {0}")]
    NoSuchTurn(usize),
    #[error("Turn {requested} cannot start revealing while turn {active} is revealing")]
    AlreadyRevealing { requested: usize, active: usize },
    #[error("Turn {0} is not pending")]
    NotPending(usize),
}

/// Ordered sequence of turns owned by a single session
#[derive(Debug, Default)]
pub struct ConversationStore {
    turns: Vec<Turn>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to a single pending greeting turn and return its index.
    ///
    /// The caller starts the reveal for the returned index.
    pub fn initialize(&mut self, greeting: &str) -> usize {
        self.turns.clear();
        self.append(Turn::greeting(greeting))
    }

    /// Add a turn to the end. Role alternation is not checked.
    pub fn append(&mut self, turn: Turn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    /// Move a pending turn into `Revealing`
    pub fn mark_revealing(&mut self, index: usize) -> Result<(), StoreError> {
        if let Some(active) = self.revealing_index() {
            if active != index {
                return Err(StoreError::AlreadyRevealing {
                    requested: index,
                    active,
                });
            }
        }
        let turn = self
            .turns
            .get_mut(index)
            .ok_or(StoreError::NoSuchTurn(index))?;
        match turn.reveal_state {
            RevealState::Pending => {
                turn.reveal_state = RevealState::Revealing;
                Ok(())
            }
            RevealState::Revealing => Ok(()),
            RevealState::Complete => Err(StoreError::NotPending(index)),
        }
    }

    /// Flip a turn to `Complete`. Returns whether anything changed.
    ///
    /// Once complete a turn never re-enters the reveal cycle, so re-rendering
    /// history does not re-animate it.
    pub fn mark_complete(&mut self, index: usize) -> Result<bool, StoreError> {
        let turn = self
            .turns
            .get_mut(index)
            .ok_or(StoreError::NoSuchTurn(index))?;
        if turn.is_complete() {
            return Ok(false);
        }
        turn.reveal_state = RevealState::Complete;
        Ok(true)
    }

    /// Drop every turn. The owning session cancels its reveal before calling this.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn get_all(&self) -> &[Turn] {
        &self.turns
    }

    pub fn get(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn revealing_index(&self) -> Option<usize> {
        self.turns
            .iter()
            .position(|t| t.reveal_state == RevealState::Revealing)
    }
}
