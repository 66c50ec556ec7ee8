//! Bounded, oldest-first conversation history.

use finguru_core::message::Turn;
use std::collections::VecDeque;

/// Default number of turns kept per user (five exchanges).
pub const DEFAULT_HISTORY_CAP: usize = 10;

/// A capped FIFO of conversation turns.
///
/// Turns are only ever appended as user/assistant pairs, so with an even cap
/// the history always starts on a user turn.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<Turn>,
    cap: usize,
}

impl ConversationHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(cap + 2),
            cap,
        }
    }

    /// Append one user/assistant exchange, evicting the oldest turns past the cap.
    pub fn push_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.turns.push_back(Turn::user(user));
        self.turns.push_back(Turn::assistant(assistant));
        while self.turns.len() > self.cap {
            self.turns.pop_front();
        }
    }

    /// The last `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &Turn> {
        self.turns.iter().skip(self.turns.len().saturating_sub(n))
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Owned snapshot of every turn.
    pub fn to_vec(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}
