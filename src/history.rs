//! Undo for styling changes made during a wizard session.

use std::collections::VecDeque;

use crate::styling::Styling;

pub const DEFAULT_HISTORY_DEPTH: usize = 50;

/// Bounded linear history of styling snapshots. No redo.
#[derive(Debug, Clone)]
pub struct StyleHistory {
    snapshots: VecDeque<Styling>,
    max_depth: usize,
}

impl Default for StyleHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_DEPTH)
    }
}

impl StyleHistory {
    pub fn with_capacity(max_depth: usize) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(max_depth.min(DEFAULT_HISTORY_DEPTH)),
            max_depth: max_depth.max(1),
        }
    }

    /// Push a snapshot, dropping the oldest once full.
    pub fn push(&mut self, snapshot: Styling) {
        self.snapshots.push_back(snapshot);
        if self.snapshots.len() > self.max_depth {
            self.snapshots.pop_front();
        }
    }

    /// Most recent snapshot, or `None` when there is nothing to undo.
    pub fn pop(&mut self) -> Option<Styling> {
        self.snapshots.pop_back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

/// Live styling plus its history.
///
/// Every change pushes the previous value before applying the new one.
#[derive(Debug, Clone, Default)]
pub struct StyleEditor {
    current: Styling,
    history: StyleHistory,
}

impl StyleEditor {
    pub fn new(initial: Styling) -> Self {
        Self {
            current: initial,
            history: StyleHistory::default(),
        }
    }

    pub fn current(&self) -> &Styling {
        &self.current
    }

    /// Replace the styling. A value equal to the current one is not
    /// recorded.
    pub fn set(&mut self, next: Styling) {
        if next == self.current {
            return;
        }
        let previous = std::mem::replace(&mut self.current, next);
        self.history.push(previous);
    }

    /// Change the styling through a closure working on a copy.
    pub fn update(&mut self, f: impl FnOnce(&mut Styling)) {
        let mut next = self.current.clone();
        f(&mut next);
        self.set(next);
    }

    /// Restore the previous styling and return it.
    pub fn undo(&mut self) -> Option<Styling> {
        let previous = self.history.pop()?;
        self.current = previous.clone();
        Some(previous)
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Start a new session from `styling` with an empty history.
    pub fn reset(&mut self, styling: Styling) {
        self.current = styling;
        self.history.clear();
    }
}
