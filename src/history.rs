//! Bounded undo/redo stacks of editor snapshots.

use crate::doc::EditorState;
use std::collections::VecDeque;

pub const DEFAULT_HISTORY: usize = 100;

#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<EditorState>,
    redo: Vec<EditorState>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Remembers `previous` before a new edit. Clears the redo stack.
    pub fn record(&mut self, previous: EditorState) {
        if self.undo.len() == self.limit {
            self.undo.pop_front();
        }
        self.undo.push_back(previous);
        self.redo.clear();
    }

    /// Swaps `current` for the last recorded snapshot.
    pub fn undo(&mut self, current: EditorState) -> Result<EditorState, EditorState> {
        match self.undo.pop_back() {
            Some(previous) => {
                self.redo.push(current);
                Ok(previous)
            }
            None => Err(current),
        }
    }

    pub fn redo(&mut self, current: EditorState) -> Result<EditorState, EditorState> {
        match self.redo.pop() {
            Some(next) => {
                self.undo.push_back(current);
                Ok(next)
            }
            None => Err(current),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}
