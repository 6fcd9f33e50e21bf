//! Undo/redo history over annotation list snapshots
//!
//! Linear history: every mutation pushes the pre-mutation list onto the undo
//! stack and clears the redo stack. Undo/redo swap full snapshots with the
//! current list. Viewport pan/zoom and tool settings are not tracked.

use crate::annotation::Annotation;

#[derive(Debug, Default)]
pub struct History {
    undo_stack: Vec<Vec<Annotation>>,
    redo_stack: Vec<Vec<Annotation>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pre-mutation list. Clears the redo stack: a new action
    /// invalidates anything previously undone.
    pub fn push(&mut self, current: &[Annotation]) {
        self.undo_stack.push(current.to_vec());
        self.redo_stack.clear();
    }

    /// Pop the most recent snapshot and return it as the new current list,
    /// stashing `current` for redo. Returns `None` when there is nothing to
    /// undo.
    pub fn undo(&mut self, current: &[Annotation]) -> Option<Vec<Annotation>> {
        let snapshot = self.undo_stack.pop()?;
        self.redo_stack.push(current.to_vec());
        Some(snapshot)
    }

    /// Mirror image of `undo`.
    pub fn redo(&mut self, current: &[Annotation]) -> Option<Vec<Annotation>> {
        let snapshot = self.redo_stack.pop()?;
        self.undo_stack.push(current.to_vec());
        Some(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Both stacks reset whenever a new source document is loaded.
    pub fn reset(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
