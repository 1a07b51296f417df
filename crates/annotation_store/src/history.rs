use std::collections::VecDeque;

use annokit_common::ImageAnnotation;

/// Maximum number of undo steps kept.
pub const HISTORY_CAPACITY: usize = 50;

/// The full record of one image as it was before a mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub image_id: String,
    pub record: ImageAnnotation,
}

/// Bounded undo stack plus redo stack of per-image snapshots.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            capacity,
        }
    }

    /// Record state before a new mutation. Clears the redo stack.
    pub fn push(&mut self, snapshot: Snapshot) {
        self.undo.push_back(snapshot);
        if self.undo.len() > self.capacity {
            self.undo.pop_front();
        }
        self.redo.clear();
    }

    /// Swap `current` state for the latest undo snapshot.
    ///
    /// `current` looks up the present record of an image so it can be kept
    /// for redo.
    pub fn undo(&mut self, current: impl FnOnce(&str) -> ImageAnnotation) -> Option<Snapshot> {
        let snapshot = self.undo.pop_back()?;
        self.redo.push(Snapshot {
            record: current(&snapshot.image_id),
            image_id: snapshot.image_id.clone(),
        });
        Some(snapshot)
    }

    pub fn redo(&mut self, current: impl FnOnce(&str) -> ImageAnnotation) -> Option<Snapshot> {
        let snapshot = self.redo.pop()?;
        self.undo.push_back(Snapshot {
            record: current(&snapshot.image_id),
            image_id: snapshot.image_id.clone(),
        });
        Some(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Image the next undo would restore.
    pub fn undo_target(&self) -> Option<&str> {
        self.undo.back().map(|s| s.image_id.as_str())
    }

    pub fn redo_target(&self) -> Option<&str> {
        self.redo.last().map(|s| s.image_id.as_str())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}
