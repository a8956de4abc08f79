// ============================================================================
// HISTORY MANAGER — bounded undo/redo of editing snapshots
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use image::RgbaImage;

/// Maximum number of retained undo entries; the oldest is evicted first.
pub const MAX_HISTORY: usize = 20;

/// One retrievable editing state.
///
/// The processed buffer is a full copy.  The original buffer rides along as
/// an `Arc` clone — free while the original is unchanged (brush strokes),
/// a real reference to the pre-crop image when a crop replaced it.  Undo
/// across a crop must restore both buffers or their dimensions diverge.
#[derive(Clone)]
struct Snapshot {
    original: Arc<RgbaImage>,
    processed: RgbaImage,
}

/// Linear-history undo/redo stack over whole-buffer snapshots.
///
/// Callers take exactly one snapshot per user interaction (stroke start,
/// crop confirm), never per pixel, so a whole brush drag is one undo step.
#[derive(Default)]
pub struct HistoryManager {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: Vec<Snapshot>,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the current state onto the undo stack and clear the redo stack.
    /// Once you snapshot after an undo, the discarded branch is gone.
    pub fn snapshot(&mut self, original: &Arc<RgbaImage>, processed: &RgbaImage) {
        self.undo_stack.push_back(Snapshot {
            original: Arc::clone(original),
            processed: processed.clone(),
        });
        if self.undo_stack.len() > MAX_HISTORY {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
    }

    /// Swap the current state with the most recent undo entry.
    /// Returns `false` (and leaves everything untouched) when empty.
    pub fn undo(&mut self, original: &mut Arc<RgbaImage>, processed: &mut RgbaImage) -> bool {
        let Some(prev) = self.undo_stack.pop_back() else {
            return false;
        };
        self.redo_stack.push(Snapshot {
            original: std::mem::replace(original, prev.original),
            processed: std::mem::replace(processed, prev.processed),
        });
        true
    }

    /// Symmetric counterpart of [`undo`](Self::undo).
    pub fn redo(&mut self, original: &mut Arc<RgbaImage>, processed: &mut RgbaImage) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        self.undo_stack.push_back(Snapshot {
            original: std::mem::replace(original, next.original),
            processed: std::mem::replace(processed, next.processed),
        });
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Approximate retained memory, processed copies only (the shared
    /// originals are counted once by whoever owns them).
    pub fn memory_usage(&self) -> usize {
        self.undo_stack
            .iter()
            .chain(self.redo_stack.iter())
            .map(|s| s.processed.as_raw().len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(w: u32, h: u32, v: u8) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([v, v, v, 255]))
    }

    #[test]
    fn undo_then_redo_restores_exact_bytes() {
        let mut history = HistoryManager::new();
        let mut original = Arc::new(solid(4, 4, 0));
        let mut processed = solid(4, 4, 10);

        history.snapshot(&original, &processed);
        processed = solid(4, 4, 20);
        let after = processed.clone();

        assert!(history.undo(&mut original, &mut processed));
        assert_eq!(processed.as_raw(), solid(4, 4, 10).as_raw());
        assert!(history.redo(&mut original, &mut processed));
        assert_eq!(processed.as_raw(), after.as_raw());
    }

    #[test]
    fn empty_stacks_are_no_ops() {
        let mut history = HistoryManager::new();
        let mut original = Arc::new(solid(2, 2, 0));
        let mut processed = solid(2, 2, 1);
        let before = processed.clone();

        assert!(!history.undo(&mut original, &mut processed));
        assert!(!history.redo(&mut original, &mut processed));
        assert_eq!(processed.as_raw(), before.as_raw());
    }

    #[test]
    fn twenty_five_snapshots_keep_twenty_fifo() {
        let mut history = HistoryManager::new();
        let mut original = Arc::new(solid(2, 2, 0));
        let mut processed = solid(2, 2, 0);

        for i in 0..25u8 {
            processed = solid(2, 2, i);
            history.snapshot(&original, &processed);
        }
        assert_eq!(history.undo_depth(), MAX_HISTORY);

        // Snapshots 0..=4 were evicted; walking all the way back lands on
        // the 6th-oldest state (value 5).
        let mut last = None;
        while history.undo(&mut original, &mut processed) {
            last = Some(processed.get_pixel(0, 0)[0]);
        }
        assert_eq!(last, Some(5));
    }

    #[test]
    fn snapshot_clears_redo_branch() {
        let mut history = HistoryManager::new();
        let mut original = Arc::new(solid(2, 2, 0));
        let mut processed = solid(2, 2, 1);

        history.snapshot(&original, &processed);
        processed = solid(2, 2, 2);
        assert!(history.undo(&mut original, &mut processed));
        assert!(history.can_redo());

        history.snapshot(&original, &processed);
        assert!(!history.can_redo());
        assert!(!history.redo(&mut original, &mut processed));
    }

    #[test]
    fn undo_restores_the_paired_original() {
        let mut history = HistoryManager::new();
        let mut original = Arc::new(solid(4, 4, 7));
        let mut processed = solid(4, 4, 7);

        history.snapshot(&original, &processed);
        // A crop-like replacement changes both buffers and their dimensions.
        original = Arc::new(solid(2, 2, 9));
        processed = solid(2, 2, 9);

        assert!(history.undo(&mut original, &mut processed));
        assert_eq!(original.dimensions(), (4, 4));
        assert_eq!(processed.dimensions(), (4, 4));
    }
}
