use crate::id::SegmentId;
use std::collections::BTreeSet;

/// Tracks which segments need saving and whether the layout changed since
/// networks were last rebuilt.
///
/// The engine marks a segment when a tick changes its persisted packets and
/// marks the layout when segments are added, removed or reconfigured. Save
/// code drains the segment set with [`take_segments`](DirtyTracker::take_segments).
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    dirty_segments: BTreeSet<SegmentId>,
    layout_dirty: bool,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_segment(&mut self, segment: SegmentId) {
        self.dirty_segments.insert(segment);
    }

    pub fn mark_layout(&mut self) {
        self.layout_dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.layout_dirty || !self.dirty_segments.is_empty()
    }

    pub fn is_segment_dirty(&self, segment: SegmentId) -> bool {
        self.dirty_segments.contains(&segment)
    }

    pub fn is_layout_dirty(&self) -> bool {
        self.layout_dirty
    }

    pub fn dirty_segments(&self) -> &BTreeSet<SegmentId> {
        &self.dirty_segments
    }

    /// Drain the segments awaiting a save.
    pub fn take_segments(&mut self) -> BTreeSet<SegmentId> {
        std::mem::take(&mut self.dirty_segments)
    }

    pub fn clear_layout(&mut self) {
        self.layout_dirty = false;
    }

    /// Stop tracking a removed segment.
    pub fn forget(&mut self, segment: SegmentId) {
        self.dirty_segments.remove(&segment);
    }
}
