//! Per-segment packet storage.

use crate::backoff::Backoff;
use crate::id::StackId;
use crate::stack::TransitStack;
use std::collections::{BTreeMap, BTreeSet};

/// Packets owned by one segment, keyed by a per-segment id.
///
/// Alongside the packets themselves the table tracks which ids changed this
/// tick (and must be synced) and which are scheduled for removal. Both sets
/// are drained once per tick by [`crate::sync::flush`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitTable {
    stacks: BTreeMap<StackId, TransitStack>,
    needs_sync: BTreeSet<StackId>,
    pending_delete: BTreeSet<StackId>,
    next_id: u32,
}

impl TransitTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn get(&self, id: StackId) -> Option<&TransitStack> {
        self.stacks.get(&id)
    }

    pub fn get_mut(&mut self, id: StackId) -> Option<&mut TransitStack> {
        self.stacks.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StackId, &TransitStack)> {
        self.stacks.iter().map(|(&id, s)| (id, s))
    }

    pub fn ids(&self) -> Vec<StackId> {
        self.stacks.keys().copied().collect()
    }

    /// The id the next packet will receive.
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Store a packet under a freshly allocated id.
    pub fn add(&mut self, stack: TransitStack) -> StackId {
        let id = StackId(self.next_id);
        self.next_id += 1;
        self.stacks.insert(id, stack);
        id
    }

    /// Store a packet under a known id (restoring from a save). The id
    /// counter is advanced past it so it is never handed out again.
    pub fn restore(&mut self, id: StackId, stack: TransitStack) {
        self.reserve_through(id);
        self.stacks.insert(id, stack);
    }

    /// Make sure no id up to and including `id` is allocated again.
    pub fn reserve_through(&mut self, id: StackId) {
        self.next_id = self.next_id.max(id.0.saturating_add(1));
    }

    pub(crate) fn set_next_id(&mut self, next_id: u32) {
        self.next_id = self.next_id.max(next_id);
    }

    pub fn remove(&mut self, id: StackId) -> Option<TransitStack> {
        self.needs_sync.remove(&id);
        self.pending_delete.remove(&id);
        self.stacks.remove(&id)
    }

    /// Drop every packet, keeping the id counter.
    pub fn clear(&mut self) {
        self.stacks.clear();
        self.needs_sync.clear();
        self.pending_delete.clear();
    }

    /// A packet arriving from a neighbor. It gets a new local id, the
    /// supplied progress, and a place in the next batched sync. The segment
    /// is not marked for save here; the tick that flushes the sync does it.
    pub fn entity_entering(&mut self, mut stack: TransitStack, progress: u32) -> StackId {
        stack.progress = progress;
        let id = self.add(stack);
        self.needs_sync.insert(id);
        id
    }

    /// Take a packet out of the table now and report its id as deleted in
    /// the next flush.
    pub fn detach(&mut self, id: StackId) -> Option<TransitStack> {
        let stack = self.stacks.remove(&id)?;
        self.needs_sync.remove(&id);
        self.pending_delete.insert(id);
        Some(stack)
    }

    pub fn mark_sync(&mut self, id: StackId) {
        self.needs_sync.insert(id);
    }

    pub fn mark_delete(&mut self, id: StackId) {
        self.pending_delete.insert(id);
    }

    pub fn needs_sync(&self) -> &BTreeSet<StackId> {
        &self.needs_sync
    }

    pub fn pending_delete(&self) -> &BTreeSet<StackId> {
        &self.pending_delete
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.needs_sync.is_empty() || !self.pending_delete.is_empty()
    }

    /// Take both pending sets, leaving them empty. Deleted packets are
    /// removed from the table; their ids are returned, never reused.
    pub(crate) fn drain_pending(&mut self) -> (BTreeSet<StackId>, BTreeSet<StackId>) {
        let deleted = std::mem::take(&mut self.pending_delete);
        for id in &deleted {
            self.stacks.remove(id);
        }
        let mut changed = std::mem::take(&mut self.needs_sync);
        changed.retain(|id| !deleted.contains(id));
        (changed, deleted)
    }
}

/// Mutable per-segment state: the packets and the ingestion pacing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentTransit {
    pub table: TransitTable,
    pub backoff: Backoff,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ItemTypeId;
    use crate::item::ItemStack;
    use crate::position::Pos;

    fn stack() -> TransitStack {
        TransitStack::new(Pos::new(0, 0, 0), None, ItemStack::new(ItemTypeId(0), 1))
    }

    #[test]
    fn ids_increase_and_are_not_reused_after_removal() {
        let mut t = TransitTable::new();
        let a = t.add(stack());
        let b = t.add(stack());
        assert!(a < b);
        t.remove(b);
        let c = t.add(stack());
        assert!(c > b);
    }

    #[test]
    fn restore_advances_counter() {
        let mut t = TransitTable::new();
        t.restore(StackId(41), stack());
        assert_eq!(t.next_id(), 42);
        assert_eq!(t.add(stack()), StackId(42));
    }

    #[test]
    fn entering_packet_is_synced_with_given_progress() {
        let mut t = TransitTable::new();
        let id = t.entity_entering(stack(), 20);
        assert_eq!(t.get(id).map(|s| s.progress), Some(20));
        assert!(t.needs_sync().contains(&id));
    }

    #[test]
    fn drain_removes_deleted_and_hides_them_from_changes() {
        let mut t = TransitTable::new();
        let a = t.entity_entering(stack(), 0);
        let b = t.entity_entering(stack(), 0);
        t.mark_delete(a);

        let (changed, deleted) = t.drain_pending();
        assert_eq!(changed.into_iter().collect::<Vec<_>>(), vec![b]);
        assert_eq!(deleted.into_iter().collect::<Vec<_>>(), vec![a]);
        assert!(t.get(a).is_none());
        assert!(t.get(b).is_some());
        assert!(!t.has_pending_changes());
    }

    #[test]
    fn detach_removes_now_and_reports_later() {
        let mut t = TransitTable::new();
        let a = t.entity_entering(stack(), 0);
        assert!(t.detach(a).is_some());
        assert!(t.get(a).is_none());
        assert!(t.detach(a).is_none());

        let (changed, deleted) = t.drain_pending();
        assert!(changed.is_empty());
        assert!(deleted.contains(&a));
    }
}
