//! Differential sync toward observers.
//!
//! A packet's first appearance is announced on its own ([`SyncMessage::Spawned`]).
//! Every later change made during a tick is collected in the segment's
//! transit table and flushed as at most one [`SegmentUpdate`] per segment per
//! tick.

use crate::id::StackId;
use crate::item::{Color, ItemStack};
use crate::position::Pos;
use crate::stack::{PathType, TransitStack};
use crate::table::TransitTable;
use serde::{Deserialize, Serialize};

/// What an observer needs to draw and track one packet. No routing state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStack {
    pub payload: ItemStack,
    pub progress: u32,
    pub color: Option<Color>,
    pub original_location: Pos,
    pub path_type: PathType,
    pub client_next: Option<Pos>,
    pub client_prev: Option<Pos>,
}

impl ClientStack {
    /// Project a packet owned by the segment at `segment`.
    pub fn of(stack: &TransitStack, segment: Pos) -> Self {
        Self {
            payload: stack.payload.clone(),
            progress: stack.progress,
            color: stack.color,
            original_location: stack.original_location,
            path_type: stack.path_type,
            client_next: stack.next_hop(segment),
            client_prev: stack.prev_hop(segment),
        }
    }
}

/// One segment's batched changes for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentUpdate {
    pub segment: Pos,
    pub changed: Vec<(StackId, ClientStack)>,
    pub deleted: Vec<StackId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMessage {
    /// A packet was just inserted into the network.
    Spawned {
        segment: Pos,
        id: StackId,
        stack: ClientStack,
    },
    /// The batched changes of one tick.
    Update(SegmentUpdate),
}

impl SyncMessage {
    pub fn segment(&self) -> Pos {
        match self {
            SyncMessage::Spawned { segment, .. } => *segment,
            SyncMessage::Update(update) => update.segment,
        }
    }
}

/// Receives sync messages for every observer of a segment. Delivery is
/// fire-and-forget.
pub trait SyncSink {
    fn send(&mut self, message: SyncMessage);
}

impl SyncSink for Vec<SyncMessage> {
    fn send(&mut self, message: SyncMessage) {
        self.push(message);
    }
}

/// Drain the table's pending sets into one update. Returns `None` when the
/// tick changed nothing. Deleted packets are removed from the table.
pub fn flush(table: &mut TransitTable, segment: Pos) -> Option<SegmentUpdate> {
    if !table.has_pending_changes() {
        return None;
    }
    let (changed, deleted) = table.drain_pending();
    let changed = changed
        .into_iter()
        .filter_map(|id| table.get(id).map(|s| (id, ClientStack::of(s, segment))))
        .collect();
    Some(SegmentUpdate {
        segment,
        changed,
        deleted: deleted.into_iter().collect(),
    })
}
