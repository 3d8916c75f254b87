use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a conveyor segment in the engine's segment arena.
    pub struct SegmentId;

    /// Identifies a connected component of segments. Keys are versioned, so
    /// an id from before a network rebuild never aliases a new network.
    pub struct NetworkId;
}

/// Identifies an item type. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemTypeId(pub u32);

/// Identifies a packet inside one segment's transit table.
///
/// Ids are assigned from a per-segment counter and never reused while the
/// segment lives. A packet handed to a neighbor receives a new id there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StackId(pub u32);
