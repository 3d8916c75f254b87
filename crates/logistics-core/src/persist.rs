//! Persistence of a segment's transit table.
//!
//! Two formats, both `bitcode` with a versioned header:
//!
//! - the full save, holding every packet's routing state and the id counter;
//! - the update tag, holding only what an observer needs to draw packets.

use crate::id::StackId;
use crate::item::{Color, ItemStack};
use crate::position::{Pos, Side};
use crate::stack::{PathType, RoutePolicy, TransitStack, FULL_PROGRESS};
use crate::sync::ClientStack;
use crate::table::TransitTable;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a full transit save.
pub const TRANSIT_MAGIC: u32 = 0x7C0A_0001;

/// Magic number identifying an update tag.
pub const UPDATE_TAG_MAGIC: u32 = 0x7C0A_0002;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{expected:08X}, got 0x{found:08X}")]
    InvalidMagic { expected: u32, found: u32 },
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("save from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveHeader {
    pub magic: u32,
    pub version: u32,
}

impl SaveHeader {
    pub fn new(magic: u32) -> Self {
        Self {
            magic,
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self, magic: u32) -> Result<(), PersistError> {
        if self.magic != magic {
            return Err(PersistError::InvalidMagic {
                expected: magic,
                found: self.magic,
            });
        }
        if self.version > FORMAT_VERSION {
            return Err(PersistError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(PersistError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Full save
// ---------------------------------------------------------------------------

/// One packet as written to disk. Optional fields let a damaged record
/// decode so it can be rejected on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredStack {
    pub id: u32,
    pub payload: Option<ItemStack>,
    pub progress: u32,
    pub color: Option<Color>,
    pub original_location: Option<Pos>,
    pub home_location: Option<Pos>,
    pub path_type: PathType,
    /// Written for delivering packets only. Idle packets keep their
    /// direction instead and re-route after loading.
    pub path: Option<Vec<Pos>>,
    pub idle_dir: Option<Side>,
    pub policy: RoutePolicy,
}

impl StoredStack {
    pub fn from_stack(id: StackId, stack: &TransitStack) -> Self {
        let path = (stack.path_type.delivers() && stack.has_path()).then(|| stack.path.clone());
        Self {
            id: id.0,
            payload: Some(stack.payload.clone()),
            progress: stack.progress,
            color: stack.color,
            original_location: Some(stack.original_location),
            home_location: Some(stack.home_location),
            path_type: stack.path_type,
            path,
            idle_dir: stack.idle_dir,
            policy: stack.policy,
        }
    }

    /// Rebuild the packet, or `None` if the record is malformed.
    pub fn into_stack(self) -> Option<TransitStack> {
        let payload = self.payload.filter(|p| !p.is_empty())?;
        if self.progress >= FULL_PROGRESS {
            return None;
        }
        let path = match (self.path_type, self.path) {
            (PathType::None, Some(path)) if !path.is_empty() => return None,
            (PathType::Dest | PathType::Home, Some(path)) if path.len() >= 2 => path,
            (PathType::Dest | PathType::Home, _) => return None,
            _ => Vec::new(),
        };
        Some(TransitStack {
            payload,
            progress: self.progress,
            color: self.color,
            initiated_path: !path.is_empty(),
            path,
            path_type: self.path_type,
            original_location: self.original_location?,
            home_location: self.home_location?,
            idle_dir: self.idle_dir,
            policy: self.policy,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TransitSave {
    header: SaveHeader,
    next_id: u32,
    stacks: Vec<StoredStack>,
}

/// Encode the whole table. Entries are written in id order.
pub fn save_transit(table: &TransitTable) -> Result<Vec<u8>, PersistError> {
    let save = TransitSave {
        header: SaveHeader::new(TRANSIT_MAGIC),
        next_id: table.next_id(),
        stacks: table.iter().map(|(id, s)| StoredStack::from_stack(id, s)).collect(),
    };
    bitcode::serialize(&save).map_err(|e| PersistError::Encode(e.to_string()))
}

/// Decode a full save into a fresh table.
///
/// Malformed records are skipped, but their ids stay reserved so they are
/// never handed out again.
pub fn load_transit(data: &[u8]) -> Result<TransitTable, PersistError> {
    let save: TransitSave = bitcode::deserialize(data).map_err(|e| PersistError::Decode(e.to_string()))?;
    save.header.validate(TRANSIT_MAGIC)?;

    let mut table = TransitTable::new();
    table.set_next_id(save.next_id);
    let mut skipped = 0usize;
    for record in save.stacks {
        let id = StackId(record.id);
        table.reserve_through(id);
        match record.into_stack() {
            Some(stack) => table.restore(id, stack),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::warn!(skipped, kept = table.len(), "skipped malformed transit records");
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Update tag
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct UpdateTag {
    header: SaveHeader,
    segment: Pos,
    entries: Vec<(StackId, ClientStack)>,
}

/// Encode the observer view of every packet on the segment at `segment`.
pub fn write_update_tag(table: &TransitTable, segment: Pos) -> Result<Vec<u8>, PersistError> {
    let tag = UpdateTag {
        header: SaveHeader::new(UPDATE_TAG_MAGIC),
        segment,
        entries: table.iter().map(|(id, s)| (id, ClientStack::of(s, segment))).collect(),
    };
    bitcode::serialize(&tag).map_err(|e| PersistError::Encode(e.to_string()))
}

/// Decode an update tag into the segment position and its packets.
pub fn read_update_tag(data: &[u8]) -> Result<(Pos, Vec<(StackId, ClientStack)>), PersistError> {
    let tag: UpdateTag = bitcode::deserialize(data).map_err(|e| PersistError::Decode(e.to_string()))?;
    tag.header.validate(UPDATE_TAG_MAGIC)?;
    Ok((tag.segment, tag.entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ItemTypeId;
    use crate::stack::ResolvedRoute;

    fn p(x: i32) -> Pos {
        Pos::new(x, 0, 0)
    }

    fn dest(progress: u32) -> TransitStack {
        let mut s = TransitStack::new(p(-1), Some(Color::Red), ItemStack::new(ItemTypeId(4), 9));
        s.apply_route(ResolvedRoute {
            path: vec![p(0), p(1), p(2)],
            path_type: PathType::Dest,
            idle_dir: None,
        });
        s.progress = progress;
        s
    }

    fn idle() -> TransitStack {
        let mut s = TransitStack::new(p(-1), None, ItemStack::new(ItemTypeId(1), 2));
        s.apply_route(ResolvedRoute {
            path: vec![p(0), p(1)],
            path_type: PathType::Idle,
            idle_dir: Some(Side::East),
        });
        s
    }

    fn encode(save: &TransitSave) -> Vec<u8> {
        bitcode::serialize(save).expect("encode")
    }

    #[test]
    fn full_save_restores_routed_packets_and_counter() {
        let mut t = TransitTable::new();
        let a = t.add(dest(30));
        t.add(dest(60));
        t.remove(a);

        let bytes = save_transit(&t).expect("save");
        let loaded = load_transit(&bytes).expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.next_id(), 2);
        let (_, s) = loaded.iter().next().expect("one packet");
        assert_eq!(s, &dest(60));
        assert_eq!(save_transit(&loaded).expect("resave"), bytes);
    }

    #[test]
    fn idle_packets_reload_unrouted_with_direction() {
        let mut t = TransitTable::new();
        let id = t.add(idle());
        let loaded = load_transit(&save_transit(&t).expect("save")).expect("load");
        let s = loaded.get(id).expect("kept");
        assert_eq!(s.path_type, PathType::Idle);
        assert_eq!(s.idle_dir, Some(Side::East));
        assert!(s.path.is_empty());
        assert!(!s.initiated_path);
    }

    #[test]
    fn malformed_records_are_skipped_but_reserve_ids() {
        let good = StoredStack::from_stack(StackId(0), &dest(10));
        let empty = StoredStack {
            id: 5,
            payload: Some(ItemStack::new(ItemTypeId(0), 0)),
            ..good.clone()
        };
        let missing = StoredStack {
            id: 6,
            payload: None,
            ..good.clone()
        };
        let overflowed = StoredStack {
            id: 7,
            progress: 100,
            ..good.clone()
        };
        let unrouted_with_path = StoredStack {
            id: 8,
            path_type: PathType::None,
            ..good.clone()
        };
        let save = TransitSave {
            header: SaveHeader::new(TRANSIT_MAGIC),
            next_id: 1,
            stacks: vec![good, empty, missing, overflowed, unrouted_with_path],
        };

        let mut loaded = load_transit(&encode(&save)).expect("load");
        assert_eq!(loaded.len(), 1);
        assert!(loaded.get(StackId(0)).is_some());
        assert_eq!(loaded.add(dest(0)), StackId(9));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let t = TransitTable::new();
        let tag = write_update_tag(&t, p(0)).expect("tag");
        assert!(matches!(
            load_transit(&tag),
            Err(PersistError::Decode(_) | PersistError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn future_version_is_rejected() {
        let save = TransitSave {
            header: SaveHeader {
                magic: TRANSIT_MAGIC,
                version: FORMAT_VERSION + 1,
            },
            next_id: 0,
            stacks: Vec::new(),
        };
        assert!(matches!(load_transit(&encode(&save)), Err(PersistError::FutureVersion(_))));
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(load_transit(&[1, 2, 3]), Err(PersistError::Decode(_))));
    }

    #[test]
    fn update_tag_carries_render_fields() {
        let mut t = TransitTable::new();
        let id = t.add(dest(40));
        let (segment, entries) = read_update_tag(&write_update_tag(&t, p(0)).expect("tag")).expect("read");
        assert_eq!(segment, p(0));
        assert_eq!(entries.len(), 1);
        let (read_id, view) = &entries[0];
        assert_eq!(*read_id, id);
        assert_eq!(view.progress, 40);
        assert_eq!(view.client_next, Some(p(1)));
        assert_eq!(view.client_prev, Some(p(-1)));
        assert_eq!(view.color, Some(Color::Red));
    }
}
