//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::engine::Engine;
use crate::id::{ItemTypeId, SegmentId};
use crate::item::{Color, ItemStack};
use crate::position::{Pos, Side};
use crate::segment::{ConnectionType, Segment};
use crate::tier::{TierSpec, TierTable};
use crate::world::World;
use std::collections::BTreeMap;

// ===========================================================================
// Item constructors
// ===========================================================================

pub fn iron() -> ItemTypeId {
    ItemTypeId(0)
}
pub fn copper() -> ItemTypeId {
    ItemTypeId(1)
}
pub fn gear() -> ItemTypeId {
    ItemTypeId(2)
}

pub fn stack(item: ItemTypeId, quantity: u32) -> ItemStack {
    ItemStack::new(item, quantity)
}

pub fn at(x: i32) -> Pos {
    Pos::new(x, 0, 0)
}

// ===========================================================================
// Mock inventories
// ===========================================================================

/// A capacity-limited chest.
#[derive(Debug, Clone, Default)]
pub struct Chest {
    pub items: BTreeMap<ItemTypeId, u32>,
    pub capacity: u32,
    /// If set, only packets of this color are accepted.
    pub input_color: Option<Color>,
    /// Accept items only on return trips.
    pub return_only: bool,
}

impl Chest {
    pub fn total(&self) -> u32 {
        self.items.values().sum()
    }

    pub fn space(&self) -> u32 {
        self.capacity.saturating_sub(self.total())
    }

    pub fn count(&self, item: ItemTypeId) -> u32 {
        self.items.get(&item).copied().unwrap_or(0)
    }
}

/// An in-memory world of chests that records spills and untracked packets.
#[derive(Debug, Clone, Default)]
pub struct MockWorld {
    pub chests: BTreeMap<Pos, Chest>,
    pub spilled: Vec<(Pos, ItemStack)>,
    pub untracked: Vec<(Pos, ItemStack)>,
    /// Every successful insert, in order.
    pub deliveries: Vec<(Pos, ItemStack)>,
    /// Caps every extraction, for sources that hand over less than they
    /// advertised.
    pub extract_limit: Option<u32>,
}

impl MockWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chest(&mut self, pos: Pos, capacity: u32) -> &mut Chest {
        self.chests.insert(
            pos,
            Chest {
                capacity,
                ..Chest::default()
            },
        );
        self.chests.get_mut(&pos).expect("just inserted")
    }

    pub fn put(&mut self, pos: Pos, item: ItemTypeId, quantity: u32) {
        if let Some(chest) = self.chests.get_mut(&pos) {
            *chest.items.entry(item).or_insert(0) += quantity;
        }
    }

    pub fn count(&self, pos: Pos, item: ItemTypeId) -> u32 {
        self.chests.get(&pos).map_or(0, |c| c.count(item))
    }

    pub fn spilled_total(&self) -> u32 {
        self.spilled.iter().map(|(_, s)| s.quantity).sum()
    }
}

impl World for MockWorld {
    fn has_inventory(&self, pos: Pos) -> bool {
        self.chests.contains_key(&pos)
    }

    fn available(&self, pos: Pos, _side: Side, max: u32) -> Vec<ItemStack> {
        self.chests.get(&pos).map_or_else(Vec::new, |chest| {
            chest
                .items
                .iter()
                .filter(|&(_, &n)| n > 0)
                .map(|(&item, &n)| ItemStack::new(item, n.min(max)))
                .collect()
        })
    }

    fn extract(&mut self, pos: Pos, _side: Side, stack: &ItemStack) -> u32 {
        let Some(chest) = self.chests.get_mut(&pos) else {
            return 0;
        };
        let Some(have) = chest.items.get_mut(&stack.item_type) else {
            return 0;
        };
        let taken = stack.quantity.min(*have).min(self.extract_limit.unwrap_or(u32::MAX));
        *have -= taken;
        if *have == 0 {
            chest.items.remove(&stack.item_type);
        }
        taken
    }

    fn can_accept(&self, pos: Pos, _side: Side, color: Option<Color>, stack: &ItemStack, return_trip: bool) -> u32 {
        let Some(chest) = self.chests.get(&pos) else {
            return 0;
        };
        if chest.return_only && !return_trip {
            return 0;
        }
        if chest.input_color.is_some() && chest.input_color != color {
            return 0;
        }
        chest.space().min(stack.quantity)
    }

    fn insert(&mut self, pos: Pos, _side: Side, stack: &ItemStack, return_trip: bool) -> ItemStack {
        let Some(chest) = self.chests.get_mut(&pos) else {
            return stack.clone();
        };
        if chest.return_only && !return_trip {
            return stack.clone();
        }
        let accepted = chest.space().min(stack.quantity);
        if accepted > 0 {
            *chest.items.entry(stack.item_type).or_insert(0) += accepted;
            self.deliveries.push((pos, stack.with_quantity(accepted)));
        }
        stack.with_quantity(stack.quantity - accepted)
    }

    fn spill(&mut self, pos: Pos, stack: ItemStack) {
        self.spilled.push((pos, stack));
    }

    fn untrack(&mut self, destination: Pos, stack: &ItemStack) {
        self.untracked.push((destination, stack.clone()));
    }
}

// ===========================================================================
// Layout builders
// ===========================================================================

pub fn tier(speed: u32, pull_amount: u32) -> TierSpec {
    TierSpec { speed, pull_amount }
}

pub fn segment(pos: Pos, spec: TierSpec) -> Segment {
    Segment::new(pos, spec, &TierTable::default())
}

/// A straight east-west line of segments from `from` to `to` (inclusive),
/// all with the given tier.
pub fn build_line(engine: &mut Engine, from: i32, to: i32, spec: TierSpec) -> Vec<SegmentId> {
    let (lo, hi) = (from.min(to), from.max(to));
    (lo..=hi)
        .map(|x| {
            engine
                .add_segment(segment(at(x), spec))
                .expect("line positions are distinct")
        })
        .collect()
}

/// A segment that pulls from the inventory on `side`.
pub fn puller(pos: Pos, spec: TierSpec, side: Side) -> Segment {
    segment(pos, spec).with_side(side, ConnectionType::Pull)
}
