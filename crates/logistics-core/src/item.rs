use crate::id::ItemTypeId;
use crate::position::{Pos, Side};
use serde::{Deserialize, Serialize};

/// A stack of fungible items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_type: ItemTypeId,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(item_type: ItemTypeId, quantity: u32) -> Self {
        Self {
            item_type,
            quantity,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }

    /// A copy of this stack holding at most `quantity` items.
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self::new(self.item_type, quantity)
    }
}

/// Color tag carried by segments and packets.
///
/// An uncolored segment accepts every packet; a colored segment accepts only
/// packets of its own color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Orange,
    Magenta,
    LightBlue,
    Yellow,
    Lime,
    Pink,
    Gray,
    Cyan,
    Purple,
    Blue,
    Brown,
    Green,
    Red,
    Black,
}

// ---------------------------------------------------------------------------
// Transit request / response
// ---------------------------------------------------------------------------

/// What a source offers to the network: candidate stacks, tried in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitRequest {
    pub candidates: Vec<ItemStack>,
}

impl TransitRequest {
    /// A request offering exactly one stack.
    pub fn simple(stack: ItemStack) -> Self {
        Self {
            candidates: vec![stack],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.iter().all(ItemStack::is_empty)
    }
}

/// The outcome of an insertion. An empty response means nothing was routed
/// and nothing should be taken from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitResponse {
    /// The portion of the request that entered the network.
    pub stack: Option<ItemStack>,
    /// Where the routed portion came from: the source position and the face
    /// of the source it leaves through.
    pub source: Pos,
    pub source_side: Side,
}

impl TransitResponse {
    pub fn empty(source: Pos, source_side: Side) -> Self {
        Self {
            stack: None,
            source,
            source_side,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stack.as_ref().is_none_or(ItemStack::is_empty)
    }

    /// Number of items routed.
    pub fn quantity(&self) -> u32 {
        self.stack.as_ref().map_or(0, |s| s.quantity)
    }

    /// Take the routed items out of the source inventory. Returns the amount
    /// actually extracted.
    pub fn use_all<W: crate::world::World + ?Sized>(&self, world: &mut W) -> u32 {
        match &self.stack {
            Some(stack) if !stack.is_empty() => world.extract(self.source, self.source_side, stack),
            _ => 0,
        }
    }
}
