//! The seam between the transport core and everything it does not own:
//! inventories next to the network and the physical world that receives
//! dropped stacks.

use crate::item::{Color, ItemStack};
use crate::position::{Pos, Side};

/// Inventories and world effects, as seen from the transport network.
///
/// `side` is always the face of the inventory being touched, i.e. the face
/// pointing back at the segment.
pub trait World {
    /// Whether an inventory exists at `pos`.
    fn has_inventory(&self, pos: Pos) -> bool;

    /// Stacks that could be pulled from the inventory at `pos` through `side`,
    /// at most `max` items per stack. Nothing is removed.
    fn available(&self, pos: Pos, side: Side, max: u32) -> Vec<ItemStack>;

    /// Remove up to `stack.quantity` of `stack.item_type`. Returns the amount
    /// removed.
    fn extract(&mut self, pos: Pos, side: Side, stack: &ItemStack) -> u32;

    /// How many items of `stack` the inventory would accept right now.
    /// `return_trip` is set for packets heading back to where they came from.
    fn can_accept(
        &self,
        pos: Pos,
        side: Side,
        color: Option<Color>,
        stack: &ItemStack,
        return_trip: bool,
    ) -> u32;

    /// Insert `stack` and return whatever was rejected (empty if everything
    /// fit).
    fn insert(&mut self, pos: Pos, side: Side, stack: &ItemStack, return_trip: bool) -> ItemStack;

    /// A packet could not be routed; its payload falls out at `pos`.
    fn spill(&mut self, pos: Pos, stack: ItemStack);

    /// A packet left the network (delivered or dropped); stop predicting its
    /// arrival at `destination`.
    fn untrack(&mut self, _destination: Pos, _stack: &ItemStack) {}
}
