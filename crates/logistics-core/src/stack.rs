//! The in-transit stack: one packet's complete transit state.

use crate::item::{Color, ItemStack};
use crate::position::{Pos, Side};
use crate::segment::Segment;
use serde::{Deserialize, Serialize};

/// Progress at which a packet has fully crossed a segment.
pub const FULL_PROGRESS: u32 = 100;

/// Progress at which the halfway feasibility check runs, and where a packet
/// that re-routes without crossing a boundary is placed.
pub const HALF_PROGRESS: u32 = 50;

/// What kind of route a packet is following.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PathType {
    /// Not yet routed.
    #[default]
    None,
    /// No destination found; wandering or holding.
    Idle,
    /// Routed to an accepting destination.
    Dest,
    /// Returning to the inventory it came from.
    Home,
}

impl PathType {
    /// Whether the route ends in a real delivery.
    pub fn delivers(self) -> bool {
        matches!(self, PathType::Dest | PathType::Home)
    }
}

/// How a packet's destination is chosen when it has to be re-routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoutePolicy {
    /// Cheapest accepting destination.
    #[default]
    Direct,
    /// Next destination in the rotation kept for the packet's home position.
    RoundRobin,
}

/// A route computed by the resolver, ready to be applied to a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub path: Vec<Pos>,
    pub path_type: PathType,
    pub idle_dir: Option<Side>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitStack {
    pub payload: ItemStack,
    pub progress: u32,
    pub color: Option<Color>,
    /// Positions from the first segment to the route target.
    pub path: Vec<Pos>,
    pub path_type: PathType,
    pub original_location: Pos,
    pub home_location: Pos,
    pub initiated_path: bool,
    pub idle_dir: Option<Side>,
    pub policy: RoutePolicy,
}

impl TransitStack {
    /// A fresh, unrouted packet leaving `source`.
    pub fn new(source: Pos, color: Option<Color>, payload: ItemStack) -> Self {
        Self {
            payload,
            progress: 0,
            color,
            path: Vec::new(),
            path_type: PathType::None,
            original_location: source,
            home_location: source,
            initiated_path: false,
            idle_dir: None,
            policy: RoutePolicy::Direct,
        }
    }

    pub fn has_path(&self) -> bool {
        self.path.len() >= 2
    }

    fn index_of(&self, pos: Pos) -> Option<usize> {
        self.path.iter().position(|&p| p == pos)
    }

    /// The hop after `pos`, or `None` if `pos` is the last element or not on
    /// the path at all.
    pub fn next_hop(&self, pos: Pos) -> Option<Pos> {
        self.index_of(pos).and_then(|i| self.path.get(i + 1).copied())
    }

    /// The hop before `pos`; the first segment's predecessor is where the
    /// packet was last re-routed from.
    pub fn prev_hop(&self, pos: Pos) -> Option<Pos> {
        match self.index_of(pos)? {
            0 => Some(self.original_location),
            i => self.path.get(i - 1).copied(),
        }
    }

    /// Whether the hop after `pos` is the route target.
    pub fn is_final(&self, pos: Pos) -> bool {
        self.has_path() && self.index_of(pos) == Some(self.path.len() - 2)
    }

    /// The route target.
    pub fn target(&self) -> Option<Pos> {
        self.path.last().copied()
    }

    /// Direction of travel out of `pos`.
    pub fn side(&self, pos: Pos) -> Option<Side> {
        self.next_hop(pos).and_then(|next| Side::toward(pos, next))
    }

    /// Whether this packet may enter `segment` while travelling in direction
    /// `travel`.
    pub fn can_enter(&self, segment: &Segment, travel: Side) -> bool {
        segment.accepts_packet(self.color, travel)
    }

    pub fn apply_route(&mut self, route: ResolvedRoute) {
        self.path = route.path;
        self.path_type = route.path_type;
        self.idle_dir = route.idle_dir;
        self.initiated_path = true;
    }
}
