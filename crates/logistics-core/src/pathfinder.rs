//! Path search over one network.
//!
//! Directed routes are found with a Dijkstra search across segments,
//! weighted by each segment's [`Segment::cost`]. Inventories next to visited
//! segments are candidate destinations when they accept the offered stack.
//! Direct and round-robin routing share the search and differ only in which
//! candidate they pick. Idle routes do not search: they walk in a straight
//! line.

use crate::fixed::Fixed64;
use crate::item::{Color, ItemStack};
use crate::network::{Network, Topology};
use crate::position::{Pos, Side};
use crate::segment::{Segment, SegmentKind};
use crate::stack::{PathType, ResolvedRoute};
use crate::world::World;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

/// A reachable inventory that accepts the offered stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Segments from the start to the last segment, then the inventory.
    pub path: Vec<Pos>,
    pub target: Pos,
    /// Items the inventory would take.
    pub accepted: u32,
    pub cost: Fixed64,
}

/// Which inventories count as destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    /// Any accepting inventory except `exclude` (usually the packet's home).
    Any { exclude: Option<Pos> },
    /// Only the inventory at this position, offered as a return trip.
    Exactly(Pos),
}

/// One route query.
#[derive(Debug, Clone, Copy)]
pub struct Search<'a> {
    pub start: &'a Segment,
    pub network: &'a Network,
    pub offer: &'a ItemStack,
    pub color: Option<Color>,
    /// Smallest acceptable amount; zero is treated as one.
    pub min: u32,
    pub goal: Goal,
}

impl Search<'_> {
    /// Every accepting destination, in increasing cost order.
    pub fn destinations<W: World + ?Sized>(&self, topo: &Topology<'_>, world: &W) -> Vec<Destination> {
        let min = self.min.max(1);
        let return_trip = matches!(self.goal, Goal::Exactly(_));

        let mut best: BTreeMap<Pos, Fixed64> = BTreeMap::new();
        let mut prev: BTreeMap<Pos, Pos> = BTreeMap::new();
        let mut heap = BinaryHeap::new();
        let mut found: Vec<Destination> = Vec::new();

        best.insert(self.start.pos, Fixed64::ZERO);
        heap.push(Reverse((Fixed64::ZERO, self.start.pos)));

        while let Some(Reverse((cost, pos))) = heap.pop() {
            if best.get(&pos).is_some_and(|&c| cost > c) {
                continue;
            }
            let Some((_, seg)) = topo.segment_at(self.network, pos) else {
                continue;
            };
            for side in Side::ALL {
                if !seg.can_emit_to(side) {
                    continue;
                }
                let next = pos.offset(side);
                if let Some((_, next_seg)) = topo.segment_at(self.network, next) {
                    if !next_seg.accepts_packet(self.color, side) {
                        continue;
                    }
                    let next_cost = cost.saturating_add(next_seg.cost);
                    if best.get(&next).is_none_or(|&c| next_cost < c) {
                        best.insert(next, next_cost);
                        prev.insert(next, pos);
                        heap.push(Reverse((next_cost, next)));
                    }
                    continue;
                }
                if !self.wants(next) || found.iter().any(|d| d.target == next) || !world.has_inventory(next) {
                    continue;
                }
                let accepted = world.can_accept(next, side.opposite(), self.color, self.offer, return_trip);
                if accepted >= min {
                    let mut path = walk_back(&prev, self.start.pos, pos);
                    path.push(next);
                    found.push(Destination {
                        path,
                        target: next,
                        accepted,
                        cost,
                    });
                    if return_trip {
                        return found;
                    }
                }
            }
        }
        found
    }

    fn wants(&self, pos: Pos) -> bool {
        match self.goal {
            Goal::Any { exclude } => exclude != Some(pos),
            Goal::Exactly(target) => target == pos,
        }
    }

    /// The cheapest accepting destination.
    pub fn direct<W: World + ?Sized>(&self, topo: &Topology<'_>, world: &W) -> Option<Destination> {
        self.destinations(topo, world).into_iter().next()
    }

    /// The destination after the one `cursor` last picked for `key`, in
    /// position order, wrapping around. Advances the cursor.
    pub fn round_robin<W: World + ?Sized>(
        &self,
        topo: &Topology<'_>,
        world: &W,
        cursors: &mut RoundRobinCursors,
        key: Pos,
    ) -> Option<Destination> {
        let mut candidates = self.destinations(topo, world);
        candidates.sort_by_key(|d| d.target);
        let last = cursors.last(key);
        let index = last
            .and_then(|l| candidates.iter().position(|d| d.target > l))
            .unwrap_or(0);
        let chosen = (index < candidates.len()).then(|| candidates.swap_remove(index))?;
        cursors.advance(key, chosen.target);
        Some(chosen)
    }
}

fn walk_back(prev: &BTreeMap<Pos, Pos>, start: Pos, end: Pos) -> Vec<Pos> {
    let mut path = vec![end];
    let mut cur = end;
    while cur != start {
        match prev.get(&cur) {
            Some(&p) => {
                path.push(p);
                cur = p;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Per-source rotation state for round-robin routing, keyed by the position
/// of the inventory (usually a sorter) the packets leave from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundRobinCursors {
    last: BTreeMap<Pos, Pos>,
}

impl RoundRobinCursors {
    pub fn new() -> Self {
        Self::default()
    }

    /// The destination most recently chosen for `source`.
    pub fn last(&self, source: Pos) -> Option<Pos> {
        self.last.get(&source).copied()
    }

    pub fn advance(&mut self, source: Pos, target: Pos) {
        self.last.insert(source, target);
    }

    pub fn reset(&mut self, source: Pos) {
        self.last.remove(&source);
    }
}

/// Walk from `start` along `dir` across segments the packet may enter,
/// stopping before restrictive segments. Returns the route if the packet
/// moves at least one segment.
fn walk_line(
    topo: &Topology<'_>,
    network: &Network,
    start: &Segment,
    color: Option<Color>,
    dir: Side,
) -> Option<ResolvedRoute> {
    let mut path = vec![start.pos];
    let mut cur = start;
    while cur.can_emit_to(dir) {
        let next = cur.pos.offset(dir);
        match topo.segment_at(network, next) {
            Some((_, seg)) if seg.kind != SegmentKind::Restrictive && seg.accepts_packet(color, dir) => {
                path.push(next);
                cur = seg;
            }
            _ => break,
        }
    }
    if path.len() < 2 {
        return None;
    }
    path.push(cur.pos.offset(dir));
    Some(ResolvedRoute {
        path,
        path_type: PathType::Idle,
        idle_dir: Some(dir),
    })
}

/// An idle route: keep wandering along `idle_dir` if possible, otherwise
/// turn to the first direction that moves the packet, otherwise hold on
/// this segment facing an emit-capable side. `None` only if the segment
/// cannot emit anywhere.
pub fn idle_route(
    topo: &Topology<'_>,
    network: &Network,
    start: &Segment,
    color: Option<Color>,
    idle_dir: Option<Side>,
) -> Option<ResolvedRoute> {
    let preferred = idle_dir.into_iter();
    let others = Side::ALL.into_iter().filter(|&s| Some(s) != idle_dir);
    for dir in preferred.chain(others) {
        if let Some(route) = walk_line(topo, network, start, color, dir) {
            return Some(route);
        }
    }

    let hold = idle_dir
        .filter(|&d| start.can_emit_to(d))
        .or_else(|| Side::ALL.into_iter().find(|&s| start.can_emit_to(s)))?;
    Some(ResolvedRoute {
        path: vec![start.pos, start.pos.offset(hold)],
        path_type: PathType::Idle,
        idle_dir: Some(hold),
    })
}
