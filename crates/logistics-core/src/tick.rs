//! The per-segment server tick: ingestion, packet advancement, and the
//! end-of-tick sync flush.
//!
//! A tick only ever mutates the ticking segment's own [`SegmentTransit`].
//! Packets that cross into a neighbor leave as [`Handoff`]s in the returned
//! [`TickOutcome`]; the engine applies them to the neighbor right after this
//! segment finishes, so a packet is owned by exactly one table at any time
//! the engine can observe.

use crate::id::{SegmentId, StackId};
use crate::insert::{insert, Offer};
use crate::item::{ItemStack, TransitRequest};
use crate::network::{Network, Topology};
use crate::pathfinder::RoundRobinCursors;
use crate::position::{Pos, Side};
use crate::resolver::{BoundaryHint, Router};
use crate::segment::Segment;
use crate::stack::{PathType, RoutePolicy, TransitStack, FULL_PROGRESS, HALF_PROGRESS};
use crate::sync::{self, SegmentUpdate, SyncMessage};
use crate::table::SegmentTransit;
use crate::world::World;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// A packet crossing into the neighbor `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub to: SegmentId,
    pub stack: TransitStack,
    /// Progress carried over past the boundary.
    pub progress: u32,
}

/// A payload that reached its destination in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub target: Pos,
    pub stack: ItemStack,
    pub path_type: PathType,
}

/// Everything one segment tick produced besides its own table changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Announcements for packets pulled in during ingestion.
    pub spawned: Vec<SyncMessage>,
    /// The batched changes of this tick, if any.
    pub update: Option<SegmentUpdate>,
    pub handoffs: Vec<Handoff>,
    pub delivered: Vec<Delivery>,
    /// Payloads spilled into the world, and where.
    pub dropped: Vec<(Pos, ItemStack)>,
    /// The segment's persisted state changed.
    pub mark_dirty: bool,
}

// ---------------------------------------------------------------------------
// Tick context
// ---------------------------------------------------------------------------

struct Cx<'a, 'w, W: World + ?Sized> {
    segment: &'a Segment,
    network: &'a Network,
    topo: Topology<'a>,
    world: &'w mut W,
    cursors: &'w mut RoundRobinCursors,
}

/// What happens to one packet after it advanced.
enum Fate {
    Stay { resync: bool },
    Drop,
    Handoff { to: SegmentId, progress: u32 },
    Delivered { target: Pos },
}

impl<W: World + ?Sized> Cx<'_, '_, W> {
    fn router(&mut self) -> Router<'_, '_, W> {
        Router {
            topo: self.topo,
            world: &*self.world,
            cursors: &mut *self.cursors,
        }
    }

    /// Re-route `stack` in place. Returns whether it re-routed from a
    /// boundary, or `None` if there is nowhere to go.
    fn recalculate(&mut self, stack: &mut TransitStack, from: Option<BoundaryHint>) -> Option<bool> {
        let segment = self.segment;
        let resolution = self.router().recalculate(segment, stack, from)?;
        let crossed = resolution.crossed_boundary();
        resolution.apply(stack);
        Some(crossed)
    }

    fn advance(&mut self, stack: &mut TransitStack) -> Fate {
        let here = self.segment.pos;
        let mut resync = false;

        if !stack.initiated_path {
            if stack.payload.is_empty() || self.recalculate(stack, None).is_none() {
                return Fate::Drop;
            }
            resync = true;
        }

        let before = stack.progress;
        stack.progress = stack.progress.saturating_add(self.segment.tier.speed);

        if stack.progress >= FULL_PROGRESS {
            let mut hint = None;
            if stack.has_path() {
                let Some(next) = stack.next_hop(here) else {
                    return Fate::Drop;
                };
                if !stack.is_final(here) {
                    if let Some(to) = self.enterable(stack, next) {
                        return Fate::Handoff {
                            to,
                            progress: stack.progress % FULL_PROGRESS,
                        };
                    }
                    hint = Some(BoundaryHint(next));
                } else if stack.path_type.delivers() && self.world.has_inventory(next) {
                    if let Some(face) = Side::toward(here, next).map(Side::opposite) {
                        let home = stack.path_type == PathType::Home;
                        let rejected = self.world.insert(next, face, &stack.payload, home);
                        if rejected.is_empty() {
                            return Fate::Delivered { target: next };
                        }
                        if rejected.quantity < stack.payload.quantity {
                            stack.payload = rejected;
                        }
                    }
                    hint = Some(BoundaryHint(next));
                }
            }
            return match self.recalculate(stack, hint) {
                Some(crossed) => {
                    stack.progress = if crossed { 0 } else { HALF_PROGRESS };
                    Fate::Stay { resync: true }
                }
                None => Fate::Drop,
            };
        }

        if before < HALF_PROGRESS && stack.progress >= HALF_PROGRESS && self.needs_reroute(stack) {
            if self.recalculate(stack, None).is_none() {
                return Fate::Drop;
            }
            resync = true;
        }
        Fate::Stay { resync }
    }

    /// The neighbor at `next` if the packet can cross into it.
    fn enterable(&self, stack: &TransitStack, next: Pos) -> Option<SegmentId> {
        let side = Side::toward(self.segment.pos, next)?;
        if !self.segment.can_emit_to(side) {
            return None;
        }
        let (id, neighbor) = self.topo.segment_at(self.network, next)?;
        stack.can_enter(neighbor, side).then_some(id)
    }

    /// The halfway check: is the planned next step still possible?
    fn needs_reroute(&self, stack: &TransitStack) -> bool {
        let here = self.segment.pos;
        let (Some(next), Some(side)) = (stack.next_hop(here), stack.side(here)) else {
            return true;
        };
        if !stack.is_final(here) {
            return self.enterable(stack, next).is_none();
        }
        match stack.path_type {
            PathType::Dest | PathType::Home => {
                let home = stack.path_type == PathType::Home;
                !self.segment.can_emit_to(side)
                    || self
                        .world
                        .can_accept(next, side.opposite(), stack.color, &stack.payload, home)
                        == 0
            }
            PathType::Idle => {
                stack.path.len() != 2
                    || self.topo.segment_at(self.network, next).is_some()
                    || !self.segment.can_emit_to(side)
            }
            PathType::None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Server tick
// ---------------------------------------------------------------------------

/// Advance one segment by one tick.
///
/// Segments without a live network do nothing at all.
pub fn tick_server<W: World + ?Sized>(
    segment: &Segment,
    transit: &mut SegmentTransit,
    topo: Topology<'_>,
    world: &mut W,
    cursors: &mut RoundRobinCursors,
) -> TickOutcome {
    let mut out = TickOutcome::default();
    let Some(network) = topo.network_of(segment) else {
        return out;
    };

    ingest(segment, transit, topo, world, cursors, &mut out);

    if !transit.table.is_empty() {
        let mut cx = Cx {
            segment,
            network,
            topo,
            world,
            cursors,
        };
        for id in transit.table.ids() {
            advance_one(&mut cx, transit, id, &mut out);
        }
    }

    if let Some(update) = sync::flush(&mut transit.table, segment.pos) {
        out.update = Some(update);
        out.mark_dirty = true;
    }
    out
}

fn advance_one<W: World + ?Sized>(
    cx: &mut Cx<'_, '_, W>,
    transit: &mut SegmentTransit,
    id: StackId,
    out: &mut TickOutcome,
) {
    let Some(stack) = transit.table.get_mut(id) else {
        return;
    };
    match cx.advance(stack) {
        Fate::Stay { resync } => {
            if resync {
                transit.table.mark_sync(id);
            }
        }
        Fate::Handoff { to, progress } => {
            if let Some(stack) = transit.table.detach(id) {
                out.handoffs.push(Handoff { to, stack, progress });
            }
        }
        Fate::Delivered { target } => {
            if let Some(stack) = transit.table.detach(id) {
                cx.world.untrack(target, &stack.payload);
                tracing::debug!(segment = ?cx.segment.pos, ?target, quantity = stack.payload.quantity, "delivered");
                out.delivered.push(Delivery {
                    target,
                    stack: stack.payload,
                    path_type: stack.path_type,
                });
            }
        }
        Fate::Drop => {
            if let Some(stack) = transit.table.detach(id) {
                let pos = cx.segment.pos;
                if let Some(target) = stack.target().filter(|_| stack.path_type.delivers()) {
                    cx.world.untrack(target, &stack.payload);
                }
                tracing::debug!(segment = ?pos, ?id, quantity = stack.payload.quantity, "packet dropped");
                if !stack.payload.is_empty() {
                    cx.world.spill(pos, stack.payload.clone());
                    out.dropped.push((pos, stack.payload));
                }
            }
        }
    }
}

/// Pull from every adjacent inventory on a pull face, paced by the
/// segment's backoff.
fn ingest<W: World + ?Sized>(
    segment: &Segment,
    transit: &mut SegmentTransit,
    topo: Topology<'_>,
    world: &mut W,
    cursors: &mut RoundRobinCursors,
    out: &mut TickOutcome,
) {
    if segment.pull_sides().next().is_none() || !transit.backoff.ready() {
        return;
    }
    for side in segment.pull_sides() {
        let source = segment.pos.offset(side);
        if !world.has_inventory(source) {
            continue;
        }
        let request = TransitRequest {
            candidates: world.available(source, side.opposite(), segment.tier.pull_amount),
        };
        if request.is_empty() {
            continue;
        }
        let offer = Offer {
            outputter: source,
            request: &request,
            color: segment.color,
            do_emit: true,
            min: 0,
            policy: RoutePolicy::Direct,
        };
        let inserted = insert(segment, &mut transit.table, topo, &*world, cursors, offer);
        if inserted.response.is_empty() {
            transit.backoff.record_failure();
            tracing::debug!(segment = ?segment.pos, ?source, retries = transit.backoff.retries, "nothing routable, backing off");
            continue;
        }
        let Some(SyncMessage::Spawned { segment: on, id, mut stack }) = inserted.spawned else {
            continue;
        };
        let extracted = inserted.response.use_all(world);
        if extracted < stack.payload.quantity {
            tracing::debug!(segment = ?segment.pos, ?source, routed = stack.payload.quantity, extracted, "short extraction");
            if extracted == 0 {
                transit.table.remove(id);
                continue;
            }
            stack.payload.quantity = extracted;
            if let Some(packet) = transit.table.get_mut(id) {
                packet.payload.quantity = extracted;
            }
        }
        transit.backoff.record_success();
        out.spawned.push(SyncMessage::Spawned { segment: on, id, stack });
        out.mark_dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkArena;
    use crate::stack::ResolvedRoute;
    use crate::table::TransitTable;
    use crate::test_utils::*;
    use slotmap::SlotMap;
    use std::collections::BTreeMap;

    // -----------------------------------------------------------------------
    // Fixture: a handful of segments, ticked one at a time
    // -----------------------------------------------------------------------

    struct Rig {
        segs: SlotMap<SegmentId, Segment>,
        by_pos: BTreeMap<Pos, SegmentId>,
        nets: NetworkArena,
        transit: BTreeMap<SegmentId, SegmentTransit>,
        cursors: RoundRobinCursors,
        world: MockWorld,
    }

    impl Rig {
        fn new(segments: Vec<Segment>) -> Self {
            let mut segs = SlotMap::with_key();
            let mut by_pos = BTreeMap::new();
            let mut transit = BTreeMap::new();
            for s in segments {
                let pos = s.pos;
                let id = segs.insert(s);
                by_pos.insert(pos, id);
                transit.insert(id, SegmentTransit::default());
            }
            let mut nets = NetworkArena::new();
            nets.rebuild(&mut segs, &by_pos);
            Self {
                segs,
                by_pos,
                nets,
                transit,
                cursors: RoundRobinCursors::new(),
                world: MockWorld::new(),
            }
        }

        fn id(&self, x: i32) -> SegmentId {
            self.by_pos[&at(x)]
        }

        fn table(&mut self, x: i32) -> &mut TransitTable {
            let id = self.id(x);
            &mut self.transit.get_mut(&id).expect("transit").table
        }

        fn tick(&mut self, x: i32) -> TickOutcome {
            let id = self.id(x);
            let topo = Topology::new(&self.segs, &self.nets);
            let transit = self.transit.get_mut(&id).expect("transit");
            tick_server(&self.segs[id], transit, topo, &mut self.world, &mut self.cursors)
        }
    }

    fn routed(path: Vec<Pos>, home: Pos, n: u32) -> TransitStack {
        let mut s = TransitStack::new(home, None, stack(iron(), n));
        s.apply_route(ResolvedRoute {
            path,
            path_type: PathType::Dest,
            idle_dir: None,
        });
        s
    }

    // -----------------------------------------------------------------------
    // Test 1: packet advances by tier speed
    // -----------------------------------------------------------------------

    #[test]
    fn advances_by_speed_without_sync() {
        let mut rig = Rig::new(vec![segment(at(0), tier(25, 8)), segment(at(1), tier(25, 8))]);
        rig.world.add_chest(at(2), 64);
        let id = rig.table(0).add(routed(vec![at(0), at(1), at(2)], at(-1), 4));
        let out = rig.tick(0);
        assert_eq!(rig.table(0).get(id).map(|s| s.progress), Some(25));
        assert!(out.update.is_none());
        assert!(!out.mark_dirty);
    }

    // -----------------------------------------------------------------------
    // Test 2: crossing a boundary hands off with the remainder
    // -----------------------------------------------------------------------

    #[test]
    fn boundary_crossing_hands_off_remainder() {
        let mut rig = Rig::new(vec![segment(at(0), tier(30, 8)), segment(at(1), tier(30, 8))]);
        rig.world.add_chest(at(2), 64);
        let id = rig.table(0).add(routed(vec![at(0), at(1), at(2)], at(-1), 4));
        rig.table(0).get_mut(id).expect("stack").progress = 90;

        let out = rig.tick(0);
        assert_eq!(out.handoffs.len(), 1);
        assert_eq!(out.handoffs[0].to, rig.id(1));
        assert_eq!(out.handoffs[0].progress, 20);
        assert!(rig.table(0).is_empty());
        let update = out.update.expect("deletion synced");
        assert_eq!(update.deleted, vec![id]);
    }

    // -----------------------------------------------------------------------
    // Test 3: full delivery
    // -----------------------------------------------------------------------

    #[test]
    fn final_hop_delivers_into_inventory() {
        let mut rig = Rig::new(vec![segment(at(0), tier(50, 8))]);
        rig.world.add_chest(at(1), 64);
        let id = rig.table(0).add(routed(vec![at(0), at(1)], at(-1), 4));
        rig.table(0).get_mut(id).expect("stack").progress = 50;

        let out = rig.tick(0);
        assert_eq!(out.delivered.len(), 1);
        assert_eq!(rig.world.count(at(1), iron()), 4);
        assert_eq!(rig.world.untracked.len(), 1);
        assert!(rig.table(0).is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 4: partial delivery keeps the remainder and re-routes
    // -----------------------------------------------------------------------

    #[test]
    fn partial_delivery_reroutes_remainder_from_boundary() {
        let mut rig = Rig::new(vec![segment(at(0), tier(50, 8)), segment(at(-1), tier(50, 8))]);
        rig.world.add_chest(at(1), 6);
        rig.world.add_chest(at(-2), 64);
        let id = rig.table(0).add(routed(vec![at(0), at(1)], at(5), 10));
        rig.table(0).get_mut(id).expect("stack").progress = 50;

        let out = rig.tick(0);
        assert!(out.delivered.is_empty());
        assert_eq!(rig.world.count(at(1), iron()), 6);
        let s = rig.table(0).get(id).expect("remainder stays").clone();
        assert_eq!(s.payload.quantity, 4);
        assert_eq!(s.progress, 0);
        assert_eq!(s.original_location, at(1));
        assert_eq!(s.path, vec![at(0), at(-1), at(-2)]);
        assert_eq!(out.update.expect("resynced").changed.len(), 1);
    }

    // -----------------------------------------------------------------------
    // Test 5: halfway check re-routes when the destination filled up
    // -----------------------------------------------------------------------

    #[test]
    fn halfway_check_reroutes_to_other_destination() {
        let mut rig = Rig::new(vec![segment(at(0), tier(25, 8))]);
        rig.world.add_chest(at(1), 0);
        rig.world.add_chest(at(-1), 64);
        let id = rig.table(0).add(routed(vec![at(0), at(1)], at(9), 4));
        rig.table(0).get_mut(id).expect("stack").progress = 25;

        let out = rig.tick(0);
        let s = rig.table(0).get(id).expect("still here");
        assert_eq!(s.progress, 50);
        assert_eq!(s.target(), Some(at(-1)));
        assert!(out.update.is_some());
    }

    // -----------------------------------------------------------------------
    // Test 6: unroutable packet is dropped and spilled
    // -----------------------------------------------------------------------

    #[test]
    fn unroutable_packet_spills() {
        let mut seg = segment(at(0), tier(25, 8));
        seg.sides = [crate::segment::ConnectionType::Pull; 6];
        let mut rig = Rig::new(vec![seg]);
        let id = rig.table(0).add(TransitStack::new(at(-1), None, stack(iron(), 3)));

        let out = rig.tick(0);
        assert_eq!(out.dropped, vec![(at(0), stack(iron(), 3))]);
        assert_eq!(rig.world.spilled_total(), 3);
        assert_eq!(out.update.expect("deleted").deleted, vec![id]);
    }

    // -----------------------------------------------------------------------
    // Test 7: empty payload is removed without a spill
    // -----------------------------------------------------------------------

    #[test]
    fn empty_payload_is_removed_silently() {
        let mut rig = Rig::new(vec![segment(at(0), tier(25, 8))]);
        rig.table(0).add(TransitStack::new(at(-1), None, stack(iron(), 0)));
        let out = rig.tick(0);
        assert!(out.dropped.is_empty());
        assert!(rig.table(0).is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 8: ingestion pulls, routes, and extracts
    // -----------------------------------------------------------------------

    #[test]
    fn ingestion_pulls_from_pull_face() {
        let mut rig = Rig::new(vec![
            puller(at(0), tier(25, 8), Side::West),
            segment(at(1), tier(25, 8)),
        ]);
        rig.world.add_chest(at(-1), 64);
        rig.world.put(at(-1), iron(), 20);
        rig.world.add_chest(at(2), 64);

        let id = rig.id(0);
        rig.transit.get_mut(&id).expect("transit").backoff.delay = 0;
        let out = rig.tick(0);
        assert_eq!(out.spawned.len(), 1);
        assert!(out.mark_dirty);
        assert_eq!(rig.world.count(at(-1), iron()), 12);
        assert_eq!(rig.table(0).len(), 1);
        let backoff = &rig.transit[&id].backoff;
        assert_eq!(backoff.delay, crate::backoff::ACTIVE_RETRY_TICKS);
        assert_eq!(backoff.retries, 0);
    }

    // -----------------------------------------------------------------------
    // Test 9: failed ingestion backs off
    // -----------------------------------------------------------------------

    #[test]
    fn failed_ingestion_backs_off() {
        let mut rig = Rig::new(vec![puller(at(0), tier(25, 8), Side::West)]);
        rig.world.add_chest(at(-1), 64);
        rig.world.put(at(-1), iron(), 20);
        let id = rig.id(0);
        rig.transit.get_mut(&id).expect("transit").backoff.delay = 0;

        rig.tick(0);
        let backoff = &rig.transit[&id].backoff;
        assert_eq!(backoff.retries, 1);
        assert_eq!(backoff.delay, 3);
        assert_eq!(rig.world.count(at(-1), iron()), 20);
    }

    // -----------------------------------------------------------------------
    // Test 10: idle packet with no destination wanders
    // -----------------------------------------------------------------------

    #[test]
    fn unrouted_packet_goes_idle() {
        let mut rig = Rig::new(vec![segment(at(0), tier(25, 8)), segment(at(1), tier(25, 8))]);
        let id = rig.table(0).add(TransitStack::new(at(-1), None, stack(iron(), 3)));
        let out = rig.tick(0);
        let s = rig.table(0).get(id).expect("kept");
        assert_eq!(s.path_type, PathType::Idle);
        assert_eq!(s.progress, 25);
        assert_eq!(out.update.expect("synced").changed[0].0, id);
    }

    // -----------------------------------------------------------------------
    // Test 11: blocked neighbor re-routes from the boundary
    // -----------------------------------------------------------------------

    #[test]
    fn blocked_neighbor_reroutes_at_boundary() {
        let mut rig = Rig::new(vec![
            segment(at(0), tier(50, 8)),
            segment(at(1), tier(50, 8)).with_color(crate::item::Color::Red),
        ]);
        rig.world.add_chest(at(-1), 64);
        let id = rig.table(0).add(routed(vec![at(0), at(1), at(2)], at(7), 4));
        rig.table(0).get_mut(id).expect("stack").progress = 50;

        let out = rig.tick(0);
        assert!(out.handoffs.is_empty());
        let s = rig.table(0).get(id).expect("kept");
        assert_eq!(s.progress, 0);
        assert_eq!(s.original_location, at(1));
        assert_eq!(s.target(), Some(at(-1)));
    }

    fn idle(path: Vec<Pos>, dir: Side) -> TransitStack {
        let mut s = TransitStack::new(at(-1), None, stack(iron(), 3));
        s.apply_route(ResolvedRoute {
            path,
            path_type: PathType::Idle,
            idle_dir: Some(dir),
        });
        s
    }

    // -----------------------------------------------------------------------
    // Test 12: a packet with no next hop is dropped at the boundary
    // -----------------------------------------------------------------------

    #[test]
    fn packet_without_next_hop_is_dropped() {
        let mut rig = Rig::new(vec![segment(at(0), tier(30, 8))]);
        rig.world.add_chest(at(1), 64);
        let off_path = rig.table(0).add(routed(vec![at(5), at(6)], at(-1), 4));
        let last = rig.table(0).add(routed(vec![at(-1), at(0)], at(-1), 2));
        for id in [off_path, last] {
            rig.table(0).get_mut(id).expect("stack").progress = 90;
        }

        let out = rig.tick(0);
        assert_eq!(out.dropped, vec![(at(0), stack(iron(), 4)), (at(0), stack(iron(), 2))]);
        assert_eq!(rig.world.spilled_total(), 6);
        assert_eq!(rig.world.untracked, vec![(at(6), stack(iron(), 4)), (at(0), stack(iron(), 2))]);
        assert!(rig.table(0).is_empty());
        assert_eq!(out.update.expect("deleted").deleted, vec![off_path, last]);
    }

    // -----------------------------------------------------------------------
    // Test 13: a holding packet keeps its route while its face can emit
    // -----------------------------------------------------------------------

    #[test]
    fn holding_packet_rechecks_only_its_face_at_halfway() {
        let mut rig = Rig::new(vec![segment(at(0), tier(30, 8))]);
        let id = rig.table(0).add(idle(vec![at(0), at(1)], Side::East));
        rig.table(0).get_mut(id).expect("stack").progress = 30;

        let out = rig.tick(0);
        let s = rig.table(0).get(id).expect("kept");
        assert_eq!(s.progress, 60);
        assert_eq!(s.path, vec![at(0), at(1)]);
        assert!(out.update.is_none());

        let seg = rig.id(0);
        rig.segs[seg].sides[Side::East.index()] = crate::segment::ConnectionType::Pull;
        rig.table(0).get_mut(id).expect("stack").progress = 30;

        let out = rig.tick(0);
        let s = rig.table(0).get(id).expect("kept");
        assert_eq!(s.progress, 60);
        assert_eq!(s.idle_dir, Some(Side::Down));
        assert_eq!(s.path, vec![at(0), at(0).offset(Side::Down)]);
        assert_eq!(out.update.expect("resynced").changed[0].0, id);
    }

    // -----------------------------------------------------------------------
    // Test 14: dropping an idle packet spills without untracking
    // -----------------------------------------------------------------------

    #[test]
    fn dropped_idle_packet_is_not_untracked() {
        let mut rig = Rig::new(vec![segment(at(0), tier(30, 8))]);
        let id = rig.table(0).add(idle(vec![at(4), at(5)], Side::East));
        rig.table(0).get_mut(id).expect("stack").progress = 90;

        let out = rig.tick(0);
        assert_eq!(out.dropped, vec![(at(0), stack(iron(), 3))]);
        assert!(rig.world.untracked.is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 15: a short extraction shrinks the new packet
    // -----------------------------------------------------------------------

    #[test]
    fn short_extraction_shrinks_spawned_packet() {
        let mut rig = Rig::new(vec![puller(at(0), tier(25, 8), Side::West)]);
        rig.world.add_chest(at(-1), 64);
        rig.world.put(at(-1), iron(), 20);
        rig.world.add_chest(at(1), 64);
        rig.world.extract_limit = Some(5);
        let seg = rig.id(0);
        rig.transit.get_mut(&seg).expect("transit").backoff.delay = 0;

        let out = rig.tick(0);
        assert_eq!(rig.world.count(at(-1), iron()), 15);
        let (_, packet) = rig.table(0).iter().next().expect("spawned");
        assert_eq!(packet.payload.quantity, 5);
        let [SyncMessage::Spawned { stack: view, .. }] = out.spawned.as_slice() else {
            panic!("expected one spawn, got {:?}", out.spawned);
        };
        assert_eq!(view.payload.quantity, 5);
    }

    #[test]
    fn empty_extraction_spawns_nothing() {
        let mut rig = Rig::new(vec![puller(at(0), tier(25, 8), Side::West)]);
        rig.world.add_chest(at(-1), 64);
        rig.world.put(at(-1), iron(), 20);
        rig.world.add_chest(at(1), 64);
        rig.world.extract_limit = Some(0);
        let seg = rig.id(0);
        rig.transit.get_mut(&seg).expect("transit").backoff.delay = 0;

        let out = rig.tick(0);
        assert!(out.spawned.is_empty());
        assert!(rig.table(0).is_empty());
        assert!(out.update.is_none());
        assert_eq!(rig.world.count(at(-1), iron()), 20);
    }
}
