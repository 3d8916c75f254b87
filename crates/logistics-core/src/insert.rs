//! Putting new packets onto a segment from an adjacent inventory or machine.

use crate::item::{Color, TransitRequest, TransitResponse};
use crate::network::Topology;
use crate::pathfinder::RoundRobinCursors;
use crate::position::{Pos, Side};
use crate::resolver::Router;
use crate::segment::Segment;
use crate::stack::{RoutePolicy, TransitStack};
use crate::sync::{ClientStack, SyncMessage};
use crate::table::TransitTable;
use crate::world::World;

/// Result of [`insert`]. `spawned` is set when a packet was actually added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub response: TransitResponse,
    pub spawned: Option<SyncMessage>,
}

impl Insertion {
    fn rejected(source: Pos, source_side: Side) -> Self {
        Self {
            response: TransitResponse::empty(source, source_side),
            spawned: None,
        }
    }
}

/// One insertion attempt.
#[derive(Debug, Clone, Copy)]
pub struct Offer<'r> {
    /// Position of the inventory or machine handing the items over.
    pub outputter: Pos,
    pub request: &'r TransitRequest,
    pub color: Option<Color>,
    /// Add the packet for real. When false only the would-be response is
    /// computed.
    pub do_emit: bool,
    /// Smallest amount a destination must accept.
    pub min: u32,
    pub policy: RoutePolicy,
}

/// Try to route one of the request's candidate stacks from `offer.outputter`
/// into `segment`.
///
/// Candidates are tried in order; the first one with a directed route wins
/// and is clamped to what its destination accepts. The response carries the
/// routed portion, which the caller is expected to take from the source
/// (see [`TransitResponse::use_all`]). Nothing is routed if the outputter is
/// not adjacent, if the facing side cannot receive, or if the packet's color
/// is not allowed on the segment.
pub fn insert<W: World + ?Sized>(
    segment: &Segment,
    table: &mut TransitTable,
    topo: Topology<'_>,
    world: &W,
    cursors: &mut RoundRobinCursors,
    offer: Offer<'_>,
) -> Insertion {
    let Some(travel) = Side::toward(offer.outputter, segment.pos) else {
        return Insertion::rejected(offer.outputter, Side::Down);
    };
    if !segment.can_receive_from(travel.opposite()) {
        return Insertion::rejected(offer.outputter, travel);
    }
    let Some(network) = topo.network_of(segment) else {
        return Insertion::rejected(offer.outputter, travel);
    };

    let mut router = Router { topo, world, cursors };
    for candidate in offer.request.candidates.iter().filter(|c| !c.is_empty()) {
        let mut stack = TransitStack::new(offer.outputter, offer.color, candidate.clone());
        stack.policy = offer.policy;
        if !stack.can_enter(segment, travel) {
            return Insertion::rejected(offer.outputter, travel);
        }
        let Some((route, accepted)) = router.directed(segment, network, &stack, candidate, offer.min, offer.policy)
        else {
            continue;
        };

        stack.payload = candidate.with_quantity(candidate.quantity.min(accepted));
        stack.apply_route(route);
        let response = TransitResponse {
            stack: Some(stack.payload.clone()),
            source: offer.outputter,
            source_side: travel,
        };

        let spawned = offer.do_emit.then(|| {
            let view = ClientStack::of(&stack, segment.pos);
            let id = table.add(stack);
            tracing::debug!(segment = ?segment.pos, ?id, quantity = view.payload.quantity, "packet inserted");
            SyncMessage::Spawned {
                segment: segment.pos,
                id,
                stack: view,
            }
        });
        return Insertion { response, spawned };
    }
    Insertion::rejected(offer.outputter, travel)
}
