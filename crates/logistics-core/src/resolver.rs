//! Route resolution for packets already in the network.

use crate::item::ItemStack;
use crate::network::{Network, Topology};
use crate::pathfinder::{idle_route, Goal, RoundRobinCursors, Search};
use crate::position::Pos;
use crate::segment::Segment;
use crate::stack::{PathType, ResolvedRoute, RoutePolicy, TransitStack};
use crate::world::World;

/// The neighbor a packet was about to cross into when it had to re-route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryHint(pub Pos);

/// A successful recompute, not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub route: ResolvedRoute,
    /// Replaces the packet's `original_location` when a boundary was involved.
    pub original_location: Option<Pos>,
}

impl Resolution {
    pub fn apply(self, stack: &mut TransitStack) {
        stack.apply_route(self.route);
        if let Some(from) = self.original_location {
            stack.original_location = from;
        }
    }

    /// Whether the packet re-routes from a boundary (progress restarts at 0)
    /// rather than from the middle of the segment (progress 50).
    pub fn crossed_boundary(&self) -> bool {
        self.original_location.is_some()
    }
}

/// Everything a route query needs besides the packet.
pub struct Router<'a, 'w, W: World + ?Sized> {
    pub topo: Topology<'a>,
    pub world: &'w W,
    pub cursors: &'w mut RoundRobinCursors,
}

impl<W: World + ?Sized> Router<'_, '_, W> {
    /// A delivery route for `offer` leaving `segment`, chosen by `policy`.
    /// Returns the route and how many items the destination accepts.
    pub fn directed(
        &mut self,
        segment: &Segment,
        network: &Network,
        stack: &TransitStack,
        offer: &ItemStack,
        min: u32,
        policy: RoutePolicy,
    ) -> Option<(ResolvedRoute, u32)> {
        let search = Search {
            start: segment,
            network,
            offer,
            color: stack.color,
            min,
            goal: Goal::Any {
                exclude: Some(stack.home_location),
            },
        };
        let dest = match policy {
            RoutePolicy::Direct => search.direct(&self.topo, self.world),
            RoutePolicy::RoundRobin => search.round_robin(&self.topo, self.world, self.cursors, stack.home_location),
        }?;
        let route = ResolvedRoute {
            path: dest.path,
            path_type: PathType::Dest,
            idle_dir: None,
        };
        Some((route, dest.accepted))
    }

    /// Route back to the packet's home inventory, if it takes the payload.
    fn home(&self, segment: &Segment, network: &Network, stack: &TransitStack) -> Option<ResolvedRoute> {
        if !self.world.has_inventory(stack.home_location) {
            return None;
        }
        let search = Search {
            start: segment,
            network,
            offer: &stack.payload,
            color: stack.color,
            min: 0,
            goal: Goal::Exactly(stack.home_location),
        };
        let dest = search.direct(&self.topo, self.world)?;
        Some(ResolvedRoute {
            path: dest.path,
            path_type: PathType::Home,
            idle_dir: None,
        })
    }

    /// Home if possible, else any destination, else wander or hold.
    fn idle_fallback(
        &mut self,
        segment: &Segment,
        network: &Network,
        stack: &TransitStack,
        tried_direct: bool,
    ) -> Option<ResolvedRoute> {
        if let Some(route) = self.home(segment, network, stack) {
            return Some(route);
        }
        if !tried_direct {
            let found = self.directed(segment, network, stack, &stack.payload, 0, RoutePolicy::Direct);
            if let Some((route, _)) = found {
                return Some(route);
            }
        }
        idle_route(&self.topo, network, segment, stack.color, stack.idle_dir)
    }

    /// Find a new route for `stack` on `segment`.
    ///
    /// Delivering packets first retry a directed route through their own
    /// policy; everything else, and any packet whose directed retry fails,
    /// takes the idle fallback. `None` means the packet cannot proceed and
    /// must be dropped.
    pub fn recalculate(
        &mut self,
        segment: &Segment,
        stack: &TransitStack,
        from: Option<BoundaryHint>,
    ) -> Option<Resolution> {
        let network = self.topo.network_of(segment)?;
        let mut tried_direct = false;

        let mut route = None;
        if stack.path_type.delivers() {
            route = self
                .directed(segment, network, stack, &stack.payload, 0, stack.policy)
                .map(|(r, _)| r);
            tried_direct = stack.policy == RoutePolicy::Direct;
        }
        let route = match route {
            Some(r) => r,
            None => self.idle_fallback(segment, network, stack, tried_direct)?,
        };

        tracing::trace!(
            segment = ?segment.pos,
            path_type = ?route.path_type,
            hops = route.path.len(),
            "recalculated route"
        );
        Some(Resolution {
            route,
            original_location: from.map(|BoundaryHint(p)| p),
        })
    }
}
