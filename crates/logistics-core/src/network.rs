//! Connected components of segments.
//!
//! The transport core only ever asks two questions of a network: "which
//! network is this segment in" and "which segment sits at this position".
//! Components are rebuilt from scratch whenever the layout changes; the
//! arena hands out fresh versioned keys on every rebuild so an id held from
//! before a merge or split simply stops resolving.

use crate::id::{NetworkId, SegmentId};
use crate::position::{Pos, Side};
use crate::segment::Segment;
use slotmap::SlotMap;
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Network {
    segments: BTreeMap<Pos, SegmentId>,
}

impl Network {
    pub fn segment_at(&self, pos: Pos) -> Option<SegmentId> {
        self.segments.get(&pos).copied()
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.segments.contains_key(&pos)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        self.segments.keys().copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkArena {
    networks: SlotMap<NetworkId, Network>,
}

impl NetworkArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NetworkId) -> Option<&Network> {
        self.networks.get(id)
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    /// Recompute every component and reassign each segment's network id.
    pub fn rebuild(
        &mut self,
        segments: &mut SlotMap<SegmentId, Segment>,
        by_pos: &BTreeMap<Pos, SegmentId>,
    ) {
        self.networks.clear();
        for seg in segments.values_mut() {
            seg.network = None;
        }

        for (&start, &start_id) in by_pos {
            if segments.get(start_id).is_none_or(|s| s.network.is_some()) {
                continue;
            }
            let net_id = self.networks.insert(Network::default());
            let mut members = BTreeMap::new();
            let mut queue = VecDeque::from([(start, start_id)]);
            if let Some(seg) = segments.get_mut(start_id) {
                seg.network = Some(net_id);
            }

            while let Some((pos, id)) = queue.pop_front() {
                members.insert(pos, id);
                for side in Side::ALL {
                    let next = pos.offset(side);
                    let Some(&next_id) = by_pos.get(&next) else {
                        continue;
                    };
                    let linked = match (segments.get(id), segments.get(next_id)) {
                        (Some(a), Some(b)) => b.network.is_none() && a.links_with(b, side),
                        _ => false,
                    };
                    if linked {
                        if let Some(seg) = segments.get_mut(next_id) {
                            seg.network = Some(net_id);
                        }
                        queue.push_back((next, next_id));
                    }
                }
            }

            if let Some(net) = self.networks.get_mut(net_id) {
                net.segments = members;
            }
        }

        tracing::debug!(networks = self.networks.len(), segments = by_pos.len(), "rebuilt transport networks");
    }
}

/// Read-only view of the layout handed to the tick and the router.
#[derive(Debug, Clone, Copy)]
pub struct Topology<'a> {
    pub segments: &'a SlotMap<SegmentId, Segment>,
    pub networks: &'a NetworkArena,
}

impl<'a> Topology<'a> {
    pub fn new(segments: &'a SlotMap<SegmentId, Segment>, networks: &'a NetworkArena) -> Self {
        Self { segments, networks }
    }

    /// The live network of `segment`, if its id still resolves.
    pub fn network_of(&self, segment: &Segment) -> Option<&'a Network> {
        segment.network.and_then(|id| self.networks.get(id))
    }

    /// The segment at `pos` within `network`.
    pub fn segment_at(&self, network: &Network, pos: Pos) -> Option<(SegmentId, &'a Segment)> {
        let id = network.segment_at(pos)?;
        self.segments.get(id).map(|s| (id, s))
    }
}
