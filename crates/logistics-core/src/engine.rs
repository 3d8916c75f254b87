use crate::dirty::DirtyTracker;
use crate::fixed::Ticks;
use crate::id::{SegmentId, StackId};
use crate::insert::{self, Offer};
use crate::item::{Color, ItemStack, TransitResponse};
use crate::network::{Network, NetworkArena, Topology};
use crate::pathfinder::RoundRobinCursors;
use crate::persist::{self, PersistError};
use crate::position::{Pos, Side};
use crate::segment::{ConnectionType, Segment};
use crate::stack::RoutePolicy;
use crate::sync::{ClientStack, SegmentUpdate, SyncMessage, SyncSink};
use crate::table::{SegmentTransit, TransitTable};
use crate::tick::{tick_server, Delivery, TickOutcome};
use crate::tier::TierTable;
use crate::world::World;
use slotmap::{SecondaryMap, SlotMap};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("a segment already exists at {0:?}")]
    Occupied(Pos),
    #[error("no segment at {0:?}")]
    NoSegment(Pos),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

// ---------------------------------------------------------------------------
// Step report
// ---------------------------------------------------------------------------

/// What one global tick did, summed over every segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    /// The tick that just ran.
    pub tick: Ticks,
    pub spawned: usize,
    pub handoffs: usize,
    pub delivered: Vec<Delivery>,
    pub dropped: Vec<(Pos, ItemStack)>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owns every segment and drives the global tick.
///
/// Segment configuration lives in a slot map arena; each segment's packets
/// and ingestion pacing live in a secondary map alongside it. Segments tick
/// one at a time in ascending position order.
#[derive(Debug)]
pub struct Engine {
    tiers: TierTable,
    segments: SlotMap<SegmentId, Segment>,
    transit: SecondaryMap<SegmentId, SegmentTransit>,
    by_pos: BTreeMap<Pos, SegmentId>,
    networks: NetworkArena,
    cursors: RoundRobinCursors,
    dirty: DirtyTracker,
    tick: Ticks,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(TierTable::default())
    }
}

impl Engine {
    pub fn new(tiers: TierTable) -> Self {
        Self {
            tiers,
            segments: SlotMap::with_key(),
            transit: SecondaryMap::new(),
            by_pos: BTreeMap::new(),
            networks: NetworkArena::new(),
            cursors: RoundRobinCursors::new(),
            dirty: DirtyTracker::new(),
            tick: 0,
        }
    }

    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    /// Ticks run so far.
    pub fn current_tick(&self) -> Ticks {
        self.tick
    }

    // -----------------------------------------------------------------------
    // Layout
    // -----------------------------------------------------------------------

    pub fn add_segment(&mut self, segment: Segment) -> Result<SegmentId, EngineError> {
        let pos = segment.pos;
        if self.by_pos.contains_key(&pos) {
            return Err(EngineError::Occupied(pos));
        }
        let id = self.segments.insert(segment);
        self.transit.insert(id, SegmentTransit::default());
        self.by_pos.insert(pos, id);
        self.dirty.mark_layout();
        Ok(id)
    }

    /// Remove the segment at `pos`. Every packet it carries stops being
    /// tracked and is spilled into the world at `pos`.
    pub fn remove_segment<W: World + ?Sized>(&mut self, pos: Pos, world: &mut W) -> Result<Segment, EngineError> {
        let id = self.by_pos.remove(&pos).ok_or(EngineError::NoSegment(pos))?;
        if let Some(transit) = self.transit.remove(id) {
            for (_, stack) in transit.table.iter() {
                if let Some(target) = stack.target().filter(|_| stack.path_type.delivers()) {
                    world.untrack(target, &stack.payload);
                }
                if !stack.payload.is_empty() {
                    world.spill(pos, stack.payload.clone());
                }
            }
            tracing::debug!(segment = ?pos, packets = transit.table.len(), "segment removed");
        }
        self.dirty.forget(id);
        self.dirty.mark_layout();
        self.segments.remove(id).ok_or(EngineError::NoSegment(pos))
    }

    pub fn set_connection(&mut self, pos: Pos, side: Side, connection: ConnectionType) -> Result<(), EngineError> {
        let seg = self.segment_mut(pos)?;
        seg.sides[side.index()] = connection;
        self.dirty.mark_layout();
        Ok(())
    }

    pub fn set_color(&mut self, pos: Pos, color: Option<Color>) -> Result<(), EngineError> {
        let seg = self.segment_mut(pos)?;
        seg.color = color;
        self.dirty.mark_layout();
        Ok(())
    }

    fn segment_mut(&mut self, pos: Pos) -> Result<&mut Segment, EngineError> {
        self.by_pos
            .get(&pos)
            .and_then(|&id| self.segments.get_mut(id))
            .ok_or(EngineError::NoSegment(pos))
    }

    /// Rebuild networks if the layout changed since the last rebuild.
    pub fn ensure_networks(&mut self) {
        if self.dirty.is_layout_dirty() {
            self.networks.rebuild(&mut self.segments, &self.by_pos);
            self.dirty.clear_layout();
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segment_id(&self, pos: Pos) -> Option<SegmentId> {
        self.by_pos.get(&pos).copied()
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id)
    }

    pub fn segment_at(&self, pos: Pos) -> Option<&Segment> {
        self.segment_id(pos).and_then(|id| self.segments.get(id))
    }

    pub fn transit(&self, id: SegmentId) -> Option<&SegmentTransit> {
        self.transit.get(id)
    }

    /// The packets on the segment at `pos`.
    pub fn table_at(&self, pos: Pos) -> Option<&TransitTable> {
        self.segment_id(pos).and_then(|id| self.transit.get(id)).map(|t| &t.table)
    }

    pub fn table_at_mut(&mut self, pos: Pos) -> Option<&mut TransitTable> {
        let id = self.segment_id(pos)?;
        self.transit.get_mut(id).map(|t| &mut t.table)
    }

    /// Packets in flight across all segments.
    pub fn packet_count(&self) -> usize {
        self.transit.values().map(|t| t.table.len()).sum()
    }

    pub fn network_count(&self) -> usize {
        self.networks.len()
    }

    /// The network of the segment at `pos`, as of the last rebuild.
    pub fn network_at(&self, pos: Pos) -> Option<&Network> {
        let seg = self.segment_at(pos)?;
        Topology::new(&self.segments, &self.networks).network_of(seg)
    }

    pub fn cursors(&self) -> &RoundRobinCursors {
        &self.cursors
    }

    pub fn dirty_tracker(&self) -> &DirtyTracker {
        &self.dirty
    }

    /// Positions of segments whose saved state is out of date, draining the
    /// set.
    pub fn take_dirty(&mut self) -> Vec<Pos> {
        self.dirty
            .take_segments()
            .into_iter()
            .filter_map(|id| self.segments.get(id).map(|s| s.pos))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Insertion
    // -----------------------------------------------------------------------

    /// Hand items from `offer.outputter` to the segment at `at`, routing to
    /// the cheapest accepting destination. The spawn announcement, if any,
    /// goes to `sink` immediately.
    pub fn insert<W: World + ?Sized, S: SyncSink + ?Sized>(
        &mut self,
        at: Pos,
        offer: Offer<'_>,
        world: &W,
        sink: &mut S,
    ) -> Result<TransitResponse, EngineError> {
        self.ensure_networks();
        let id = self.segment_id(at).ok_or(EngineError::NoSegment(at))?;
        let (Some(segment), Some(transit)) = (self.segments.get(id), self.transit.get_mut(id)) else {
            return Err(EngineError::NoSegment(at));
        };
        let topo = Topology::new(&self.segments, &self.networks);
        let inserted = insert::insert(segment, &mut transit.table, topo, world, &mut self.cursors, offer);
        if let Some(message) = inserted.spawned {
            self.dirty.mark_segment(id);
            sink.send(message);
        }
        Ok(inserted.response)
    }

    /// Like [`insert`](Self::insert), but rotating through destinations
    /// per outputter. The packet keeps rotating if it has to re-route.
    pub fn insert_rr<W: World + ?Sized, S: SyncSink + ?Sized>(
        &mut self,
        at: Pos,
        offer: Offer<'_>,
        world: &W,
        sink: &mut S,
    ) -> Result<TransitResponse, EngineError> {
        let offer = Offer {
            policy: RoutePolicy::RoundRobin,
            ..offer
        };
        self.insert(at, offer, world, sink)
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run one global tick: every segment in position order, each followed
    /// immediately by its hand-offs and sync messages.
    #[tracing::instrument(level = "debug", skip_all, fields(tick = self.tick))]
    pub fn step<W: World + ?Sized, S: SyncSink + ?Sized>(&mut self, world: &mut W, sink: &mut S) -> StepReport {
        self.ensure_networks();
        let mut report = StepReport {
            tick: self.tick,
            ..StepReport::default()
        };

        let order: Vec<SegmentId> = self.by_pos.values().copied().collect();
        for id in order {
            let (Some(segment), Some(transit)) = (self.segments.get(id), self.transit.get_mut(id)) else {
                continue;
            };
            let topo = Topology::new(&self.segments, &self.networks);
            let outcome = tick_server(segment, transit, topo, world, &mut self.cursors);
            self.dispatch(id, outcome, world, sink, &mut report);
        }

        self.tick += 1;
        report
    }

    /// Run `ticks` global ticks.
    pub fn advance<W: World + ?Sized, S: SyncSink + ?Sized>(
        &mut self,
        ticks: Ticks,
        world: &mut W,
        sink: &mut S,
    ) -> Vec<StepReport> {
        (0..ticks).map(|_| self.step(world, sink)).collect()
    }

    fn dispatch<W: World + ?Sized, S: SyncSink + ?Sized>(
        &mut self,
        id: SegmentId,
        outcome: TickOutcome,
        world: &mut W,
        sink: &mut S,
        report: &mut StepReport,
    ) {
        let from = self.segments.get(id).map(|s| s.pos);
        for handoff in outcome.handoffs {
            match self.transit.get_mut(handoff.to) {
                Some(target) => {
                    let new_id = target.table.entity_entering(handoff.stack, handoff.progress);
                    tracing::debug!(?from, to = ?self.segments.get(handoff.to).map(|s| s.pos), ?new_id, "hand-off");
                    report.handoffs += 1;
                }
                None => {
                    if let (Some(pos), false) = (from, handoff.stack.payload.is_empty()) {
                        world.spill(pos, handoff.stack.payload.clone());
                        report.dropped.push((pos, handoff.stack.payload));
                    }
                }
            }
        }

        report.spawned += outcome.spawned.len();
        for message in outcome.spawned {
            sink.send(message);
        }
        if let Some(update) = outcome.update {
            sink.send(SyncMessage::Update(update));
        }
        if outcome.mark_dirty {
            self.dirty.mark_segment(id);
        }
        report.delivered.extend(outcome.delivered);
        report.dropped.extend(outcome.dropped);
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Full save of the packets on the segment at `pos`.
    pub fn save_segment(&self, pos: Pos) -> Result<Vec<u8>, EngineError> {
        let table = self.table_at(pos).ok_or(EngineError::NoSegment(pos))?;
        Ok(persist::save_transit(table)?)
    }

    /// Replace the packets on the segment at `pos` with a full save. Returns
    /// how many packets were restored.
    ///
    /// The id counter never moves backwards, so ids handed out since the save
    /// stay retired. Observers receive one update carrying the restored
    /// packets and deleting the ones that were replaced.
    pub fn load_segment<S: SyncSink + ?Sized>(
        &mut self,
        pos: Pos,
        data: &[u8],
        sink: &mut S,
    ) -> Result<usize, EngineError> {
        let mut loaded = persist::load_transit(data)?;
        let id = self.segment_id(pos).ok_or(EngineError::NoSegment(pos))?;
        let slot = self
            .transit
            .get_mut(id)
            .map(|t| &mut t.table)
            .ok_or(EngineError::NoSegment(pos))?;

        loaded.set_next_id(slot.next_id());
        let deleted: Vec<StackId> = slot.ids().into_iter().filter(|&old| loaded.get(old).is_none()).collect();
        let changed: Vec<_> = loaded.iter().map(|(sid, s)| (sid, ClientStack::of(s, pos))).collect();
        *slot = loaded;
        let restored = slot.len();

        tracing::debug!(segment = ?pos, restored, replaced = deleted.len(), "segment loaded");
        if !changed.is_empty() || !deleted.is_empty() {
            sink.send(SyncMessage::Update(SegmentUpdate {
                segment: pos,
                changed,
                deleted,
            }));
        }
        self.dirty.mark_segment(id);
        Ok(restored)
    }

    /// The observer view of the segment at `pos`, for a client that just
    /// started watching it.
    pub fn update_tag(&self, pos: Pos) -> Result<Vec<u8>, EngineError> {
        let table = self.table_at(pos).ok_or(EngineError::NoSegment(pos))?;
        Ok(persist::write_update_tag(table, pos)?)
    }
}
