//! Segment configuration: the capability set the router and the tick loop
//! query. Mutable per-tick state lives in [`crate::table::SegmentTransit`].

use crate::fixed::Fixed64;
use crate::id::NetworkId;
use crate::item::Color;
use crate::position::{Pos, Side};
use crate::tier::{TierSpec, TierTable, RESTRICTIVE_COST};
use serde::{Deserialize, Serialize};

/// How a segment face participates in transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionType {
    /// Disconnected.
    None,
    /// Emits and receives.
    #[default]
    Normal,
    /// Emits only.
    Push,
    /// Receives only; also pulls from an adjacent inventory.
    Pull,
}

impl ConnectionType {
    pub fn can_emit(self) -> bool {
        matches!(self, ConnectionType::Normal | ConnectionType::Push)
    }

    pub fn can_receive(self) -> bool {
        matches!(self, ConnectionType::Normal | ConnectionType::Pull)
    }
}

/// Segment variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SegmentKind {
    #[default]
    Standard,
    /// Routable but expensive; idle packets never wander into it.
    Restrictive,
}

/// One conveyor segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub pos: Pos,
    pub tier: TierSpec,
    pub kind: SegmentKind,
    pub color: Option<Color>,
    /// Connection type per face, indexed by [`Side::index`].
    pub sides: [ConnectionType; 6],
    /// Route cost of crossing this segment.
    pub cost: Fixed64,
    /// The connected component this segment was last assigned to. Resolved
    /// against the network arena every tick; a stale key means unconnected.
    #[serde(skip)]
    pub network: Option<NetworkId>,
}

impl Segment {
    pub fn new(pos: Pos, tier: TierSpec, tiers: &TierTable) -> Self {
        Self {
            pos,
            tier,
            kind: SegmentKind::Standard,
            color: None,
            sides: [ConnectionType::Normal; 6],
            cost: tiers.cost_of(tier),
            network: None,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_kind(mut self, kind: SegmentKind) -> Self {
        self.kind = kind;
        if kind == SegmentKind::Restrictive {
            self.cost = RESTRICTIVE_COST;
        }
        self
    }

    pub fn with_side(mut self, side: Side, connection: ConnectionType) -> Self {
        self.sides[side.index()] = connection;
        self
    }

    pub fn connection_type(&self, side: Side) -> ConnectionType {
        self.sides[side.index()]
    }

    pub fn can_connect(&self, side: Side) -> bool {
        self.connection_type(side) != ConnectionType::None
    }

    pub fn can_emit_to(&self, side: Side) -> bool {
        self.connection_type(side).can_emit()
    }

    pub fn can_receive_from(&self, side: Side) -> bool {
        self.connection_type(side).can_receive()
    }

    /// Whether a packet of `color` may travel on this segment.
    pub fn accepts_color(&self, color: Option<Color>) -> bool {
        self.color.is_none() || self.color == color
    }

    /// Whether a packet of `color` travelling in direction `travel` may enter
    /// this segment.
    pub fn accepts_packet(&self, color: Option<Color>, travel: Side) -> bool {
        self.accepts_color(color) && self.can_receive_from(travel.opposite())
    }

    /// Whether two adjacent segments belong in the same network: both faces
    /// connected and colors compatible.
    pub fn links_with(&self, other: &Segment, side: Side) -> bool {
        let colors_match = self.color.is_none() || other.color.is_none() || self.color == other.color;
        colors_match && self.can_connect(side) && other.can_connect(side.opposite())
    }

    /// Faces that pull from an adjacent inventory.
    pub fn pull_sides(&self) -> impl Iterator<Item = Side> + '_ {
        Side::ALL
            .into_iter()
            .filter(|&s| self.connection_type(s) == ConnectionType::Pull)
    }
}
