//! Grid positions and the six faces of a segment.

use serde::{Deserialize, Serialize};

/// A block position. Ordering is lexicographic `(x, y, z)` and is the order
/// in which the engine ticks segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The neighboring position one step toward `side`.
    pub fn offset(self, side: Side) -> Pos {
        let (dx, dy, dz) = side.delta();
        Pos::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

/// One face of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Side {
    pub const ALL: [Side; 6] = [
        Side::Down,
        Side::Up,
        Side::North,
        Side::South,
        Side::West,
        Side::East,
    ];

    pub fn opposite(self) -> Side {
        match self {
            Side::Down => Side::Up,
            Side::Up => Side::Down,
            Side::North => Side::South,
            Side::South => Side::North,
            Side::West => Side::East,
            Side::East => Side::West,
        }
    }

    fn delta(self) -> (i32, i32, i32) {
        match self {
            Side::Down => (0, -1, 0),
            Side::Up => (0, 1, 0),
            Side::North => (0, 0, -1),
            Side::South => (0, 0, 1),
            Side::West => (-1, 0, 0),
            Side::East => (1, 0, 0),
        }
    }

    /// Index into per-side arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The side `s` such that `from.offset(s) == to`, if the two positions
    /// are adjacent.
    pub fn toward(from: Pos, to: Pos) -> Option<Side> {
        Side::ALL.into_iter().find(|&s| from.offset(s) == to)
    }
}
