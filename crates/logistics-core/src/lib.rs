//! Logistics Core -- the transport network behind item conveyors.
//!
//! Item stacks ("packets") ride a grid of conveyor segments from a source
//! inventory to a destination inventory. Each segment owns the packets
//! currently on it and, once per tick, decides for every one of them whether
//! to advance, hand it to the next segment, deliver it, re-route it, or drop
//! it into the world.
//!
//! # Per-Segment Tick
//!
//! Each call to [`engine::Engine::step`] ticks every segment once, in
//! ascending position order. A segment tick runs:
//!
//! 1. **Ingestion** -- Pull faces try to take items from adjacent
//!    inventories, paced by an exponential [`backoff::Backoff`].
//! 2. **Advance** -- Every packet gains the tier speed in progress.
//! 3. **Halfway check** -- At 50% the next step is re-validated.
//! 4. **Boundary** -- At 100% the packet is handed off, delivered, or
//!    re-routed.
//! 5. **Flush** -- All changes of the tick leave as one
//!    [`sync::SegmentUpdate`].
//!
//! Hand-offs returned by a segment tick are applied to the receiving
//! segment before the next segment ticks.
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- Segment arena, networks and the tick loop.
//! - [`segment::Segment`] -- Per-segment configuration (tier, color, faces).
//! - [`stack::TransitStack`] -- One packet and its route.
//! - [`table::TransitTable`] -- The packets owned by one segment.
//! - [`resolver::Router`] -- Directed, home and idle route selection.
//! - [`world::World`] -- Inventories and world effects outside the network.
//! - [`persist`] -- Full saves and update tags via bitcode.
//! - [`client::ClientTransit`] -- The observer-side mirror.

pub mod backoff;
pub mod client;
pub mod config;
pub mod dirty;
pub mod engine;
pub mod fixed;
pub mod id;
pub mod insert;
pub mod item;
pub mod network;
pub mod pathfinder;
pub mod persist;
pub mod position;
pub mod resolver;
pub mod segment;
pub mod stack;
pub mod sync;
pub mod table;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod tick;
pub mod tier;
pub mod world;
