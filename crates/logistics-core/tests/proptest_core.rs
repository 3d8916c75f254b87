//! Property-based tests for the logistics transport core.
//!
//! Random lines of segments with random tiers and loads are stepped for a
//! while; structural invariants are checked after every tick.

use logistics_core::backoff::{failure_delay, MAX_RETRY_TICKS};
use logistics_core::engine::Engine;
use logistics_core::id::ItemTypeId;
use logistics_core::item::{Color, ItemStack};
use logistics_core::persist::{load_transit, save_transit};
use logistics_core::position::{Pos, Side};
use logistics_core::stack::{PathType, ResolvedRoute, TransitStack, FULL_PROGRESS};
use logistics_core::sync::SyncMessage;
use logistics_core::table::TransitTable;
use logistics_core::test_utils::*;
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

#[derive(Debug, Clone)]
struct LineSetup {
    length: i32,
    speed: u32,
    pull: u32,
    items: u32,
    dest_capacity: u32,
}

fn arb_line() -> impl Strategy<Value = LineSetup> {
    (1..=6i32, 1..=100u32, 1..=16u32, 1..=40u32, 0..=64u32).prop_map(
        |(length, speed, pull, items, dest_capacity)| LineSetup {
            length,
            speed,
            pull,
            items,
            dest_capacity,
        },
    )
}

/// source(-1) -> puller(0) -> ... -> seg(length - 1) -> dest(length)
fn build(setup: &LineSetup) -> (Engine, MockWorld) {
    let spec = tier(setup.speed, setup.pull);
    let mut engine = Engine::default();
    engine.add_segment(puller(at(0), spec, Side::West)).unwrap();
    if setup.length > 1 {
        build_line(&mut engine, 1, setup.length - 1, spec);
    }
    let mut world = MockWorld::new();
    world.add_chest(at(-1), 64);
    world.put(at(-1), iron(), setup.items);
    world.add_chest(at(setup.length), setup.dest_capacity);
    (engine, world)
}

fn in_flight(engine: &Engine, setup: &LineSetup) -> Vec<TransitStack> {
    (0..setup.length)
        .filter_map(|x| engine.table_at(at(x)))
        .flat_map(|t| t.iter().map(|(_, s)| s.clone()))
        .collect()
}

fn arb_stack() -> impl Strategy<Value = TransitStack> {
    (
        1..=64u32,
        0..FULL_PROGRESS,
        0..3u8,
        proptest::option::of(0..4u8),
        2..6usize,
    )
        .prop_map(|(quantity, progress, kind, color, hops)| {
            let color = color.map(|c| match c {
                0 => Color::Red,
                1 => Color::Blue,
                2 => Color::Lime,
                _ => Color::Orange,
            });
            let mut s = TransitStack::new(at(-1), color, ItemStack::new(ItemTypeId(quantity % 5), quantity));
            s.progress = progress;
            let path: Vec<Pos> = (0..hops as i32).map(at).collect();
            match kind {
                0 => {}
                1 => s.apply_route(ResolvedRoute {
                    path,
                    path_type: PathType::Dest,
                    idle_dir: None,
                }),
                _ => s.apply_route(ResolvedRoute {
                    path,
                    path_type: PathType::Idle,
                    idle_dir: Some(Side::East),
                }),
            }
            s
        })
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #[test]
    fn progress_stays_below_full_after_every_tick(setup in arb_line()) {
        let (mut engine, mut world) = build(&setup);
        let mut sink: Vec<SyncMessage> = Vec::new();
        for _ in 0..60 {
            engine.step(&mut world, &mut sink);
            for s in in_flight(&engine, &setup) {
                prop_assert!(s.progress < FULL_PROGRESS);
            }
        }
    }

    #[test]
    fn unrouted_packets_never_carry_a_path(setup in arb_line()) {
        let (mut engine, mut world) = build(&setup);
        let mut sink: Vec<SyncMessage> = Vec::new();
        for _ in 0..60 {
            engine.step(&mut world, &mut sink);
            for s in in_flight(&engine, &setup) {
                prop_assert!(s.path_type != PathType::None || s.path.is_empty());
                prop_assert!(s.initiated_path);
            }
        }
    }

    #[test]
    fn items_are_never_duplicated(setup in arb_line()) {
        let (mut engine, mut world) = build(&setup);
        let mut sink: Vec<SyncMessage> = Vec::new();
        for _ in 0..80 {
            engine.step(&mut world, &mut sink);
            let flying: u32 = in_flight(&engine, &setup).iter().map(|s| s.payload.quantity).sum();
            let source = world.count(at(-1), iron());
            let arrived = world.count(at(setup.length), iron());
            let spilled = world.spilled_total();
            prop_assert_eq!(source + flying + arrived + spilled, setup.items);
        }
    }

    #[test]
    fn full_save_round_trips(stacks in proptest::collection::vec(arb_stack(), 0..12)) {
        let mut table = TransitTable::new();
        for s in stacks {
            table.add(s);
        }
        let bytes = save_transit(&table).unwrap();
        let loaded = load_transit(&bytes).unwrap();
        prop_assert_eq!(loaded.len(), table.len());
        prop_assert_eq!(loaded.next_id(), table.next_id());
        prop_assert_eq!(save_transit(&loaded).unwrap(), bytes);
        for (id, s) in table.iter().filter(|(_, s)| s.path_type == PathType::Dest) {
            prop_assert_eq!(loaded.get(id), Some(s));
        }
    }

    #[test]
    fn failure_delay_is_monotonic_and_capped(a in 0..1000u32, b in 0..1000u32) {
        let (lo, hi) = (a.min(b), a.max(b));
        prop_assert!(failure_delay(lo) <= failure_delay(hi));
        prop_assert!(failure_delay(hi) <= MAX_RETRY_TICKS);
    }
}
