//! Sorter line example: pulling, round-robin sorting, observers and saves.
//!
//! A puller drains a supply chest onto a conveyor that feeds three output
//! chests. A sorter next to the same line hands out items round-robin. An
//! observer mirrors the first segment from sync messages, and the busiest
//! segment is saved and reloaded halfway through.
//!
//! Run with: `RUST_LOG=logistics_core=debug cargo run -p logistics-examples --example sorter_line`

use logistics_core::client::ClientTransit;
use logistics_core::config::{Format, LogisticsConfig};
use logistics_core::engine::Engine;
use logistics_core::insert::Offer;
use logistics_core::item::{ItemStack, TransitRequest};
use logistics_core::position::{Pos, Side};
use logistics_core::segment::{ConnectionType, Segment};
use logistics_core::stack::RoutePolicy;
use logistics_core::sync::SyncMessage;
use logistics_core::test_utils::{copper, iron, MockWorld};

const TIERS: &str = "(tiers: (advanced: (speed: 20, pull_amount: 8)))";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = LogisticsConfig::from_str(TIERS, Format::Ron).expect("valid tier table");
    let spec = config.tiers.advanced;
    let mut engine = Engine::new(config.tiers.clone());

    // --- Layout: supply(-1) -> puller(0) -> seg(1..=5), outputs above 3..=5 ---

    let puller = Segment::new(Pos::new(0, 0, 0), spec, engine.tiers())
        .with_side(Side::West, ConnectionType::Pull);
    engine.add_segment(puller).expect("free position");
    for x in 1..=5 {
        engine
            .add_segment(Segment::new(Pos::new(x, 0, 0), spec, engine.tiers()))
            .expect("free position");
    }

    let mut world = MockWorld::new();
    let supply = Pos::new(-1, 0, 0);
    world.add_chest(supply, 256);
    world.put(supply, iron(), 48);
    let outputs = [Pos::new(3, 1, 0), Pos::new(4, 1, 0), Pos::new(5, 1, 0)];
    for &out in &outputs {
        world.add_chest(out, 64);
    }

    let mut observer = ClientTransit::new(Pos::new(0, 0, 0), spec.speed);

    // --- A sorter below segment 1 hands out copper round-robin ---

    let sorter = Pos::new(1, -1, 0);
    let request = TransitRequest::simple(ItemStack::new(copper(), 4));
    let mut sink: Vec<SyncMessage> = Vec::new();
    for _ in 0..3 {
        let offer = Offer {
            outputter: sorter,
            request: &request,
            color: None,
            do_emit: true,
            min: 0,
            policy: RoutePolicy::RoundRobin,
        };
        let response = engine
            .insert_rr(Pos::new(1, 0, 0), offer, &world, &mut sink)
            .expect("segment exists");
        tracing::info!(routed = response.quantity(), "sorter output");
    }

    // --- Run ---

    for tick in 0..120u64 {
        sink.clear();
        let report = engine.step(&mut world, &mut sink);
        for delivery in &report.delivered {
            tracing::info!(tick, target = ?delivery.target, quantity = delivery.stack.quantity, "delivered");
        }

        if tick == 60 {
            let busiest = (0..=5)
                .map(|x| Pos::new(x, 0, 0))
                .max_by_key(|&p| engine.table_at(p).map_or(0, |t| t.len()))
                .expect("non-empty line");
            let saved = engine.save_segment(busiest).expect("segment exists");
            let restored = engine.load_segment(busiest, &saved, &mut sink).expect("valid save");
            tracing::info!(?busiest, bytes = saved.len(), restored, "saved and reloaded segment");
        }

        observer.tick();
        for message in &sink {
            observer.apply(message);
        }
    }

    // --- Summary ---

    println!("=== Sorter Line Summary ===");
    println!("Supply left: {}", world.count(supply, iron()));
    for out in outputs {
        println!(
            "Output {:?}: iron {}, copper {}",
            out,
            world.count(out, iron()),
            world.count(out, copper())
        );
    }
    println!("Packets in flight: {}", engine.packet_count());
    println!("Observer of segment 0 sees {} packets", observer.len());
    println!(
        "Segments awaiting save: {}",
        engine.dirty_tracker().dirty_segments().len()
    );
    println!("Saved: {:?}", engine.take_dirty());
}
