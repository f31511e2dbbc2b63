//! Scheduler behaviour tests
//!
//! Small hand-built aerodromes exercise individual rules; the built-in
//! aerodrome is used for longer seeded runs.

use airfield_sim::simulation::{
    AerodromeConfig, AircraftId, AircraftKind, Claims, InboundAircraft, NavigationGraph, NodeId,
    Point, SegmentId, SegmentTable, SimAirfield, Snapshot, SpawnSlot, SpawnZone, StepContext,
    TaxiwayRegistry, WayRole, Waypoint, STALL_WARNING_TICKS,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashSet, VecDeque};

/// Two stands feeding one shared position that leads straight to the exit.
/// A third stand sits on the shared position itself.
fn merge_aerodrome() -> AerodromeConfig {
    let mut graph = NavigationGraph::new();
    let left = graph.add_position(Point::new(0.0, 0.0));
    let right = graph.add_position(Point::new(20.0, 0.0));
    let merge = graph.add_position(Point::new(10.0, 10.0));
    graph.connect(left, merge).unwrap();
    graph.connect(right, merge).unwrap();
    graph.connect(merge, Waypoint::Exit).unwrap();

    AerodromeConfig::new(
        graph,
        TaxiwayRegistry::new(1),
        vec![
            SpawnSlot::new(left, 0),
            SpawnSlot::new(right, 0),
            SpawnSlot::new(merge, 0),
        ],
        vec![SpawnZone::new("apron", Vec::new())],
    )
}

/// Two stands sharing one taxi route through segments 6, 10, 1 and 0.
/// Segment 6 takes three ticks to cross.
fn chained_aerodrome() -> AerodromeConfig {
    let mut graph = NavigationGraph::new();
    let mut at = |x: f32| graph.add_position(Point::new(x, 0.0));
    let stand_d = at(0.0);
    let stand_t = at(5.0);
    let s6 = at(10.0);
    let m1 = at(20.0);
    let m2 = at(30.0);
    let e6 = at(40.0);
    let s10 = at(50.0);
    let e10 = at(60.0);
    let s1 = at(70.0);
    let e1 = at(80.0);
    let s0 = at(90.0);

    graph.connect(stand_d, s6).unwrap();
    graph.connect(stand_t, s6).unwrap();
    for pair in [s6, m1, m2, e6, s10, e10, s1, e1, s0].windows(2) {
        graph.connect(pair[0], pair[1]).unwrap();
    }
    graph.connect(s0, Waypoint::Exit).unwrap();

    let mut registry = TaxiwayRegistry::new(11);
    registry.register(s6, SegmentId(6), WayRole::Start).unwrap();
    registry.register(e6, SegmentId(6), WayRole::End).unwrap();
    registry.register(s10, SegmentId(10), WayRole::Start).unwrap();
    registry.register(e10, SegmentId(10), WayRole::End).unwrap();
    registry.register(s1, SegmentId(1), WayRole::Start).unwrap();
    registry.register(e1, SegmentId(1), WayRole::End).unwrap();
    registry.register(s0, SegmentId(0), WayRole::Start).unwrap();
    registry
        .register(Waypoint::Exit, SegmentId(0), WayRole::End)
        .unwrap();

    AerodromeConfig::new(
        graph,
        registry,
        vec![SpawnSlot::new(stand_d, 0), SpawnSlot::new(stand_t, 0)],
        vec![SpawnZone::new(
            "west apron",
            vec![SegmentId(6), SegmentId(10), SegmentId(1), SegmentId(0)],
        )],
    )
}

/// A single lane: stand A -> junction -> segment 0 start -> runway -> exit,
/// with stand B feeding the same junction
fn lane_aerodrome() -> AerodromeConfig {
    let mut graph = NavigationGraph::new();
    let stand_a = graph.add_position(Point::new(0.0, 0.0));
    let stand_b = graph.add_position(Point::new(0.0, 20.0));
    let junction = graph.add_position(Point::new(10.0, 10.0));
    let entry = graph.add_position(Point::new(20.0, 10.0));
    let runway = graph.add_position(Point::new(30.0, 10.0));
    graph.connect(stand_a, junction).unwrap();
    graph.connect(stand_b, junction).unwrap();
    graph.connect(junction, entry).unwrap();
    graph.connect(entry, runway).unwrap();
    graph.connect(runway, Waypoint::Exit).unwrap();

    let mut registry = TaxiwayRegistry::new(1);
    registry.register(entry, SegmentId(0), WayRole::Start).unwrap();
    registry
        .register(Waypoint::Exit, SegmentId(0), WayRole::End)
        .unwrap();

    AerodromeConfig::new(
        graph,
        registry,
        vec![SpawnSlot::new(stand_a, 0), SpawnSlot::new(stand_b, 0)],
        vec![SpawnZone::new("apron", vec![SegmentId(0)])],
    )
}

/// Steps until nobody is left, returning the tick the last aircraft retired
fn run_until_empty(airfield: &mut SimAirfield, limit: u64) -> Option<u64> {
    for _ in 0..limit {
        airfield.step();
        if airfield.population() == 0 {
            return Some(airfield.current_tick());
        }
    }
    None
}

fn queue(airfield: &SimAirfield, segment: usize) -> Vec<AircraftId> {
    airfield.segments().queue(SegmentId(segment)).collect()
}

fn outbound_position(airfield: &SimAirfield, id: AircraftId) -> Option<Waypoint> {
    airfield
        .outbound()
        .iter()
        .find(|a| a.id == id)
        .map(|a| a.position)
}

#[test]
fn test_outbound_next_to_exit_retires_after_one_tick() {
    let mut airfield = SimAirfield::new_with_seed(merge_aerodrome(), 1).unwrap();
    let id = airfield.spawn_outbound(2).unwrap();
    assert_eq!(id, AircraftId(2));
    assert_eq!(airfield.snapshot().len(), 1);

    let report = airfield.step();
    assert_eq!(report.retired, 1);
    assert!(airfield.snapshot().is_empty());
    assert!(!airfield.is_live(id));
    assert_eq!(airfield.stats().retired_outbound, 1);
}

#[test]
fn test_contested_occupied_position_holds_both() {
    let mut airfield = SimAirfield::new_with_seed(merge_aerodrome(), 1).unwrap();
    let left = airfield.spawn_outbound(0).unwrap();
    let right = airfield.spawn_outbound(1).unwrap();
    let blocker = airfield.spawn_outbound(2).unwrap();
    let before = airfield.snapshot();

    // Both want the merge position, which is occupied when the tick starts
    let report = airfield.step();
    assert_eq!(report.held, 2);
    assert_eq!(report.retired, 1);
    assert!(!airfield.is_live(blocker));

    let after = airfield.snapshot();
    let position = |snapshot: &Snapshot, id: AircraftId| {
        snapshot
            .aircraft
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.waypoint)
    };
    assert_eq!(position(&before, left), position(&after, left));
    assert_eq!(position(&before, right), position(&after, right));
}

#[test]
fn test_free_contested_position_goes_to_first_in_roster() {
    let mut airfield = SimAirfield::new_with_seed(merge_aerodrome(), 1).unwrap();
    let merge = Waypoint::Node(airfield.config().slots[2].position);
    let right = airfield.spawn_outbound(1).unwrap();
    let left = airfield.spawn_outbound(0).unwrap();
    let right_stand = outbound_position(&airfield, right);
    let left_stand = outbound_position(&airfield, left);

    let report = airfield.step();
    assert_eq!(report.moved, 1);
    assert_eq!(report.held, 1);
    assert_eq!(outbound_position(&airfield, right), Some(merge));
    assert_eq!(outbound_position(&airfield, left), left_stand);

    // The merge position is still taken when the next tick starts
    airfield.step();
    assert!(!airfield.is_live(right));
    assert_eq!(outbound_position(&airfield, left), left_stand);

    airfield.step();
    assert_eq!(outbound_position(&airfield, left), Some(merge));
    airfield.step();
    assert!(!airfield.is_live(left));
    assert_ne!(right_stand, left_stand);
}

#[test]
fn test_outbound_releases_every_segment_on_the_way_out() {
    let mut airfield = SimAirfield::new_with_seed(chained_aerodrome(), 5).unwrap();
    let id = airfield.spawn_outbound(0).unwrap();

    let mut seen: HashSet<usize> = HashSet::new();
    let mut retired_at = None;
    for tick in 1..=20 {
        let report = airfield.step();
        for segment in 0..11 {
            if queue(&airfield, segment).contains(&id) {
                seen.insert(segment);
            }
        }
        if report.retired == 1 {
            retired_at = Some(tick);
            break;
        }
    }

    assert_eq!(retired_at, Some(10));
    assert_eq!(seen, HashSet::from([6, 10, 1]));
    for segment in 0..11 {
        assert!(airfield.segments().is_idle(SegmentId(segment)));
    }
}

#[test]
fn test_arrival_waits_for_all_segments_idle() {
    let mut airfield = SimAirfield::new_with_seed(chained_aerodrome(), 5).unwrap();
    let blocker = airfield.spawn_outbound(0).unwrap();
    airfield.step();
    airfield.step();
    assert_eq!(queue(&airfield, 6), vec![blocker]);

    let arrival = airfield.spawn_inbound(1).unwrap();
    assert_eq!(arrival, AircraftId(1));
    assert!(airfield.is_held(arrival));
    assert!(!airfield.segments().holds_any(arrival));

    // Segment 6 stays busy for two more ticks, then the departure is still
    // taxiing along the arrival's route until it takes off
    for tick in 3..10 {
        let report = airfield.step();
        assert_eq!(report.admitted, 0, "Admitted early at tick {}", tick);
        assert!(airfield.is_held(arrival));
        assert!(!airfield.segments().holds_any(arrival));
        if tick < 5 {
            assert_eq!(queue(&airfield, 6), vec![blocker]);
        }
    }

    let report = airfield.step();
    assert_eq!(report.admitted, 1);
    assert!(!airfield.is_live(blocker));
    assert!(!airfield.is_held(arrival));
    for segment in [6, 10, 1, 0] {
        assert_eq!(queue(&airfield, segment), vec![arrival]);
    }
    assert_eq!(airfield.stats().reservations_admitted, 1);
}

#[test]
fn test_arrival_taxis_to_stand_and_releases() {
    let mut airfield = SimAirfield::new_with_seed(chained_aerodrome(), 5).unwrap();
    let stand = Waypoint::Node(airfield.config().slots[1].position);
    let arrival = airfield.spawn_inbound(1).unwrap();

    let snapshot = airfield.snapshot();
    assert_eq!(snapshot.aircraft[0].waypoint, Waypoint::Exit);
    assert_eq!(snapshot.aircraft[0].point, None);
    assert!(snapshot.aircraft[0].held);

    let report = airfield.step();
    assert_eq!(report.admitted, 1);

    let mut reached_stand = false;
    let mut retired_at = None;
    for tick in 2..=20 {
        let report = airfield.step();
        if report.retired == 1 {
            retired_at = Some(tick);
            break;
        }
        let inbound = &airfield.inbound()[0];
        if inbound.position() == stand {
            reached_stand = true;
        }
    }

    assert!(reached_stand);
    assert_eq!(retired_at, Some(12));
    assert!(!airfield.is_live(arrival));
    assert!(!airfield.segments().holds_any(arrival));
    assert_eq!(airfield.stats().retired_inbound, 1);
}

#[test]
fn test_spawning_waits_for_held_arrivals() {
    let mut airfield = SimAirfield::new_with_seed(chained_aerodrome(), 11).unwrap();
    airfield.spawn_inbound(1).unwrap();
    airfield.set_target_population(2);

    let report = airfield.step();
    assert_eq!(report.spawned, 0);
    assert_eq!(report.admitted, 1);
    assert_eq!(airfield.population(), 1);

    let report = airfield.step();
    assert_eq!(report.spawned, 1);
    assert!(airfield.is_live(AircraftId(0)));
}

#[test]
fn test_manual_spawn_rejects_bad_slots() {
    let mut airfield = SimAirfield::new_with_seed(merge_aerodrome(), 1).unwrap();
    assert!(airfield.spawn_outbound(3).is_err());
    airfield.spawn_outbound(0).unwrap();
    assert!(airfield.spawn_outbound(0).is_err());
    assert!(airfield.spawn_inbound(0).is_err());
}

#[test]
fn test_invalid_aerodrome_is_rejected() {
    let mut config = chained_aerodrome();
    config.zones[0].segments = vec![SegmentId(6), SegmentId(10), SegmentId(1)];
    assert!(SimAirfield::new(config).is_err());

    let mut config = chained_aerodrome();
    config.slots[1].zone = 4;
    assert!(SimAirfield::new(config).is_err());

    let mut config = merge_aerodrome();
    config.slots[1].position = config.slots[0].position;
    assert!(SimAirfield::new(config).is_err());
}

#[test]
fn test_default_aerodrome_validates() {
    let config = AerodromeConfig::default_aerodrome().unwrap();
    config.validate().unwrap();
    assert_eq!(config.slot_count(), 40);
    assert_eq!(config.segment_count(), 11);
    assert_eq!(config.zones.len(), 4);
    assert_eq!(
        config.registry.lookup(Waypoint::Exit),
        Some((SegmentId(0), WayRole::End))
    );
    assert!(config.service_path.len() > 1);
}

#[test]
#[should_panic(expected = "exceeds")]
fn test_target_above_slot_count_panics() {
    let mut airfield = SimAirfield::with_default_aerodrome(Some(1)).unwrap();
    airfield.set_target_population(41);
}

#[test]
fn test_population_fills_to_target() {
    let mut airfield = SimAirfield::with_default_aerodrome(Some(8)).unwrap();
    airfield.set_target_population(3);
    let report = airfield.step();

    assert_eq!(report.spawned, 3);
    assert_eq!(airfield.population(), 3);
    assert_eq!(airfield.stats().total_spawned(), 3);
    assert!(airfield.held().len() as u64 <= airfield.stats().spawned_inbound);
}

#[test]
fn test_ground_positions_stay_exclusive() {
    let mut airfield = SimAirfield::with_default_aerodrome(Some(2024)).unwrap();
    airfield.set_target_population(10);

    for _ in 0..400 {
        let report = airfield.step();
        assert!(report.admitted <= 1);
        assert!(airfield.population() <= 10);

        let snapshot = airfield.snapshot();
        let mut occupied = HashSet::new();
        let mut ids = HashSet::new();
        for aircraft in &snapshot.aircraft {
            assert!(aircraft.id.0 < 40);
            assert!(ids.insert(aircraft.id), "Duplicate id {}", aircraft.id);
            if aircraft.held {
                assert_eq!(aircraft.waypoint, Waypoint::Exit);
                assert_eq!(aircraft.kind, AircraftKind::Inbound);
            }
            if !aircraft.waypoint.is_exit() {
                assert!(
                    occupied.insert(aircraft.waypoint),
                    "Two aircraft share {}",
                    aircraft.waypoint
                );
            }
        }

        // Held arrivals own no queue slots
        for held in airfield.held() {
            assert!(!airfield.segments().holds_any(held.id));
        }
    }

    let stats = airfield.stats();
    assert_eq!(stats.ticks, 400);
    assert!(stats.total_spawned() >= 10);
    assert!(
        stats.longest_stall < STALL_WARNING_TICKS,
        "Traffic stalled for {} ticks",
        stats.longest_stall
    );
    assert_eq!(
        stats.total_spawned() - stats.total_retired(),
        airfield.population() as u64
    );
}

#[test]
fn test_seeded_runs_are_identical() {
    let mut first = SimAirfield::with_default_aerodrome(Some(77)).unwrap();
    let mut second = SimAirfield::with_default_aerodrome(Some(77)).unwrap();
    first.set_target_population(6);
    second.set_target_population(6);

    for _ in 0..150 {
        assert_eq!(first.step(), second.step());
        assert_eq!(first.snapshot(), second.snapshot());
    }
}

#[test]
fn test_lowering_target_lets_aircraft_finish() {
    let mut airfield = SimAirfield::with_default_aerodrome(Some(5)).unwrap();
    airfield.set_target_population(4);
    airfield.step();
    let before = airfield.population();
    assert!(before > 0);

    airfield.set_target_population(0);
    let report = airfield.step();
    assert_eq!(report.spawned, 0);
    assert!(airfield.population() <= before);
}

#[test]
fn test_step_outcome_reported_per_aircraft() {
    let mut airfield = SimAirfield::new_with_seed(merge_aerodrome(), 3).unwrap();
    airfield.spawn_outbound(0).unwrap();
    airfield.spawn_outbound(1).unwrap();

    let report = airfield.step();
    assert_eq!(report.moved + report.held + report.retired, 2);
    assert_eq!(report.population, 2);
    assert_eq!(report.tick, 1);
    assert_eq!(airfield.current_tick(), 1);
}

#[test]
fn test_held_arrival_is_skipped_by_movement() {
    let mut airfield = SimAirfield::new_with_seed(chained_aerodrome(), 5).unwrap();
    let blocker = airfield.spawn_outbound(0).unwrap();
    airfield.step();
    airfield.step();
    let arrival = airfield.spawn_inbound(1).unwrap();

    let report = airfield.step();
    assert_eq!(report.held, 1);
    assert_eq!(report.moved, 1);
    assert!(airfield.is_held(arrival));
    assert_eq!(airfield.inbound()[0].position(), Waypoint::Exit);
    assert_eq!(
        outbound_position(&airfield, blocker),
        Some(Waypoint::Node(NodeId(4)))
    );
}

#[test]
fn test_departure_gives_way_to_cleared_arrival() {
    let mut airfield = SimAirfield::new_with_seed(lane_aerodrome(), 9).unwrap();
    let arrival = airfield.spawn_inbound(0).unwrap();
    assert_eq!(airfield.step().admitted, 1);

    // The departure would meet the arrival head-on at the segment entry
    let departure = airfield.spawn_outbound(1).unwrap();
    let stand = outbound_position(&airfield, departure);
    for _ in 0..3 {
        airfield.step();
        assert_eq!(outbound_position(&airfield, departure), stand);
    }

    assert!(run_until_empty(&mut airfield, 20).is_some());
    assert!(!airfield.is_live(arrival));
    assert_eq!(airfield.stats().retired_inbound, 1);
    assert_eq!(airfield.stats().retired_outbound, 1);
    assert!(airfield.segments().is_idle(SegmentId(0)));
}

#[test]
fn test_arrival_waits_for_departure_on_its_route() {
    let mut airfield = SimAirfield::new_with_seed(lane_aerodrome(), 9).unwrap();
    let departure = airfield.spawn_outbound(1).unwrap();
    let arrival = airfield.spawn_inbound(0).unwrap();

    // Segment 0 is idle, but the departure is taxiing down the arrival's lane
    for _ in 0..3 {
        let report = airfield.step();
        assert_eq!(report.admitted, 0);
        assert!(airfield.is_held(arrival));
    }

    let report = airfield.step();
    assert_eq!(report.retired, 1);
    assert_eq!(report.admitted, 1);
    assert!(!airfield.is_live(departure));

    assert_eq!(run_until_empty(&mut airfield, 20), Some(9));
    assert!(airfield.segments().is_idle(SegmentId(0)));
}

#[test]
fn test_traffic_keeps_flowing() {
    for population in [2, 8, 40] {
        for seed in 0..4 {
            let mut airfield = SimAirfield::with_default_aerodrome(Some(seed)).unwrap();
            airfield.set_target_population(population);

            let mut retired_before = 0;
            for window in 0..5 {
                for _ in 0..200 {
                    airfield.step();
                }
                let retired = airfield.stats().total_retired();
                assert!(
                    retired > retired_before,
                    "No retirements in window {} (population {}, seed {})",
                    window,
                    population,
                    seed
                );
                retired_before = retired;
            }

            assert!(
                airfield.stats().longest_stall < STALL_WARNING_TICKS,
                "Stalled for {} ticks (population {}, seed {})",
                airfield.stats().longest_stall,
                population,
                seed
            );
        }
    }
}

#[test]
#[should_panic(expected = "held at its stand")]
fn test_arrival_reaching_stand_it_does_not_own_panics() {
    let mut graph = NavigationGraph::new();
    let stand = graph.add_position(Point::new(0.0, 0.0));
    graph.connect(stand, Waypoint::Exit).unwrap();
    let mut registry = TaxiwayRegistry::new(1);
    registry.register(stand, SegmentId(0), WayRole::End).unwrap();

    let mut segments = SegmentTable::new(1);
    assert!(segments.try_reserve(AircraftId(7), &[SegmentId(0)]));
    let mut claims = Claims::default();
    let mut rng = StdRng::seed_from_u64(0);
    let mut ctx = StepContext {
        graph: &graph,
        registry: &registry,
        segments: &mut segments,
        claims: &mut claims,
        rng: &mut rng,
    };

    let mut arrival = InboundAircraft::new(AircraftId(1), VecDeque::from([Waypoint::Node(stand)]));
    arrival.advance(&mut ctx);
}
