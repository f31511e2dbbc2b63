//! Main simulation world that ties everything together
//!
//! `SimAirfield` is the surface traffic scheduler. It owns the roster and the
//! segment table and advances both by exactly one step per call to `step`.
//! Within a tick the phases run in a fixed order:
//!
//! 1. outbound aircraft, in roster (insertion) order
//! 2. inbound aircraft, in roster order; held arrivals stay frozen
//! 3. spawning, only when no arrival is waiting for a reservation
//! 4. reservation admission for at most one held arrival, oldest first,
//!    once its segments are idle and no departure stands on its route
//!
//! Departures never step into the remaining route of a cleared arrival, so a
//! departure and an arrival cannot wait on each other.
//! 5. the service vehicle marker

use anyhow::{Context, Result};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

use super::aerodrome::AerodromeConfig;
use super::aircraft::{
    Claims, HeldArrival, InboundAircraft, OutboundAircraft, StepContext, StepOutcome,
};
use super::marker::ServiceVehicle;
use super::segments::SegmentTable;
use super::spawn::{inbound_route, OUTBOUND_SHARE};
use super::stats::{SimStats, TickReport};
use super::types::{AircraftId, AircraftKind, Point, Waypoint};

/// Consecutive stalled ticks before the gridlock warning
pub const STALL_WARNING_TICKS: u64 = 20;

/// One aircraft as seen by the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct AircraftView {
    pub id: AircraftId,
    pub kind: AircraftKind,
    pub waypoint: Waypoint,
    /// Chart coordinates; `None` while airborne at the exit marker
    pub point: Option<Point>,
    /// Arrival still waiting for its reservation
    pub held: bool,
}

/// Read-only state handed to the presentation layer after each tick
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub tick: u64,
    pub aircraft: Vec<AircraftView>,
    /// Decorative service vehicle position
    pub marker: Option<Point>,
}

impl Snapshot {
    /// (id, position) pairs for every live aircraft
    pub fn positions(&self) -> Vec<(AircraftId, Waypoint)> {
        self.aircraft.iter().map(|a| (a.id, a.waypoint)).collect()
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }
}

/// The surface traffic scheduler
pub struct SimAirfield {
    /// Static aerodrome data
    config: AerodromeConfig,

    /// FIFO queue per taxiway segment
    segments: SegmentTable,

    /// Departing aircraft, in insertion order
    outbound: Vec<OutboundAircraft>,

    /// Arriving aircraft, in insertion order
    inbound: Vec<InboundAircraft>,

    /// Arrivals waiting for their multi-segment reservation, oldest first
    held: Vec<HeldArrival>,

    target_population: usize,

    service_vehicle: ServiceVehicle,

    /// Ticks completed so far
    tick: u64,

    rng: StdRng,

    stats: SimStats,
}

impl SimAirfield {
    fn new_internal(config: AerodromeConfig, rng: StdRng) -> Result<Self> {
        config.validate().context("Invalid aerodrome configuration")?;

        Ok(Self {
            segments: SegmentTable::new(config.segment_count()),
            service_vehicle: ServiceVehicle::new(config.service_path.clone()),
            config,
            outbound: Vec::new(),
            inbound: Vec::new(),
            held: Vec::new(),
            target_population: 0,
            tick: 0,
            rng,
            stats: SimStats::default(),
        })
    }

    pub fn new(config: AerodromeConfig) -> Result<Self> {
        Self::new_internal(config, StdRng::from_rng(&mut rand::rng()))
    }

    /// Create a new SimAirfield with a seeded RNG for reproducible simulations
    pub fn new_with_seed(config: AerodromeConfig, seed: u64) -> Result<Self> {
        Self::new_internal(config, StdRng::seed_from_u64(seed))
    }

    /// Create a simulation of the built-in aerodrome
    pub fn with_default_aerodrome(seed: Option<u64>) -> Result<Self> {
        let config = AerodromeConfig::default_aerodrome()?;
        match seed {
            Some(seed) => Self::new_with_seed(config, seed),
            None => Self::new(config),
        }
    }

    /// Sets the desired number of live aircraft, used from the next spawn phase.
    ///
    /// # Panics
    /// If `target` exceeds the number of spawn slots.
    pub fn set_target_population(&mut self, target: usize) {
        assert!(
            target <= self.config.slot_count(),
            "target population {} exceeds the {} spawn slots",
            target,
            self.config.slot_count()
        );
        self.target_population = target;
    }

    pub fn target_population(&self) -> usize {
        self.target_population
    }

    /// Live aircraft, held arrivals included
    pub fn population(&self) -> usize {
        self.outbound.len() + self.inbound.len()
    }

    pub fn is_live(&self, id: AircraftId) -> bool {
        self.outbound.iter().any(|a| a.id == id) || self.inbound.iter().any(|a| a.id == id)
    }

    pub fn is_held(&self, id: AircraftId) -> bool {
        self.held.iter().any(|h| h.id == id)
    }

    pub fn outbound(&self) -> &[OutboundAircraft] {
        &self.outbound
    }

    pub fn inbound(&self) -> &[InboundAircraft] {
        &self.inbound
    }

    pub fn held(&self) -> &[HeldArrival] {
        &self.held
    }

    pub fn segments(&self) -> &SegmentTable {
        &self.segments
    }

    pub fn config(&self) -> &AerodromeConfig {
        &self.config
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Ground positions held by live aircraft at the start of a tick, plus
    /// the corridor of every arrival already cleared to taxi
    fn occupied_positions(&self) -> Claims {
        let mut claims = Claims::default();
        for aircraft in &self.outbound {
            claims.claim(aircraft.position);
        }
        for aircraft in &self.inbound {
            claims.claim(aircraft.position());
            if !self.is_held(aircraft.id) {
                claims.reserve_corridor(aircraft.path.iter().copied());
            }
        }
        claims
    }

    /// Advances the simulation by exactly one tick
    pub fn step(&mut self) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..Default::default()
        };

        let mut claims = self.occupied_positions();
        let held_ids: HashSet<AircraftId> = self.held.iter().map(|h| h.id).collect();
        let mut retired: Vec<(AircraftId, AircraftKind)> = Vec::new();

        let mut outbound = std::mem::take(&mut self.outbound);
        let mut inbound = std::mem::take(&mut self.inbound);
        {
            let mut ctx = StepContext {
                graph: &self.config.graph,
                registry: &self.config.registry,
                segments: &mut self.segments,
                claims: &mut claims,
                rng: &mut self.rng,
            };

            outbound.retain_mut(|aircraft| match aircraft.advance(&mut ctx) {
                StepOutcome::Moved => {
                    report.moved += 1;
                    true
                }
                StepOutcome::Held => {
                    report.held += 1;
                    true
                }
                StepOutcome::Retired => {
                    retired.push((aircraft.id, AircraftKind::Outbound));
                    false
                }
            });

            inbound.retain_mut(|aircraft| {
                if held_ids.contains(&aircraft.id) {
                    report.held += 1;
                    return true;
                }
                match aircraft.advance(&mut ctx) {
                    StepOutcome::Moved => {
                        report.moved += 1;
                        true
                    }
                    StepOutcome::Held => {
                        report.held += 1;
                        true
                    }
                    StepOutcome::Retired => {
                        retired.push((aircraft.id, AircraftKind::Inbound));
                        false
                    }
                }
            });
        }
        self.outbound = outbound;
        self.inbound = inbound;

        for (id, kind) in retired {
            assert!(
                !self.segments.holds_any(id),
                "aircraft {} retired while still queued on a segment",
                id
            );
            match kind {
                AircraftKind::Outbound => self.stats.retired_outbound += 1,
                AircraftKind::Inbound => self.stats.retired_inbound += 1,
            }
            report.retired += 1;
            debug!("{:?} aircraft {} completed its route", kind, id);
        }

        if self.held.is_empty() {
            report.spawned = self.spawn_phase(&mut claims);
        }

        report.admitted = self.admit_held_arrival();

        self.service_vehicle.tick(&mut self.rng);

        self.segments.assert_consistent();
        report.population = self.population();
        self.stats.record(&report);

        if self.stats.current_stall() == STALL_WARNING_TICKS {
            warn!(
                "No aircraft has moved for {} ticks with {} live; the aerodrome may be gridlocked",
                STALL_WARNING_TICKS, report.population
            );
        }

        report
    }

    /// Fills free stands until the roster reaches the target population
    fn spawn_phase(&mut self, claims: &mut Claims) -> usize {
        let mut spawned = 0;

        while self.population() < self.target_population {
            let free: Vec<usize> = (0..self.config.slot_count())
                .filter(|slot| self.slot_is_free(*slot, claims))
                .collect();

            let Some(&slot) = free.choose(&mut self.rng) else {
                break;
            };

            if self.rng.random_ratio(OUTBOUND_SHARE.0, OUTBOUND_SHARE.1) {
                self.place_outbound(slot, claims);
            } else if let Err(e) = self.place_inbound(slot) {
                // Validation guarantees every slot has a zone and a route
                panic!("failed to generate an arrival for slot {}: {:#}", slot, e);
            }
            spawned += 1;
        }

        spawned
    }

    fn slot_is_free(&self, slot: usize, claims: &Claims) -> bool {
        let id = AircraftId(slot);
        let stand = Waypoint::Node(self.config.slots[slot].position);
        !self.is_live(id) && !claims.is_claimed(stand)
    }

    fn place_outbound(&mut self, slot: usize, claims: &mut Claims) -> AircraftId {
        let id = AircraftId(slot);
        let stand = Waypoint::Node(self.config.slots[slot].position);
        self.outbound.push(OutboundAircraft::new(id, stand));
        claims.claim(stand);
        self.stats.spawned_outbound += 1;
        debug!("Outbound {} spawned at {}", id, stand);
        id
    }

    fn place_inbound(&mut self, slot: usize) -> Result<AircraftId> {
        let id = AircraftId(slot);
        let spawn_slot = self.config.slots[slot];
        let zone = self
            .config
            .zones
            .get(spawn_slot.zone)
            .with_context(|| format!("Slot {} names missing zone {}", slot, spawn_slot.zone))?;

        let walk = self.config.graph.walk_to_exit(spawn_slot.position, &mut self.rng)?;
        let segments = zone.required_segments(&walk).to_vec();

        debug!(
            "Inbound {} spawned for stand {} ({} positions), waiting on {:?}",
            id,
            spawn_slot.position.0,
            walk.positions.len(),
            segments
        );

        self.inbound.push(InboundAircraft::new(id, inbound_route(&walk)));
        self.held.push(HeldArrival { id, segments });
        self.stats.spawned_inbound += 1;
        Ok(id)
    }

    /// Places a departure on a specific stand
    pub fn spawn_outbound(&mut self, slot: usize) -> Result<AircraftId> {
        let mut claims = self.occupied_positions();
        self.check_slot(slot, &claims)?;
        Ok(self.place_outbound(slot, &mut claims))
    }

    /// Places an arrival bound for a specific stand; it starts out held
    pub fn spawn_inbound(&mut self, slot: usize) -> Result<AircraftId> {
        let claims = self.occupied_positions();
        self.check_slot(slot, &claims)?;
        self.place_inbound(slot)
    }

    fn check_slot(&self, slot: usize, claims: &Claims) -> Result<()> {
        if slot >= self.config.slot_count() {
            anyhow::bail!(
                "Slot {} out of range, aerodrome has {} slots",
                slot,
                self.config.slot_count()
            );
        }
        if !self.slot_is_free(slot, claims) {
            anyhow::bail!("Slot {} is already in use", slot);
        }
        Ok(())
    }

    /// Grants the oldest held arrival whose segments are all idle and whose
    /// ground route has no departure on it
    fn admit_held_arrival(&mut self) -> usize {
        let Some(index) = self.held.iter().position(|arrival| {
            arrival
                .segments
                .iter()
                .all(|segment| self.segments.is_idle(*segment))
                && self.route_is_clear(arrival.id)
        }) else {
            return 0;
        };

        let arrival = self.held.remove(index);
        let reserved = self.segments.try_reserve(arrival.id, &arrival.segments);
        assert!(reserved, "reservation for {} failed after check", arrival.id);
        debug!(
            "Inbound {} cleared to taxi, reserved {:?}",
            arrival.id, arrival.segments
        );
        1
    }

    /// Whether no departure stands anywhere on the arrival's route
    fn route_is_clear(&self, id: AircraftId) -> bool {
        let Some(arrival) = self.inbound.iter().find(|a| a.id == id) else {
            return false;
        };
        !self.outbound.iter().any(|departure| {
            !departure.position.is_exit() && arrival.path.contains(&departure.position)
        })
    }

    /// Read-only view of the current state for presentation
    pub fn snapshot(&self) -> Snapshot {
        let graph = &self.config.graph;
        let outbound = self.outbound.iter().map(|aircraft| AircraftView {
            id: aircraft.id,
            kind: AircraftKind::Outbound,
            waypoint: aircraft.position,
            point: graph.point_of(aircraft.position),
            held: false,
        });
        let inbound = self.inbound.iter().map(|aircraft| AircraftView {
            id: aircraft.id,
            kind: AircraftKind::Inbound,
            waypoint: aircraft.position(),
            point: graph.point_of(aircraft.position()),
            held: self.is_held(aircraft.id),
        });

        Snapshot {
            tick: self.tick,
            aircraft: outbound.chain(inbound).collect(),
            marker: self.service_vehicle.position(),
        }
    }
}
