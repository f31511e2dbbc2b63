//! Aircraft movement logic for the surface traffic simulation
//!
//! Each live aircraft advances at most one position per tick. Outbound aircraft
//! walk the navigation graph forward; inbound aircraft consume a precomputed
//! route from the front.

use log::trace;
use rand::Rng;
use std::collections::{HashSet, VecDeque};

use super::navigation::NavigationGraph;
use super::registry::TaxiwayRegistry;
use super::segments::SegmentTable;
use super::types::{Admission, AircraftId, SegmentId, TrafficDirection, Waypoint};

/// Result of advancing one aircraft by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Aircraft stepped to a new position
    Moved,
    /// Aircraft stayed where it was
    Held,
    /// Aircraft completed its route and leaves the roster
    Retired,
}

/// Positions occupied or claimed during the current tick.
/// The exit marker holds any number of aircraft and is never claimed.
///
/// The corridor is the remaining ground route of every cleared arrival.
/// Departures may not step into it, so an arrival never meets a departure
/// head-on.
#[derive(Debug, Clone, Default)]
pub struct Claims {
    occupied: HashSet<Waypoint>,
    corridor: HashSet<Waypoint>,
}

impl Claims {
    pub fn claim(&mut self, waypoint: Waypoint) {
        if !waypoint.is_exit() {
            self.occupied.insert(waypoint);
        }
    }

    pub fn is_claimed(&self, waypoint: Waypoint) -> bool {
        self.occupied.contains(&waypoint)
    }

    /// Keeps departures off the given arrival route
    pub fn reserve_corridor(&mut self, route: impl IntoIterator<Item = Waypoint>) {
        self.corridor
            .extend(route.into_iter().filter(|waypoint| !waypoint.is_exit()));
    }

    pub fn in_corridor(&self, waypoint: Waypoint) -> bool {
        self.corridor.contains(&waypoint)
    }
}

/// Everything an aircraft consults while taking its step
pub struct StepContext<'a, R: Rng + ?Sized> {
    pub graph: &'a NavigationGraph,
    pub registry: &'a TaxiwayRegistry,
    pub segments: &'a mut SegmentTable,
    pub claims: &'a mut Claims,
    pub rng: &'a mut R,
}

/// An aircraft taxiing from its stand to the runway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundAircraft {
    pub id: AircraftId,
    pub position: Waypoint,
}

impl OutboundAircraft {
    pub fn new(id: AircraftId, position: Waypoint) -> Self {
        Self { id, position }
    }

    /// Update outbound movement for one tick
    pub fn advance<R: Rng + ?Sized>(&mut self, ctx: &mut StepContext<'_, R>) -> StepOutcome {
        let node = match self.position {
            Waypoint::Exit => return self.finish(ctx),
            Waypoint::Node(node) => node,
        };

        // Terminal position: release whatever is held here, no movement
        let Some(candidate) = ctx.graph.next(node, &mut *ctx.rng) else {
            return self.finish(ctx);
        };

        if ctx.claims.is_claimed(candidate) {
            trace!("{} waits at {}, {} is taken", self.id, self.position, candidate);
            return StepOutcome::Held;
        }
        if ctx.claims.in_corridor(candidate) {
            trace!("{} gives way at {}, arrival due through {}", self.id, self.position, candidate);
            return StepOutcome::Held;
        }

        match ctx.segments.try_advance(
            ctx.registry,
            self.id,
            TrafficDirection::Outbound,
            self.position,
            Some(candidate),
        ) {
            Admission::Unregulated | Admission::Proceed(_) => {
                self.position = candidate;
                ctx.claims.claim(candidate);
                if candidate.is_exit() && self.finish(ctx) == StepOutcome::Retired {
                    return StepOutcome::Retired;
                }
                StepOutcome::Moved
            }
            // Released only answers last-step checks
            Admission::Hold | Admission::Released => StepOutcome::Held,
        }
    }

    /// Last-step check at the end of the route; retires once nothing is held here
    fn finish<R: Rng + ?Sized>(&mut self, ctx: &mut StepContext<'_, R>) -> StepOutcome {
        match ctx.segments.try_advance(
            ctx.registry,
            self.id,
            TrafficDirection::Outbound,
            self.position,
            None,
        ) {
            Admission::Hold => StepOutcome::Held,
            Admission::Unregulated | Admission::Released | Admission::Proceed(_) => {
                StepOutcome::Retired
            }
        }
    }
}

/// An aircraft taxiing from the runway back to its stand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundAircraft {
    pub id: AircraftId,
    /// Remaining route; the front is the current position
    pub path: VecDeque<Waypoint>,
}

impl InboundAircraft {
    pub fn new(id: AircraftId, path: VecDeque<Waypoint>) -> Self {
        Self { id, path }
    }

    /// Current position, the front of the remaining route
    pub fn position(&self) -> Waypoint {
        self.path.front().copied().unwrap_or(Waypoint::Exit)
    }

    /// Update inbound movement for one tick
    pub fn advance<R: Rng + ?Sized>(&mut self, ctx: &mut StepContext<'_, R>) -> StepOutcome {
        let Some(current) = self.path.pop_front() else {
            return StepOutcome::Retired;
        };

        let Some(&next) = self.path.front() else {
            // Reached the stand: a final check releases the boundary segment
            let admission = ctx.segments.try_advance(
                ctx.registry,
                self.id,
                TrafficDirection::Inbound,
                current,
                None,
            );
            assert!(
                admission != Admission::Hold,
                "inbound {} held at its stand {} by {:?}",
                self.id,
                current,
                ctx.registry.lookup(current).map(|(segment, _)| segment)
            );
            return StepOutcome::Retired;
        };

        if ctx.claims.is_claimed(next) {
            trace!("{} waits at {}, {} is taken", self.id, current, next);
            self.path.push_front(current);
            return StepOutcome::Held;
        }

        match ctx.segments.try_advance(
            ctx.registry,
            self.id,
            TrafficDirection::Inbound,
            current,
            Some(next),
        ) {
            Admission::Unregulated | Admission::Proceed(_) => {
                ctx.claims.claim(next);
                StepOutcome::Moved
            }
            Admission::Hold | Admission::Released => {
                self.path.push_front(current);
                StepOutcome::Held
            }
        }
    }
}

/// An inbound aircraft frozen until all of its segments are free at once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldArrival {
    pub id: AircraftId,
    pub segments: Vec<SegmentId>,
}
