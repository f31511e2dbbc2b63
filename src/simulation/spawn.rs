//! Spawn slots, zones and inbound route generation
//!
//! Every stand is a spawn slot. Slots are grouped into zones; a zone names the
//! segments an inbound aircraft must reserve together before it may taxi in.

use std::collections::VecDeque;

use super::navigation::WalkedRoute;
use super::types::{NodeId, SegmentId, Waypoint};

/// Chance that a new aircraft departs; the rest arrive
pub const OUTBOUND_SHARE: (u32, u32) = (2, 3);

/// A stand where aircraft appear; its index is the id of the aircraft using it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnSlot {
    pub position: NodeId,
    pub zone: usize,
}

impl SpawnSlot {
    pub fn new(position: NodeId, zone: usize) -> Self {
        Self { position, zone }
    }
}

/// Replacement reservation list for routes that took a given branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchOverride {
    pub at: NodeId,
    pub toward: Waypoint,
    pub segments: Vec<SegmentId>,
}

/// A geographic group of stands sharing one reservation list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnZone {
    pub name: String,
    /// Segments reserved together, in reservation order
    pub segments: Vec<SegmentId>,
    pub overrides: Vec<BranchOverride>,
}

impl SpawnZone {
    pub fn new(name: impl Into<String>, segments: Vec<SegmentId>) -> Self {
        Self {
            name: name.into(),
            segments,
            overrides: Vec::new(),
        }
    }

    /// Uses `segments` instead when the route branched from `at` toward `toward`
    pub fn with_override(mut self, at: NodeId, toward: Waypoint, segments: Vec<SegmentId>) -> Self {
        self.overrides.push(BranchOverride {
            at,
            toward,
            segments,
        });
        self
    }

    /// Segments an inbound aircraft following `route` in reverse must reserve
    pub fn required_segments(&self, route: &WalkedRoute) -> &[SegmentId] {
        self.overrides
            .iter()
            .find(|o| route.took(o.at, o.toward))
            .map(|o| o.segments.as_slice())
            .unwrap_or(&self.segments)
    }
}

/// Turns an outbound walk into an inbound route.
///
/// The walk runs stand -> ... -> last position before the exit. The inbound
/// route starts at the exit marker (airborne), then visits the same positions
/// in reverse, ending on the stand.
pub fn inbound_route(walk: &WalkedRoute) -> VecDeque<Waypoint> {
    std::iter::once(Waypoint::Exit)
        .chain(walk.positions.iter().rev().map(|node| Waypoint::Node(*node)))
        .collect()
}
