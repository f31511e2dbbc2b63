//! Core types for the surface traffic simulation
//!
//! Identifiers, coordinates and the tagged results the scheduler passes around.

use ordered_float::OrderedFloat;
use std::fmt;

/// A unique aircraft identifier.
/// Aircraft ids are spawn slot indices, so at most one live aircraft per stand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AircraftId(pub usize);

/// A wrapper type for navigation graph positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A wrapper type for physical taxiway segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub usize);

impl fmt::Display for AircraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "taxiway-{}", self.0)
    }
}

/// Where an aircraft can be: an ordinary ground position or the exit marker.
///
/// The exit marker stands for "off the aerodrome" (airborne). Outbound routes
/// end there and inbound routes start there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Waypoint {
    Node(NodeId),
    Exit,
}

impl Waypoint {
    pub fn is_exit(&self) -> bool {
        matches!(self, Waypoint::Exit)
    }

    pub fn node(&self) -> Option<NodeId> {
        match self {
            Waypoint::Node(node) => Some(*node),
            Waypoint::Exit => None,
        }
    }
}

impl From<NodeId> for Waypoint {
    fn from(node: NodeId) -> Self {
        Waypoint::Node(node)
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Waypoint::Node(node) => write!(f, "node {}", node.0),
            Waypoint::Exit => write!(f, "exit"),
        }
    }
}

/// The role a registered position plays for its segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WayRole {
    /// First position of the segment in the outbound direction
    Start,
    /// Last position of the segment in the outbound direction
    End,
    /// Never matches; used as the enqueue role of inbound traffic
    Ignore,
}

/// Direction of travel, which decides which roles enqueue and release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficDirection {
    /// Stand to runway, walking the navigation graph forward
    Outbound,
    /// Runway to stand, consuming a precomputed reversed route
    Inbound,
}

impl TrafficDirection {
    /// Role at which an aircraft joins a segment queue
    pub fn enqueue_role(self) -> WayRole {
        match self {
            TrafficDirection::Outbound => WayRole::Start,
            // Inbound aircraft are queued up front by the reservation
            TrafficDirection::Inbound => WayRole::Ignore,
        }
    }

    /// Role at which an aircraft leaves a segment queue
    pub fn release_role(self) -> WayRole {
        match self {
            TrafficDirection::Outbound => WayRole::End,
            TrafficDirection::Inbound => WayRole::Start,
        }
    }
}

/// Result of a segment admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The current position is not registered; the caller moves freely
    Unregulated,
    /// Not at the head of the segment queue; stay put this tick
    Hold,
    /// Head of the queue; the candidate step is approved
    Proceed(Waypoint),
    /// Head of the queue on a last-step check; nothing to move
    Released,
}

/// A 2D position on the aerodrome, for presentation only
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Hashable key for exact coordinate lookups
    pub fn key(&self) -> (OrderedFloat<f32>, OrderedFloat<f32>) {
        (OrderedFloat(self.x), OrderedFloat(self.y))
    }
}

/// Kind of a live aircraft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AircraftKind {
    Outbound,
    Inbound,
}
