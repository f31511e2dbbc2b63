//! Standalone surface traffic simulation module
//!
//! Aircraft move one position per tick along a fixed navigation graph, sharing
//! taxiway segments that admit one aircraft at a time in FIFO order. Nothing in
//! here renders; presentation reads snapshots after each tick.

mod aerodrome;
mod aircraft;
mod driver;
mod marker;
mod navigation;
mod registry;
mod segments;
mod spawn;
mod stats;
mod types;
mod world;

pub use aerodrome::AerodromeConfig;
pub use aircraft::{
    Claims, HeldArrival, InboundAircraft, OutboundAircraft, StepContext, StepOutcome,
};
pub use driver::{NoopObserver, SimConfig, SnapshotObserver, TickDriver};
pub use marker::{Motion, ServiceVehicle, START_ODDS};
pub use navigation::{NavigationGraph, Successors, WalkedRoute};
pub use registry::TaxiwayRegistry;
pub use segments::SegmentTable;
pub use spawn::{inbound_route, BranchOverride, SpawnSlot, SpawnZone, OUTBOUND_SHARE};
pub use stats::{SimStats, TickReport};
pub use types::{
    Admission, AircraftId, AircraftKind, NodeId, Point, SegmentId, TrafficDirection, WayRole,
    Waypoint,
};
pub use world::{AircraftView, SimAirfield, Snapshot, STALL_WARNING_TICKS};
