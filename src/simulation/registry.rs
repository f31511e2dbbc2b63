//! Taxiway registry
//!
//! Maps the positions where FIFO admission applies to their segment and role.

use anyhow::Result;
use std::collections::HashMap;

use super::types::{SegmentId, WayRole, Waypoint};

/// Static mapping from positions to (segment, role)
#[derive(Debug, Clone, Default)]
pub struct TaxiwayRegistry {
    entries: HashMap<Waypoint, (SegmentId, WayRole)>,
    segment_count: usize,
}

impl TaxiwayRegistry {
    /// Creates an empty registry over `segment_count` segments
    pub fn new(segment_count: usize) -> Self {
        Self {
            entries: HashMap::new(),
            segment_count,
        }
    }

    /// Registers a position as the start or end of a segment.
    /// A position carries a single role; registering it twice is an error.
    pub fn register(
        &mut self,
        waypoint: impl Into<Waypoint>,
        segment: SegmentId,
        role: WayRole,
    ) -> Result<()> {
        let waypoint = waypoint.into();
        if segment.0 >= self.segment_count {
            anyhow::bail!(
                "{} is out of range, registry has {} segments",
                segment,
                self.segment_count
            );
        }
        if role == WayRole::Ignore {
            anyhow::bail!("Cannot register {} with the ignore role", waypoint);
        }
        if let Some((existing, _)) = self.entries.get(&waypoint) {
            anyhow::bail!("{} is already registered on {}", waypoint, existing);
        }
        self.entries.insert(waypoint, (segment, role));
        Ok(())
    }

    pub fn lookup(&self, waypoint: Waypoint) -> Option<(SegmentId, WayRole)> {
        self.entries.get(&waypoint).copied()
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over every registered position
    pub fn entries(&self) -> impl Iterator<Item = (Waypoint, SegmentId, WayRole)> + '_ {
        self.entries
            .iter()
            .map(|(waypoint, (segment, role))| (*waypoint, *segment, *role))
    }
}
