//! Segment resource table and admission control
//!
//! One FIFO queue of aircraft per physical taxiway segment. Only the aircraft
//! at the head of a queue may move through that segment's registered positions.

use log::trace;
use std::collections::VecDeque;

use super::registry::TaxiwayRegistry;
use super::types::{Admission, AircraftId, SegmentId, TrafficDirection, Waypoint};

/// The mutable mutual-exclusion state of the aerodrome
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    queues: Vec<VecDeque<AircraftId>>,
}

impl SegmentTable {
    pub fn new(segment_count: usize) -> Self {
        Self {
            queues: vec![VecDeque::new(); segment_count],
        }
    }

    pub fn segment_count(&self) -> usize {
        self.queues.len()
    }

    /// Aircraft queued on a segment, head first
    pub fn queue(&self, segment: SegmentId) -> impl Iterator<Item = AircraftId> + '_ {
        self.queues
            .get(segment.0)
            .into_iter()
            .flat_map(|queue| queue.iter().copied())
    }

    pub fn head(&self, segment: SegmentId) -> Option<AircraftId> {
        self.queues.get(segment.0).and_then(|queue| queue.front().copied())
    }

    /// Read-only membership test; never reorders the queue
    pub fn is_queued(&self, segment: SegmentId, aircraft: AircraftId) -> bool {
        self.queues
            .get(segment.0)
            .is_some_and(|queue| queue.contains(&aircraft))
    }

    pub fn is_idle(&self, segment: SegmentId) -> bool {
        self.queues.get(segment.0).map_or(true, |queue| queue.is_empty())
    }

    /// Whether the aircraft sits in any segment queue
    pub fn holds_any(&self, aircraft: AircraftId) -> bool {
        self.queues.iter().any(|queue| queue.contains(&aircraft))
    }

    fn enqueue(&mut self, segment: SegmentId, aircraft: AircraftId) {
        let queue = &mut self.queues[segment.0];
        assert!(
            !queue.contains(&aircraft),
            "aircraft {} queued twice on {}",
            aircraft,
            segment
        );
        queue.push_back(aircraft);
    }

    fn release(&mut self, segment: SegmentId, aircraft: AircraftId) {
        let popped = self.queues[segment.0].pop_front();
        assert_eq!(
            popped,
            Some(aircraft),
            "released {} while {} was not at its head",
            segment,
            aircraft
        );
    }

    /// Decides whether an aircraft at `current` may step to `candidate`.
    ///
    /// `candidate` is `None` on the last step of a route: the check only
    /// releases the segment and never approves a move.
    pub fn try_advance(
        &mut self,
        registry: &TaxiwayRegistry,
        aircraft: AircraftId,
        direction: TrafficDirection,
        current: Waypoint,
        candidate: Option<Waypoint>,
    ) -> Admission {
        let Some((segment, role)) = registry.lookup(current) else {
            return Admission::Unregulated;
        };

        if role == direction.enqueue_role() && !self.is_queued(segment, aircraft) {
            self.enqueue(segment, aircraft);
            trace!("{} joined {} at {}", aircraft, segment, current);
        }

        if self.head(segment) != Some(aircraft) {
            trace!("{} holds at {} behind {:?}", aircraft, current, self.head(segment));
            return Admission::Hold;
        }

        if role == direction.release_role() {
            self.release(segment, aircraft);
            trace!("{} released {} at {}", aircraft, segment, current);
        }

        match candidate {
            Some(step) => Admission::Proceed(step),
            None => Admission::Released,
        }
    }

    /// Queues the aircraft on every segment at once, if all of them are idle.
    /// Returns false and changes nothing otherwise.
    pub fn try_reserve(&mut self, aircraft: AircraftId, segments: &[SegmentId]) -> bool {
        if !segments.iter().all(|segment| self.is_idle(*segment)) {
            return false;
        }
        for segment in segments {
            self.enqueue(*segment, aircraft);
        }
        true
    }

    /// Panics if an aircraft appears twice in one queue
    pub fn assert_consistent(&self) {
        for (index, queue) in self.queues.iter().enumerate() {
            for (position, aircraft) in queue.iter().enumerate() {
                assert!(
                    !queue.iter().skip(position + 1).any(|other| other == aircraft),
                    "aircraft {} appears twice on {}",
                    aircraft,
                    SegmentId(index)
                );
            }
        }
    }
}
