//! Periodic tick driver
//!
//! Runs the scheduler one tick at a time and hands every post-tick snapshot to
//! an observer. A tick, including the observer callback, always completes
//! before the next one starts.

use log::info;
use std::thread;
use std::time::Duration;

use super::stats::TickReport;
use super::world::{SimAirfield, Snapshot};

/// Run configuration, adjustable between ticks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Desired number of live aircraft
    pub target_population: usize,
    /// Wall-clock pause between ticks
    pub tick_period: Duration,
    /// Seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            target_population: 2,
            tick_period: Duration::from_millis(100),
            seed: None,
        }
    }
}

/// Callbacks invoked by [`TickDriver::run`] after every tick.
///
/// Observers only get shared references; they must copy out whatever they
/// want to keep.
pub trait SnapshotObserver {
    fn on_tick(&mut self, _report: &TickReport, _snapshot: &Snapshot) {}

    /// Called once after the final tick
    fn on_finish(&mut self, _airfield: &SimAirfield) {}
}

/// An observer that ignores everything
pub struct NoopObserver;

impl SnapshotObserver for NoopObserver {}

pub struct TickDriver {
    tick_period: Duration,
}

impl TickDriver {
    pub fn new(tick_period: Duration) -> Self {
        Self { tick_period }
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Takes effect from the next pause
    pub fn set_tick_period(&mut self, tick_period: Duration) {
        self.tick_period = tick_period;
    }

    /// Runs `ticks` ticks, notifying `observer` after each
    pub fn run<O: SnapshotObserver + ?Sized>(
        &mut self,
        airfield: &mut SimAirfield,
        ticks: u64,
        observer: &mut O,
    ) {
        info!(
            "Running {} ticks, target population {}, period {:?}",
            ticks,
            airfield.target_population(),
            self.tick_period
        );

        for remaining in (0..ticks).rev() {
            let report = airfield.step();
            observer.on_tick(&report, &airfield.snapshot());

            if remaining > 0 && !self.tick_period.is_zero() {
                thread::sleep(self.tick_period);
            }
        }

        observer.on_finish(airfield);
        airfield.stats().log_summary(airfield.population());
    }
}
