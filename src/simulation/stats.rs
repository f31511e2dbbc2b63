//! Simulation statistics
//!
//! Per-tick reports and running totals, logged by the driver at the end of a run.

use log::info;

/// What happened during a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub moved: usize,
    pub held: usize,
    pub retired: usize,
    pub spawned: usize,
    /// Held arrivals granted their reservation this tick (zero or one)
    pub admitted: usize,
    /// Live aircraft after the tick
    pub population: usize,
}

impl TickReport {
    /// Aircraft were live but nothing changed
    pub fn is_stalled(&self) -> bool {
        self.population > 0
            && self.moved == 0
            && self.retired == 0
            && self.spawned == 0
            && self.admitted == 0
    }
}

/// Running totals over a simulation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimStats {
    pub ticks: u64,
    pub spawned_outbound: u64,
    pub spawned_inbound: u64,
    pub retired_outbound: u64,
    pub retired_inbound: u64,
    pub reservations_admitted: u64,
    pub stalled_ticks: u64,
    /// Longest run of consecutive stalled ticks
    pub longest_stall: u64,
    current_stall: u64,
}

impl SimStats {
    pub fn total_spawned(&self) -> u64 {
        self.spawned_outbound + self.spawned_inbound
    }

    pub fn total_retired(&self) -> u64 {
        self.retired_outbound + self.retired_inbound
    }

    /// Folds a tick report into the totals
    pub fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.reservations_admitted += report.admitted as u64;
        if report.is_stalled() {
            self.stalled_ticks += 1;
            self.current_stall += 1;
            self.longest_stall = self.longest_stall.max(self.current_stall);
        } else {
            self.current_stall = 0;
        }
    }

    /// Consecutive stalled ticks up to now
    pub fn current_stall(&self) -> u64 {
        self.current_stall
    }

    pub fn log_summary(&self, live: usize) {
        info!("=== SIMULATION COMPLETE ===");
        info!("Ticks: {}", self.ticks);
        info!(
            "Total aircraft spawned: {} ({} outbound, {} inbound)",
            self.total_spawned(),
            self.spawned_outbound,
            self.spawned_inbound
        );
        info!(
            "Total aircraft retired: {} ({} outbound, {} inbound)",
            self.total_retired(),
            self.retired_outbound,
            self.retired_inbound
        );
        info!("Live aircraft: {}", live);
        info!("Reservations admitted: {}", self.reservations_admitted);
        info!(
            "Stalled ticks: {} (longest run {})",
            self.stalled_ticks, self.longest_stall
        );
    }
}
