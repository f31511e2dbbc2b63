//! Service vehicle marker
//!
//! A decorative vehicle shuttling along a fixed service road. It has no effect
//! on aircraft and only shows up in snapshots.

use rand::Rng;

use super::types::Point;

/// Odds that an idle service vehicle starts moving on a given tick
pub const START_ODDS: (u32, u32) = (1, 25);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Idle,
    Forward,
    Backward,
}

#[derive(Debug, Clone)]
pub struct ServiceVehicle {
    path: Vec<Point>,
    index: usize,
    motion: Motion,
}

impl ServiceVehicle {
    /// Parks at the first point of `path`
    pub fn new(path: Vec<Point>) -> Self {
        Self {
            path,
            index: 0,
            motion: Motion::Idle,
        }
    }

    pub fn position(&self) -> Option<Point> {
        self.path.get(self.index).copied()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    /// Advance the marker by one tick
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.path.len() < 2 {
            return;
        }

        if self.motion == Motion::Idle {
            if !rng.random_ratio(START_ODDS.0, START_ODDS.1) {
                return;
            }
            // Always idles at an endpoint, so head for the other one
            self.motion = if self.index == 0 {
                Motion::Forward
            } else {
                Motion::Backward
            };
        }

        match self.motion {
            Motion::Forward => self.index += 1,
            Motion::Backward => self.index -= 1,
            Motion::Idle => {}
        }

        if self.index == 0 || self.index == self.path.len() - 1 {
            self.motion = Motion::Idle;
        }
    }
}
