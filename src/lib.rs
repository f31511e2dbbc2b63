//! Airfield Surface Traffic Library
//!
//! A discrete-time simulation of aircraft taxiing between stands and the
//! runway over shared, mutually exclusive taxiway segments.

pub mod simulation;
