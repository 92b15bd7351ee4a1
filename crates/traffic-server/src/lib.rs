//! Shared library surface for the traffic server and its tests.

pub mod backoff;
pub mod clock;
pub mod config;
pub mod control;
pub mod loops;
pub mod persistence;
pub mod state;
