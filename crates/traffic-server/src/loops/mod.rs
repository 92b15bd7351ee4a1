//! Background loops driving and publishing the simulation.

pub mod log_persist_loop;
pub mod publish_loop;
pub mod tick_loop;
