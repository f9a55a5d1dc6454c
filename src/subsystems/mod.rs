//! Subsystems: the bots, the channels that carry turns to them, and the
//! component runtime the channels share.

pub mod bots;
pub mod comms;
pub mod runtime;
