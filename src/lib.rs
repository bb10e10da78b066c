//! retsweep — rolling-window investment-strategy return simulator.
//!
//! Replays historical price/interest series through simulated trading accounts
//! over many overlapping windows and aggregates the return distribution.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
