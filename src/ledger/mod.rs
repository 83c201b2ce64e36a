//! The authoritative vending-machine ledger actor.

pub mod service;

pub use service::*;
