//! System orchestration, startup, and shutdown logic.

pub mod tracing;
pub mod vending_system;

pub use self::tracing::*;
pub use self::vending_system::*;
