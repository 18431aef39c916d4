pub mod config;
pub mod error;
pub mod placement;
pub mod roster;
pub mod telemetry;
