pub mod casting;
pub mod config;
pub mod error;
pub mod telemetry;
