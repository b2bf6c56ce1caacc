//! Emergency-department saturation scoring service.

pub mod config;
pub mod error;
pub mod protocol;
pub mod telemetry;
