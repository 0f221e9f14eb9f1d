//! Calibration session client.

mod config;
mod error;
pub mod messages;
mod session_client;

pub use config::{
    CalibrationResult, Capability, ClientOptions, InitializeCalibrationConfig, ServiceNames,
    DEFAULT_POLL_INTERVAL_MS,
};
pub use error::CalibrationError;
pub use session_client::CalibrationSessionClient;
