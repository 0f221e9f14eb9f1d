//! Error type of the calibration session client.

use std::time::Duration;

use thiserror::Error;

use super::config::Capability;
use crate::transport::ServiceError;

/// Calibration client errors.
///
/// Any error means the step did not complete and the remote session state is
/// unknown; restart from initialization to recover.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// The remote call failed, either in transport or in the service.
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// The operation's service was not configured for this client.
    #[error("{0} service is not configured")]
    NotConfigured(Capability),
    /// A sample count of zero was requested.
    #[error("number of samples must be at least 1")]
    InvalidSamples,
    /// A service did not become available in time.
    #[error("service '{service}' not available after {waited:?}")]
    Unavailable { service: String, waited: Duration },
}

impl CalibrationError {
    /// Failure description of a remote call, as produced by the transport or service.
    pub fn service_message(&self) -> Option<&str> {
        match self {
            CalibrationError::Service(e) => Some(e.message()),
            _ => None,
        }
    }
}
