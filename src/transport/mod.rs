//! Transport layer for calling the remote calibration services.

mod http;
mod mock;
mod service;

pub use http::{HttpTransport, HttpTransportConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
pub use mock::{MockTransport, RecordedCall};
pub use service::{wait_for_service, ServiceClient, ServiceError, ServiceTransport};
