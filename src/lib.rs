// Copyright 2025 ModerRAS
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Calibration Client
//!
//! Client for remote camera calibration services.
//!
//! A calibration sequence is driven through three calls: initialize the
//! sequence with the frames involved, record one sample per robot pose, then
//! finalize to get the solved camera and pattern poses. Cameras that support
//! it also expose the stored calibration and workspace calibration; these are
//! optional and must be configured when the client is built.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use calibration_client::{
//!     CalibrationSessionClient, ClientOptions, HttpTransport, HttpTransportConfig,
//!     InitializeCalibrationConfig, Pose, ServiceNames,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let transport = Arc::new(HttpTransport::new(
//!         HttpTransportConfig::default().with_base_url("http://localhost:8090"),
//!     )?);
//!     let options = ClientOptions::default().with_wait_for_services(true);
//!     let client = CalibrationSessionClient::connect(transport, ServiceNames::full(), options).await?;
//!
//!     client
//!         .initialize_calibration(&InitializeCalibrationConfig::new(true, "tool0", "base_link"))
//!         .await?;
//!     for pose in [Pose::identity(), Pose::new([0.1, 0.0, 0.4], [0.0, 0.0, 0.0, 1.0])] {
//!         client.record_calibration(&pose.to_isometry()).await?;
//!     }
//!     let result = client.finalize_calibration().await?;
//!     println!("residual error: {}", result.residual_error);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod pose;
pub mod session;
pub mod settings;
pub mod timestamp;
pub mod transport;

pub use client::{
    CalibrationError, CalibrationResult, CalibrationSessionClient, Capability, ClientOptions,
    InitializeCalibrationConfig, ServiceNames,
};
pub use pose::{Pose, PoseStamped};
pub use session::{run_session, SessionError, SessionPlan};
pub use settings::ClientSettings;
pub use transport::{HttpTransport, HttpTransportConfig, MockTransport, ServiceError, ServiceTransport};
