//! Client driving calibration sequences on the remote calibration service.
//!
//! A sequence is `initialize_calibration`, then `record_calibration` once per
//! robot pose, then `finalize_calibration`. The session itself lives in the
//! service; this client does not track or enforce the order. Callers must not
//! interleave sequences on one client.

use std::sync::Arc;

use nalgebra::Isometry3;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;

use super::config::{
    Capability, CalibrationResult, ClientOptions, InitializeCalibrationConfig, ServiceNames,
};
use super::error::CalibrationError;
use super::messages::{
    DetectPatternRequest, Empty, FinalizeCalibrationRequest, FinalizeCalibrationResponse,
    InitializeCalibrationRequest, PoseResponse, SendPoseRequest, SetWorkspaceCalibrationRequest,
    WorkspaceCalibrationRequest,
};
use crate::pose::Pose;
use crate::transport::{wait_for_service, ServiceClient, ServiceError, ServiceTransport};

/// Connections to the calibration services.
struct Services {
    initialize_calibration: ServiceClient<InitializeCalibrationRequest, Empty>,
    record_calibration: ServiceClient<SendPoseRequest, Empty>,
    finalize_calibration: ServiceClient<FinalizeCalibrationRequest, FinalizeCalibrationResponse>,
    get_calibration: Option<ServiceClient<Empty, PoseResponse>>,
    workspace_calibration: Option<ServiceClient<WorkspaceCalibrationRequest, PoseResponse>>,
    detect_pattern: Option<ServiceClient<DetectPatternRequest, PoseResponse>>,
    set_workspace_calibration: Option<ServiceClient<SetWorkspaceCalibrationRequest, Empty>>,
    clear_workspace_calibration: Option<ServiceClient<Empty, Empty>>,
    store_workspace_calibration: Option<ServiceClient<Empty, Empty>>,
}

impl Services {
    fn connect(transport: &Arc<dyn ServiceTransport>, names: &ServiceNames) -> Self {
        Self {
            initialize_calibration: ServiceClient::new(transport.clone(), &names.initialize_calibration),
            record_calibration: ServiceClient::new(transport.clone(), &names.record_calibration),
            finalize_calibration: ServiceClient::new(transport.clone(), &names.finalize_calibration),
            get_calibration: optional(transport, &names.get_calibration),
            workspace_calibration: optional(transport, &names.workspace_calibration),
            detect_pattern: optional(transport, &names.detect_pattern),
            set_workspace_calibration: optional(transport, &names.set_workspace_calibration),
            clear_workspace_calibration: optional(transport, &names.clear_workspace_calibration),
            store_workspace_calibration: optional(transport, &names.store_workspace_calibration),
        }
    }
}

fn optional<Req, Resp>(
    transport: &Arc<dyn ServiceTransport>,
    name: &Option<String>,
) -> Option<ServiceClient<Req, Resp>>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    name.as_ref()
        .map(|name| ServiceClient::new(transport.clone(), name))
}

/// Look up an optional service, failing fast when it is not wired.
fn wired<T>(service: &Option<T>, capability: Capability) -> Result<&T, CalibrationError> {
    service
        .as_ref()
        .ok_or(CalibrationError::NotConfigured(capability))
}

/// Client for the calibration services.
///
/// # Example
/// ```rust,no_run
/// use std::sync::Arc;
/// use calibration_client::{
///     CalibrationSessionClient, ClientOptions, HttpTransport, HttpTransportConfig,
///     InitializeCalibrationConfig, ServiceNames,
/// };
/// use nalgebra::Isometry3;
///
/// # async fn run() -> anyhow::Result<()> {
/// let transport = Arc::new(HttpTransport::new(HttpTransportConfig::default())?);
/// let client = CalibrationSessionClient::connect(
///     transport,
///     ServiceNames::default(),
///     ClientOptions::default().with_store_calibration(false),
/// )
/// .await?;
///
/// client
///     .initialize_calibration(&InitializeCalibrationConfig::new(true, "tool0", "base"))
///     .await?;
/// for _ in 0..3 {
///     client.record_calibration(&Isometry3::identity()).await?;
/// }
/// let result = client.finalize_calibration().await?;
/// println!("residual error: {}", result.residual_error);
/// # Ok(())
/// # }
/// ```
pub struct CalibrationSessionClient {
    transport: Arc<dyn ServiceTransport>,
    services: Services,
    names: ServiceNames,
    store_calibration: bool,
}

impl CalibrationSessionClient {
    /// Create a client without checking that the services exist.
    pub fn new(transport: Arc<dyn ServiceTransport>, names: ServiceNames, store_calibration: bool) -> Self {
        let services = Services::connect(&transport, &names);
        Self {
            transport,
            services,
            names,
            store_calibration,
        }
    }

    /// Create a client, optionally waiting for all configured services to
    /// become reachable first.
    pub async fn connect(
        transport: Arc<dyn ServiceTransport>,
        names: ServiceNames,
        options: ClientOptions,
    ) -> Result<Self, CalibrationError> {
        let client = Self::new(transport, names, options.store_calibration);
        if options.wait_for_services {
            client.wait_for_services(&options).await?;
        }
        Ok(client)
    }

    /// Wait until every configured service is reachable.
    ///
    /// `options.wait_timeout` bounds the wait for all services together.
    pub async fn wait_for_services(&self, options: &ClientOptions) -> Result<(), CalibrationError> {
        let start = Instant::now();
        let deadline = options.wait_timeout.map(|timeout| start + timeout);

        for service in self.names.configured() {
            if !wait_for_service(self.transport.as_ref(), service, deadline, options.poll_interval).await {
                return Err(CalibrationError::Unavailable {
                    service: service.to_string(),
                    waited: start.elapsed(),
                });
            }
        }

        tracing::info!("calibration services available");
        Ok(())
    }

    /// Names of the services this client calls.
    pub fn service_names(&self) -> &ServiceNames {
        &self.names
    }

    /// Whether the service backing `capability` was configured.
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.names.capability(capability).is_some()
    }

    /// Value sent as `store_calibration` on every finalize.
    pub fn store_calibration(&self) -> bool {
        self.store_calibration
    }

    /// Initialize a calibration sequence, clearing any state from previous
    /// sequences in the service.
    pub async fn initialize_calibration(
        &self,
        config: &InitializeCalibrationConfig,
    ) -> Result<(), CalibrationError> {
        let request = InitializeCalibrationRequest::from(config);
        tracing::info!(
            camera_moving = config.camera_moving,
            moving_frame = %config.moving_frame,
            fixed_frame = %config.fixed_frame,
            "initializing calibration sequence"
        );

        self.services
            .initialize_calibration
            .call(&request)
            .await
            .map_err(log_failure)?;
        Ok(())
    }

    /// Record one calibration sample taken at `robot_pose`.
    ///
    /// The pose is forwarded as given.
    pub async fn record_calibration(&self, robot_pose: &Isometry3<f64>) -> Result<(), CalibrationError> {
        let request = SendPoseRequest {
            pose: Pose::from_isometry(robot_pose),
        };
        self.services
            .record_calibration
            .call(&request)
            .await
            .map_err(log_failure)?;
        tracing::debug!("recorded calibration sample");
        Ok(())
    }

    /// Finalize the calibration sequence and return the result.
    pub async fn finalize_calibration(&self) -> Result<CalibrationResult, CalibrationError> {
        let request = FinalizeCalibrationRequest {
            store_calibration: self.store_calibration,
        };
        let response = self
            .services
            .finalize_calibration
            .call(&request)
            .await
            .map_err(log_failure)?;

        tracing::info!(
            residual_error = response.residual_error,
            "calibration sequence finalized"
        );

        Ok(CalibrationResult {
            camera_pose: response.camera_pose.pose().to_isometry(),
            pattern_pose: response.pattern_pose.pose().to_isometry(),
            residual_error: response.residual_error,
            camera_frame: response.camera_pose.frame_id().to_string(),
            pattern_frame: response.pattern_pose.frame_id().to_string(),
            iterations: response.iterations,
        })
    }

    /// Retrieve the calibration currently stored on the camera.
    pub async fn get_calibration(&self) -> Result<Isometry3<f64>, CalibrationError> {
        let service = wired(&self.services.get_calibration, Capability::GetCalibration)?;
        let response = service.call(&Empty {}).await.map_err(log_failure)?;
        Ok(response.pose.to_isometry())
    }

    /// Perform a workspace calibration.
    ///
    /// `pattern_pose` is the known pose of the pattern in `frame_id`; the
    /// service averages its measurement over `samples` detections.
    pub async fn workspace_calibration(
        &self,
        pattern_pose: &Isometry3<f64>,
        frame_id: &str,
        samples: u32,
    ) -> Result<Isometry3<f64>, CalibrationError> {
        let service = wired(&self.services.workspace_calibration, Capability::WorkspaceCalibration)?;
        if samples == 0 {
            return Err(CalibrationError::InvalidSamples);
        }

        tracing::info!(frame_id, samples, "performing workspace calibration");
        let request = WorkspaceCalibrationRequest {
            pattern_pose: Pose::from_isometry(pattern_pose),
            frame_id: frame_id.to_string(),
            samples,
        };
        let response = service.call(&request).await.map_err(log_failure)?;
        Ok(response.pose.to_isometry())
    }

    /// Detect the calibration pattern, averaging over `samples` detections.
    pub async fn detect_pattern(&self, samples: u32) -> Result<Isometry3<f64>, CalibrationError> {
        let service = wired(&self.services.detect_pattern, Capability::DetectPattern)?;
        if samples == 0 {
            return Err(CalibrationError::InvalidSamples);
        }
        let response = service
            .call(&DetectPatternRequest { samples })
            .await
            .map_err(log_failure)?;
        Ok(response.pose.to_isometry())
    }

    /// Set the workspace calibration of the camera to `pose` in `frame_id`.
    pub async fn set_workspace_calibration(
        &self,
        pose: &Isometry3<f64>,
        frame_id: &str,
    ) -> Result<(), CalibrationError> {
        let service = wired(
            &self.services.set_workspace_calibration,
            Capability::SetWorkspaceCalibration,
        )?;
        let request = SetWorkspaceCalibrationRequest {
            pose: Pose::from_isometry(pose),
            frame_id: frame_id.to_string(),
        };
        service.call(&request).await.map_err(log_failure)?;
        Ok(())
    }

    /// Clear the workspace calibration of the camera.
    pub async fn clear_workspace_calibration(&self) -> Result<(), CalibrationError> {
        let service = wired(
            &self.services.clear_workspace_calibration,
            Capability::ClearWorkspaceCalibration,
        )?;
        service.call(&Empty {}).await.map_err(log_failure)?;
        Ok(())
    }

    /// Store the current workspace calibration on the camera.
    pub async fn store_workspace_calibration(&self) -> Result<(), CalibrationError> {
        let service = wired(
            &self.services.store_workspace_calibration,
            Capability::StoreWorkspaceCalibration,
        )?;
        service.call(&Empty {}).await.map_err(log_failure)?;
        Ok(())
    }
}

fn log_failure(error: ServiceError) -> CalibrationError {
    tracing::warn!(service = %error.service, error = %error.message, "calibration service call failed");
    CalibrationError::Service(error)
}
