//! Configuration and result types for calibration sessions.

use std::fmt;
use std::time::Duration;

use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};

/// Default interval between availability probes while waiting for services.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

/// Optional operations a client can be wired for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    GetCalibration,
    WorkspaceCalibration,
    DetectPattern,
    SetWorkspaceCalibration,
    ClearWorkspaceCalibration,
    StoreWorkspaceCalibration,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::GetCalibration,
        Capability::WorkspaceCalibration,
        Capability::DetectPattern,
        Capability::SetWorkspaceCalibration,
        Capability::ClearWorkspaceCalibration,
        Capability::StoreWorkspaceCalibration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::GetCalibration => "get_calibration",
            Capability::WorkspaceCalibration => "workspace_calibration",
            Capability::DetectPattern => "detect_pattern",
            Capability::SetWorkspaceCalibration => "set_workspace_calibration",
            Capability::ClearWorkspaceCalibration => "clear_workspace_calibration",
            Capability::StoreWorkspaceCalibration => "store_workspace_calibration",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names of the remote services the client talks to.
///
/// The three sequence services are always required. The others are only
/// wired when a name is given; calling an unwired operation fails with
/// [`CalibrationError::NotConfigured`](super::CalibrationError::NotConfigured).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceNames {
    pub initialize_calibration: String,
    pub record_calibration: String,
    pub finalize_calibration: String,
    pub get_calibration: Option<String>,
    pub workspace_calibration: Option<String>,
    pub detect_pattern: Option<String>,
    pub set_workspace_calibration: Option<String>,
    pub clear_workspace_calibration: Option<String>,
    pub store_workspace_calibration: Option<String>,
}

impl Default for ServiceNames {
    fn default() -> Self {
        Self {
            initialize_calibration: "initialize_calibration".to_string(),
            record_calibration: "record_calibration".to_string(),
            finalize_calibration: "finalize_calibration".to_string(),
            get_calibration: None,
            workspace_calibration: None,
            detect_pattern: None,
            set_workspace_calibration: None,
            clear_workspace_calibration: None,
            store_workspace_calibration: None,
        }
    }
}

impl ServiceNames {
    /// Every service wired, using the names the calibration service advertises.
    pub fn full() -> Self {
        Self::default()
            .with_get_calibration("get_workspace_calibration")
            .with_workspace_calibration("calibrate_workspace")
            .with_detect_pattern("detect_calibration_pattern")
            .with_set_workspace_calibration("set_workspace_calibration")
            .with_clear_workspace_calibration("clear_workspace_calibration")
            .with_store_workspace_calibration("store_workspace_calibration")
    }

    pub fn with_initialize_calibration(mut self, name: impl Into<String>) -> Self {
        self.initialize_calibration = name.into();
        self
    }

    pub fn with_record_calibration(mut self, name: impl Into<String>) -> Self {
        self.record_calibration = name.into();
        self
    }

    pub fn with_finalize_calibration(mut self, name: impl Into<String>) -> Self {
        self.finalize_calibration = name.into();
        self
    }

    pub fn with_get_calibration(mut self, name: impl Into<String>) -> Self {
        self.get_calibration = Some(name.into());
        self
    }

    pub fn with_workspace_calibration(mut self, name: impl Into<String>) -> Self {
        self.workspace_calibration = Some(name.into());
        self
    }

    pub fn with_detect_pattern(mut self, name: impl Into<String>) -> Self {
        self.detect_pattern = Some(name.into());
        self
    }

    pub fn with_set_workspace_calibration(mut self, name: impl Into<String>) -> Self {
        self.set_workspace_calibration = Some(name.into());
        self
    }

    pub fn with_clear_workspace_calibration(mut self, name: impl Into<String>) -> Self {
        self.clear_workspace_calibration = Some(name.into());
        self
    }

    pub fn with_store_workspace_calibration(mut self, name: impl Into<String>) -> Self {
        self.store_workspace_calibration = Some(name.into());
        self
    }

    /// Prefix every service name with `namespace` (e.g. `"camera"` turns
    /// `record_calibration` into `camera/record_calibration`).
    pub fn in_namespace(self, namespace: &str) -> Self {
        let namespace = namespace.trim_matches('/');
        if namespace.is_empty() {
            return self;
        }
        let prefix = |name: String| format!("{}/{}", namespace, name.trim_start_matches('/'));

        Self {
            initialize_calibration: prefix(self.initialize_calibration),
            record_calibration: prefix(self.record_calibration),
            finalize_calibration: prefix(self.finalize_calibration),
            get_calibration: self.get_calibration.map(prefix),
            workspace_calibration: self.workspace_calibration.map(prefix),
            detect_pattern: self.detect_pattern.map(prefix),
            set_workspace_calibration: self.set_workspace_calibration.map(prefix),
            clear_workspace_calibration: self.clear_workspace_calibration.map(prefix),
            store_workspace_calibration: self.store_workspace_calibration.map(prefix),
        }
    }

    /// Every configured service name, sequence services first.
    pub fn configured(&self) -> Vec<&str> {
        let mut names = vec![
            self.initialize_calibration.as_str(),
            self.record_calibration.as_str(),
            self.finalize_calibration.as_str(),
        ];
        names.extend(Capability::ALL.iter().filter_map(|c| self.capability(*c)));
        names
    }

    /// Name configured for an optional capability.
    pub fn capability(&self, capability: Capability) -> Option<&str> {
        match capability {
            Capability::GetCalibration => self.get_calibration.as_deref(),
            Capability::WorkspaceCalibration => self.workspace_calibration.as_deref(),
            Capability::DetectPattern => self.detect_pattern.as_deref(),
            Capability::SetWorkspaceCalibration => self.set_workspace_calibration.as_deref(),
            Capability::ClearWorkspaceCalibration => self.clear_workspace_calibration.as_deref(),
            Capability::StoreWorkspaceCalibration => self.store_workspace_calibration.as_deref(),
        }
    }
}

/// Options applied when constructing a client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Wait for every configured service to become reachable before returning.
    pub wait_for_services: bool,
    /// Upper bound for the wait. `None` waits indefinitely.
    pub wait_timeout: Option<Duration>,
    /// Interval between availability probes.
    pub poll_interval: Duration,
    /// Ask the service to store the result on the device after finalizing.
    pub store_calibration: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            wait_for_services: false,
            wait_timeout: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            store_calibration: true,
        }
    }
}

impl ClientOptions {
    pub fn with_wait_for_services(mut self, wait: bool) -> Self {
        self.wait_for_services = wait;
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_store_calibration(mut self, store: bool) -> Self {
        self.store_calibration = store;
        self
    }
}

/// Parameters for starting a calibration sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct InitializeCalibrationConfig {
    /// If true, the camera is attached to the moving frame and the pattern to
    /// the fixed frame; otherwise the other way around.
    pub camera_moving: bool,
    /// Name of the moving frame (usually the robot end effector).
    pub moving_frame: String,
    /// Name of the fixed frame (usually the robot base).
    pub fixed_frame: String,
    /// Initial guess for the camera pose, in the moving frame if
    /// `camera_moving` is set and in the fixed frame otherwise.
    pub camera_guess: Option<Isometry3<f64>>,
    /// Initial guess for the pattern pose, in the frame the camera is not
    /// attached to.
    pub pattern_guess: Option<Isometry3<f64>>,
    /// Directory where the service dumps calibration data. Empty disables.
    pub dump_dir: String,
    /// Fixed translation components of the calibrated transform.
    pub translation_fixed: Option<Vec<f64>>,
    /// Fixed rotation components of the calibrated transform.
    pub rotation_fixed: Option<Vec<f64>>,
}

impl InitializeCalibrationConfig {
    pub fn new(
        camera_moving: bool,
        moving_frame: impl Into<String>,
        fixed_frame: impl Into<String>,
    ) -> Self {
        Self {
            camera_moving,
            moving_frame: moving_frame.into(),
            fixed_frame: fixed_frame.into(),
            camera_guess: None,
            pattern_guess: None,
            dump_dir: String::new(),
            translation_fixed: None,
            rotation_fixed: None,
        }
    }

    pub fn with_camera_guess(mut self, guess: Isometry3<f64>) -> Self {
        self.camera_guess = Some(guess);
        self
    }

    pub fn with_pattern_guess(mut self, guess: Isometry3<f64>) -> Self {
        self.pattern_guess = Some(guess);
        self
    }

    pub fn with_dump_dir(mut self, dump_dir: impl Into<String>) -> Self {
        self.dump_dir = dump_dir.into();
        self
    }

    pub fn with_translation_fixed(mut self, fixed: Vec<f64>) -> Self {
        self.translation_fixed = Some(fixed);
        self
    }

    pub fn with_rotation_fixed(mut self, fixed: Vec<f64>) -> Self {
        self.rotation_fixed = Some(fixed);
        self
    }

    /// Frame the calibrated camera pose is expressed in.
    pub fn camera_frame(&self) -> &str {
        if self.camera_moving {
            &self.moving_frame
        } else {
            &self.fixed_frame
        }
    }

    /// Frame the calibrated pattern pose is expressed in.
    pub fn pattern_frame(&self) -> &str {
        if self.camera_moving {
            &self.fixed_frame
        } else {
            &self.moving_frame
        }
    }
}

/// Result of a finalized calibration sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationResult {
    /// Calibrated camera pose.
    pub camera_pose: Isometry3<f64>,
    /// Calibrated pattern pose.
    pub pattern_pose: Isometry3<f64>,
    /// Residual error of the calibration optimization.
    pub residual_error: f64,
    /// Frame of `camera_pose` as reported by the service (empty if not reported).
    pub camera_frame: String,
    /// Frame of `pattern_pose` as reported by the service (empty if not reported).
    pub pattern_frame: String,
    /// Optimizer iterations, if the service reports them.
    pub iterations: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_names_default_has_no_optional_services() {
        let names = ServiceNames::default();
        assert_eq!(names.initialize_calibration, "initialize_calibration");
        for capability in Capability::ALL {
            assert_eq!(names.capability(capability), None);
        }
    }

    #[test]
    fn test_service_names_full_wires_everything() {
        let names = ServiceNames::full();
        for capability in Capability::ALL {
            assert!(names.capability(capability).is_some(), "{} missing", capability);
        }
        assert_eq!(names.get_calibration.as_deref(), Some("get_workspace_calibration"));
        assert_eq!(names.configured().len(), 9);
        assert_eq!(ServiceNames::default().configured().len(), 3);
    }

    #[test]
    fn test_in_namespace() {
        let names = ServiceNames::default()
            .with_get_calibration("get_workspace_calibration")
            .in_namespace("/ensenso/");
        assert_eq!(names.record_calibration, "ensenso/record_calibration");
        assert_eq!(names.get_calibration.as_deref(), Some("ensenso/get_workspace_calibration"));
        assert_eq!(names.workspace_calibration, None);

        let unchanged = ServiceNames::default().in_namespace("");
        assert_eq!(unchanged, ServiceNames::default());
    }

    #[test]
    fn test_service_names_deserialize_partial() {
        let names: ServiceNames =
            serde_json::from_str(r#"{"get_calibration": "get_pose"}"#).unwrap();
        assert_eq!(names.finalize_calibration, "finalize_calibration");
        assert_eq!(names.get_calibration.as_deref(), Some("get_pose"));
    }

    #[test]
    fn test_client_options_default() {
        let options = ClientOptions::default();
        assert!(!options.wait_for_services);
        assert!(options.store_calibration);
        assert_eq!(options.wait_timeout, None);
    }

    #[test]
    fn test_result_frames_follow_camera_moving() {
        let moving = InitializeCalibrationConfig::new(true, "tool0", "base");
        assert_eq!(moving.camera_frame(), "tool0");
        assert_eq!(moving.pattern_frame(), "base");

        let fixed = InitializeCalibrationConfig::new(false, "tool0", "base");
        assert_eq!(fixed.camera_frame(), "base");
        assert_eq!(fixed.pattern_frame(), "tool0");
    }
}
