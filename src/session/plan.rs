//! Calibration plans: a complete sequence described up front.
//!
//! A plan names the frames, optional guesses and the robot poses at which a
//! sample is recorded. [`run_session`] turns it into the initialize, record
//! and finalize calls, stopping at the first failure.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::{CalibrationError, CalibrationResult, CalibrationSessionClient, InitializeCalibrationConfig};
use crate::pose::Pose;
use crate::timestamp;

/// Plan loading errors.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Failed to read plan file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse plan: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors from running a plan, tagged with the step that failed.
///
/// After any of these the remote session is in an unknown state; run the
/// plan again from the start.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Plan contains no robot poses")]
    NoRobotPoses,
    #[error("Initialization failed: {0}")]
    Initialize(#[source] CalibrationError),
    #[error("Recording sample {index} failed: {source}")]
    Record {
        index: usize,
        #[source]
        source: CalibrationError,
    },
    #[error("Finalization failed: {0}")]
    Finalize(#[source] CalibrationError),
}

/// Description of a complete calibration sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPlan {
    /// True if the camera is mounted on the moving frame.
    pub camera_moving: bool,
    pub moving_frame: String,
    pub fixed_frame: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_guess: Option<Pose>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_guess: Option<Pose>,
    /// Directory for calibration dumps. Empty disables dumping.
    #[serde(default)]
    pub dump_dir: String,
    /// Dump into a fresh timestamped subdirectory of `dump_dir` on every run.
    #[serde(default)]
    pub timestamped_dump_dir: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_fixed: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_fixed: Option<Vec<f64>>,
    /// Robot poses at which the pattern is recorded, in order.
    pub robot_poses: Vec<Pose>,
}

impl SessionPlan {
    pub fn new(camera_moving: bool, moving_frame: impl Into<String>, fixed_frame: impl Into<String>) -> Self {
        Self {
            camera_moving,
            moving_frame: moving_frame.into(),
            fixed_frame: fixed_frame.into(),
            camera_guess: None,
            pattern_guess: None,
            dump_dir: String::new(),
            timestamped_dump_dir: false,
            translation_fixed: None,
            rotation_fixed: None,
            robot_poses: Vec::new(),
        }
    }

    pub fn with_robot_poses(mut self, poses: Vec<Pose>) -> Self {
        self.robot_poses = poses;
        self
    }

    pub fn with_dump_dir(mut self, dump_dir: impl Into<String>, timestamped: bool) -> Self {
        self.dump_dir = dump_dir.into();
        self.timestamped_dump_dir = timestamped;
        self
    }

    /// Load a plan from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Build the initialization config for one run of this plan.
    ///
    /// `run_stamp` names the dump subdirectory when `timestamped_dump_dir` is set.
    pub fn initialize_config(&self, run_stamp: &str) -> InitializeCalibrationConfig {
        let dump_dir = if self.dump_dir.is_empty() || !self.timestamped_dump_dir {
            self.dump_dir.clone()
        } else {
            PathBuf::from(&self.dump_dir)
                .join(run_stamp)
                .to_string_lossy()
                .into_owned()
        };

        InitializeCalibrationConfig {
            camera_moving: self.camera_moving,
            moving_frame: self.moving_frame.clone(),
            fixed_frame: self.fixed_frame.clone(),
            camera_guess: self.camera_guess.map(|pose| pose.to_isometry()),
            pattern_guess: self.pattern_guess.map(|pose| pose.to_isometry()),
            dump_dir,
            translation_fixed: self.translation_fixed.clone(),
            rotation_fixed: self.rotation_fixed.clone(),
        }
    }
}

/// Run `plan` on `client`: initialize, record every robot pose, finalize.
pub async fn run_session(
    client: &CalibrationSessionClient,
    plan: &SessionPlan,
) -> Result<CalibrationResult, SessionError> {
    if plan.robot_poses.is_empty() {
        return Err(SessionError::NoRobotPoses);
    }

    let config = plan.initialize_config(&timestamp::time_string());
    client
        .initialize_calibration(&config)
        .await
        .map_err(SessionError::Initialize)?;

    let total = plan.robot_poses.len();
    for (index, pose) in plan.robot_poses.iter().enumerate() {
        client
            .record_calibration(&pose.to_isometry())
            .await
            .map_err(|source| SessionError::Record { index, source })?;
        tracing::info!("Recorded calibration sample {}/{}", index + 1, total);
    }

    client
        .finalize_calibration()
        .await
        .map_err(SessionError::Finalize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ServiceNames;
    use crate::transport::MockTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn plan_with_poses(n: usize) -> SessionPlan {
        let poses = (0..n)
            .map(|i| Pose::new([i as f64 * 0.1, 0.0, 0.5], [0.0, 0.0, 0.0, 1.0]))
            .collect();
        SessionPlan::new(true, "tool0", "base").with_robot_poses(poses)
    }

    fn finalize_reply() -> serde_json::Value {
        let pose = json!({"position": {"x": 0.0, "y": 0.0, "z": 0.0}, "orientation": {"x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0}});
        json!({"camera_pose": pose, "pattern_pose": pose, "residual_error": 0.1, "iterations": 12})
    }

    #[test]
    fn test_plan_from_json() {
        let plan: SessionPlan = serde_json::from_value(json!({
            "camera_moving": false,
            "moving_frame": "tool0",
            "fixed_frame": "world",
            "dump_dir": "/var/calibration",
            "robot_poses": [
                {"position": {"x": 0.1, "y": 0.2, "z": 0.3}, "orientation": {"x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0}}
            ]
        }))
        .unwrap();

        assert!(!plan.camera_moving);
        assert_eq!(plan.robot_poses.len(), 1);
        assert!(!plan.timestamped_dump_dir);
        assert_eq!(plan.camera_guess, None);
    }

    #[test]
    fn test_plan_from_missing_file() {
        let err = SessionPlan::from_file("/nonexistent/plan.json").unwrap_err();
        assert!(matches!(err, PlanError::Io(_)));
    }

    #[test]
    fn test_initialize_config_dump_dir() {
        let plain = plan_with_poses(1).with_dump_dir("/data/dumps", false);
        assert_eq!(plain.initialize_config("stamp").dump_dir, "/data/dumps");

        let stamped = plan_with_poses(1).with_dump_dir("/data/dumps", true);
        assert_eq!(stamped.initialize_config("stamp").dump_dir, "/data/dumps/stamp");

        let disabled = plan_with_poses(1).with_dump_dir("", true);
        assert_eq!(disabled.initialize_config("stamp").dump_dir, "");
    }

    #[tokio::test]
    async fn test_run_session_order() {
        let mock = Arc::new(MockTransport::new());
        mock.set_reply("finalize_calibration", finalize_reply());
        let client = CalibrationSessionClient::new(mock.clone(), ServiceNames::default(), false);

        let plan = plan_with_poses(4);
        let result = run_session(&client, &plan).await.unwrap();
        assert_eq!(result.iterations, Some(12));
        assert_eq!(result.residual_error, 0.1);

        let services: Vec<String> = mock.calls().into_iter().map(|c| c.service).collect();
        assert_eq!(services.len(), 6);
        assert_eq!(services[0], "initialize_calibration");
        assert!(services[1..5].iter().all(|s| s == "record_calibration"));
        assert_eq!(services[5], "finalize_calibration");

        let records = mock.requests_to("record_calibration");
        for (request, pose) in records.iter().zip(&plan.robot_poses) {
            assert_eq!(request["pose"], serde_json::to_value(pose).unwrap());
        }
    }

    #[tokio::test]
    async fn test_run_session_stops_at_first_failure() {
        let mock = Arc::new(MockTransport::new());
        mock.set_failure("record_calibration", "Failed to find calibration pattern.");
        let client = CalibrationSessionClient::new(mock.clone(), ServiceNames::default(), true);

        let err = run_session(&client, &plan_with_poses(3)).await.unwrap_err();
        match err {
            SessionError::Record { index, source } => {
                assert_eq!(index, 0);
                assert_eq!(source.service_message(), Some("Failed to find calibration pattern."));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(mock.requests_to("finalize_calibration").is_empty());
    }

    #[tokio::test]
    async fn test_run_session_rejects_empty_plan() {
        let mock = Arc::new(MockTransport::new());
        let client = CalibrationSessionClient::new(mock.clone(), ServiceNames::default(), true);

        let err = run_session(&client, &plan_with_poses(0)).await.unwrap_err();
        assert!(matches!(err, SessionError::NoRobotPoses));
        assert!(mock.calls().is_empty());
    }
}
