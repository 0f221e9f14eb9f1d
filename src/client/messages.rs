//! Request and response messages of the calibration services.
//!
//! Optional request fields are left out of the serialized message when they
//! are not set, so the service can tell "no guess" apart from a guess of
//! identity.

use serde::{Deserialize, Serialize};

use super::config::InitializeCalibrationConfig;
use crate::pose::{Pose, PoseStamped};

/// Message without fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeCalibrationRequest {
    pub camera_moving: bool,
    pub fixed_frame: String,
    pub moving_frame: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_guess: Option<Pose>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_guess: Option<Pose>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_fixed: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_fixed: Option<Vec<f64>>,
}

impl From<&InitializeCalibrationConfig> for InitializeCalibrationRequest {
    fn from(config: &InitializeCalibrationConfig) -> Self {
        Self {
            camera_moving: config.camera_moving,
            fixed_frame: config.fixed_frame.clone(),
            moving_frame: config.moving_frame.clone(),
            dump_dir: Some(config.dump_dir.clone()).filter(|dir| !dir.is_empty()),
            camera_guess: config.camera_guess.as_ref().map(Pose::from_isometry),
            pattern_guess: config.pattern_guess.as_ref().map(Pose::from_isometry),
            translation_fixed: config.translation_fixed.clone(),
            rotation_fixed: config.rotation_fixed.clone(),
        }
    }
}

/// Request carrying a single pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendPoseRequest {
    pub pose: Pose,
}

/// Response carrying a single pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseResponse {
    pub pose: Pose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeCalibrationRequest {
    pub store_calibration: bool,
}

/// A result pose, with or without the frame it is expressed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultPose {
    Stamped(PoseStamped),
    Bare(Pose),
}

impl ResultPose {
    pub fn pose(&self) -> &Pose {
        match self {
            ResultPose::Stamped(stamped) => &stamped.pose,
            ResultPose::Bare(pose) => pose,
        }
    }

    pub fn frame_id(&self) -> &str {
        match self {
            ResultPose::Stamped(stamped) => &stamped.frame_id,
            ResultPose::Bare(_) => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeCalibrationResponse {
    pub camera_pose: ResultPose,
    pub pattern_pose: ResultPose,
    #[serde(alias = "reprojection_error")]
    pub residual_error: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceCalibrationRequest {
    /// Pose of the pattern in the frame to calibrate to.
    pub pattern_pose: Pose,
    pub frame_id: String,
    pub samples: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectPatternRequest {
    pub samples: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetWorkspaceCalibrationRequest {
    pub pose: Pose,
    pub frame_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Isometry3, Vector3};
    use serde_json::json;

    #[test]
    fn test_initialize_request_omits_absent_fields() {
        let config = InitializeCalibrationConfig::new(true, "tool0", "base");
        let value = serde_json::to_value(InitializeCalibrationRequest::from(&config)).unwrap();

        assert_eq!(
            value,
            json!({
                "camera_moving": true,
                "fixed_frame": "base",
                "moving_frame": "tool0",
            })
        );
    }

    #[test]
    fn test_initialize_request_includes_present_fields() {
        let config = InitializeCalibrationConfig::new(false, "tool0", "base")
            .with_camera_guess(Isometry3::identity())
            .with_pattern_guess(Isometry3::translation(0.0, 0.0, 0.5))
            .with_dump_dir("/tmp/calibration")
            .with_translation_fixed(vec![0.0, 0.0, 1.0])
            .with_rotation_fixed(vec![1.0, 0.0, 0.0]);
        let value = serde_json::to_value(InitializeCalibrationRequest::from(&config)).unwrap();

        assert_eq!(value["dump_dir"], "/tmp/calibration");
        assert_eq!(value["camera_guess"]["orientation"]["w"], 1.0);
        assert_eq!(value["camera_guess"]["position"]["z"], 0.0);
        assert_eq!(value["pattern_guess"]["position"]["z"], 0.5);
        assert_eq!(value["translation_fixed"], json!([0.0, 0.0, 1.0]));
        assert_eq!(value["rotation_fixed"], json!([1.0, 0.0, 0.0]));
    }

    #[test]
    fn test_identity_guess_is_distinct_from_no_guess() {
        let without = InitializeCalibrationRequest::from(&InitializeCalibrationConfig::new(true, "a", "b"));
        let with = InitializeCalibrationRequest::from(
            &InitializeCalibrationConfig::new(true, "a", "b").with_camera_guess(Isometry3::identity()),
        );
        assert_eq!(without.camera_guess, None);
        assert_eq!(with.camera_guess, Some(Pose::identity()));
    }

    #[test]
    fn test_empty_fixed_vectors_are_still_sent() {
        let config = InitializeCalibrationConfig::new(true, "a", "b").with_translation_fixed(Vec::new());
        let value = serde_json::to_value(InitializeCalibrationRequest::from(&config)).unwrap();
        assert_eq!(value["translation_fixed"], json!([]));
    }

    #[test]
    fn test_finalize_response_stamped() {
        let response: FinalizeCalibrationResponse = serde_json::from_value(json!({
            "camera_pose": {
                "frame_id": "tool0",
                "pose": {"position": {"x": 0.0, "y": 0.0, "z": 0.1}, "orientation": {"x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0}}
            },
            "pattern_pose": {
                "frame_id": "base",
                "pose": {"position": {"x": 1.0, "y": 0.0, "z": 0.0}, "orientation": {"x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0}}
            },
            "reprojection_error": 0.25,
            "iterations": 17
        }))
        .unwrap();

        assert_eq!(response.camera_pose.frame_id(), "tool0");
        assert_eq!(response.camera_pose.pose().position.z, 0.1);
        assert_eq!(response.pattern_pose.frame_id(), "base");
        assert_eq!(response.residual_error, 0.25);
        assert_eq!(response.iterations, Some(17));
    }

    #[test]
    fn test_finalize_response_bare() {
        let pose = Pose::from_isometry(&Isometry3::new(Vector3::new(0.0, 1.0, 2.0), Vector3::zeros()));
        let response: FinalizeCalibrationResponse = serde_json::from_value(json!({
            "camera_pose": pose,
            "pattern_pose": pose,
            "residual_error": 1.5,
        }))
        .unwrap();

        assert_eq!(response.camera_pose, ResultPose::Bare(pose));
        assert_eq!(response.camera_pose.frame_id(), "");
        assert_eq!(response.iterations, None);
    }

    #[test]
    fn test_workspace_request_layout() {
        let request = WorkspaceCalibrationRequest {
            pattern_pose: Pose::identity(),
            frame_id: "base".to_string(),
            samples: 10,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["frame_id"], "base");
        assert_eq!(value["samples"], 10);
        assert_eq!(value["pattern_pose"]["orientation"]["w"], 1.0);
    }
}
