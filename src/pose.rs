//! Pose messages exchanged with the calibration services.
//!
//! Rigid transforms travel as a position plus an orientation quaternion,
//! the same layout the services use. Callers work with
//! [`nalgebra::Isometry3`]; conversion happens at the message boundary.

use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Position of a point in free space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Orientation in quaternion form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

/// A rigid transform as sent over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point,
    pub orientation: Quaternion,
}

impl Pose {
    /// The identity transform.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Build a pose from a translation and a quaternion given as `(x, y, z, w)`.
    pub fn new(position: [f64; 3], orientation: [f64; 4]) -> Self {
        Self {
            position: Point {
                x: position[0],
                y: position[1],
                z: position[2],
            },
            orientation: Quaternion {
                x: orientation[0],
                y: orientation[1],
                z: orientation[2],
                w: orientation[3],
            },
        }
    }

    /// Convert an isometry into its wire form.
    ///
    /// Values are copied as-is: non-finite components are not rejected.
    pub fn from_isometry(isometry: &na::Isometry3<f64>) -> Self {
        let t = &isometry.translation.vector;
        let q = isometry.rotation.quaternion();
        Self::new([t.x, t.y, t.z], [q.i, q.j, q.k, q.w])
    }

    /// Convert the wire form back into an isometry.
    ///
    /// Quaternions that are already unit length are used unchanged so that a
    /// pose survives the trip through the wire bit for bit; anything else is
    /// normalized.
    pub fn to_isometry(&self) -> na::Isometry3<f64> {
        let q = na::Quaternion::new(
            self.orientation.w,
            self.orientation.x,
            self.orientation.y,
            self.orientation.z,
        );
        let rotation = if (q.norm_squared() - 1.0).abs() <= 1e-12 {
            na::UnitQuaternion::new_unchecked(q)
        } else {
            na::UnitQuaternion::new_normalize(q)
        };
        let translation =
            na::Translation3::new(self.position.x, self.position.y, self.position.z);
        na::Isometry3::from_parts(translation, rotation)
    }
}

impl From<&na::Isometry3<f64>> for Pose {
    fn from(isometry: &na::Isometry3<f64>) -> Self {
        Self::from_isometry(isometry)
    }
}

impl From<na::Isometry3<f64>> for Pose {
    fn from(isometry: na::Isometry3<f64>) -> Self {
        Self::from_isometry(&isometry)
    }
}

impl From<Pose> for na::Isometry3<f64> {
    fn from(pose: Pose) -> Self {
        pose.to_isometry()
    }
}

/// A pose tagged with the frame it is expressed in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseStamped {
    #[serde(default)]
    pub frame_id: String,
    pub pose: Pose,
}
