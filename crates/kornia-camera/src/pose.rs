use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Extrinsic pose of a camera.
///
/// The pose maps points from the **world** frame to the **camera** frame:
/// `p_cam = R * p_world + t`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    /// Rotation as a unit quaternion.
    pub qvec: DQuat,
    /// Translation vector.
    pub tvec: DVec3,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            qvec: DQuat::IDENTITY,
            tvec: DVec3::ZERO,
        }
    }
}

impl CameraPose {
    /// Create a pose from a quaternion and a translation.
    pub fn new(qvec: DQuat, tvec: DVec3) -> Self {
        Self {
            qvec: qvec.normalize(),
            tvec,
        }
    }

    /// Create a pose from a rotation matrix and a translation.
    pub fn from_rt(r: &DMat3, t: DVec3) -> Self {
        Self::new(DQuat::from_mat3(r), t)
    }

    /// Create a pose whose camera sits at `center` with world-to-camera rotation `r`.
    pub fn from_center(r: &DMat3, center: DVec3) -> Self {
        Self::from_rt(r, -(*r * center))
    }

    /// Rotation matrix from world to camera.
    pub fn r(&self) -> DMat3 {
        DMat3::from_quat(self.qvec)
    }

    /// Translation from world to camera.
    pub fn t(&self) -> DVec3 {
        self.tvec
    }

    /// Camera center in world coordinates: -R^T * t.
    pub fn center(&self) -> DVec3 {
        -(self.r().transpose() * self.tvec)
    }

    /// Depth of a world point along the optical axis.
    pub fn projdepth(&self, p3d: DVec3) -> f64 {
        (self.r() * p3d + self.tvec).z
    }
}
