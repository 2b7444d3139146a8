use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::{Camera, CameraError, CameraModelId, CameraPose, CameraView};

/// Compact pinhole camera encoding used by optimizers.
///
/// Holds the intrinsics `[fx, fy, cx, cy]`, the rotation as a quaternion `[w, x, y, z]`, the
/// translation and the image resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinimalPinholeCamera {
    /// Intrinsics `[fx, fy, cx, cy]`.
    pub kvec: [f64; 4],
    /// Rotation quaternion `[w, x, y, z]`.
    pub qvec: [f64; 4],
    /// Translation.
    pub tvec: [f64; 3],
    /// Image height in pixels.
    pub height: u32,
    /// Image width in pixels.
    pub width: u32,
}

impl TryFrom<&CameraView> for MinimalPinholeCamera {
    type Error = CameraError;

    fn try_from(view: &CameraView) -> Result<Self, Self::Error> {
        if view.cam.model.has_distortion() {
            return Err(CameraError::UnsupportedModel(view.cam.model.name()));
        }
        let (fx, fy) = view.cam.focal_lengths();
        let c = view.cam.principal_point();
        let q = view.pose.qvec;
        Ok(Self {
            kvec: [fx, fy, c.x, c.y],
            qvec: [q.w, q.x, q.y, q.z],
            tvec: view.pose.tvec.to_array(),
            height: view.cam.height,
            width: view.cam.width,
        })
    }
}

impl MinimalPinholeCamera {
    /// Expand into a pinhole [`CameraView`].
    pub fn to_camera_view(&self) -> Result<CameraView, CameraError> {
        let cam = Camera::new(
            CameraModelId::Pinhole,
            self.kvec.to_vec(),
            (self.width, self.height),
        )?;
        let [w, x, y, z] = self.qvec;
        let pose = CameraPose::new(DQuat::from_xyzw(x, y, z, w), DVec3::from_array(self.tvec));
        Ok(CameraView::new(cam, pose))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::DMat3;

    #[test]
    fn test_minimal_roundtrip_preserves_projection() -> Result<(), CameraError> {
        let cam = Camera::new(
            CameraModelId::SimplePinhole,
            vec![600.0, 320.0, 240.0],
            (640, 480),
        )?;
        let pose = CameraPose::from_center(&DMat3::from_rotation_x(0.1), DVec3::new(0.0, 1.0, -3.0));
        let view = CameraView::new(cam, pose);

        let minimal = MinimalPinholeCamera::try_from(&view)?;
        assert_eq!(minimal.kvec, [600.0, 600.0, 320.0, 240.0]);

        let back = minimal.to_camera_view()?;
        assert_eq!(back.cam.model, CameraModelId::Pinhole);
        let p = DVec3::new(0.2, -0.4, 1.5);
        let a = view.projection(p);
        let b = back.projection(p);
        assert_relative_eq!(a.x, b.x, epsilon = 1e-9);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_distorted_model_is_rejected() -> Result<(), CameraError> {
        let cam = Camera::new(
            CameraModelId::SimpleRadial,
            vec![600.0, 320.0, 240.0, 0.1],
            (640, 480),
        )?;
        let view = CameraView::new(cam, CameraPose::default());
        assert!(matches!(
            MinimalPinholeCamera::try_from(&view),
            Err(CameraError::UnsupportedModel("SIMPLE_RADIAL"))
        ));
        Ok(())
    }
}
