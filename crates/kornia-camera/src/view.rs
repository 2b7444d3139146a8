use glam::{DMat3, DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::{Camera, CameraPose};

/// A calibrated view: intrinsic camera plus extrinsic pose.
///
/// Views are immutable inputs to the reconstruction, all geometry functions take them by
/// reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraView {
    /// Intrinsic calibration.
    pub cam: Camera,
    /// World-to-camera pose.
    pub pose: CameraPose,
}

impl CameraView {
    /// Create a view from a camera and a pose.
    pub fn new(cam: Camera, pose: CameraPose) -> Self {
        Self { cam, pose }
    }

    /// Calibration matrix K.
    pub fn k(&self) -> DMat3 {
        self.cam.k()
    }

    /// Inverse calibration matrix.
    pub fn k_inv(&self) -> DMat3 {
        self.cam.k_inv()
    }

    /// World-to-camera rotation.
    pub fn r(&self) -> DMat3 {
        self.pose.r()
    }

    /// World-to-camera translation.
    pub fn t(&self) -> DVec3 {
        self.pose.t()
    }

    /// Camera center in world coordinates.
    pub fn center(&self) -> DVec3 {
        self.pose.center()
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.cam.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.cam.height
    }

    /// The 3x4 projection matrix K [R | t] in row-major order.
    ///
    /// Lens distortion is not part of the matrix.
    pub fn projection_matrix(&self) -> [[f64; 4]; 3] {
        let kr = self.k() * self.r();
        let kt = self.k() * self.t();
        let mut p = [[0.0; 4]; 3];
        for (i, row) in p.iter_mut().enumerate() {
            *row = [kr.col(0)[i], kr.col(1)[i], kr.col(2)[i], kt[i]];
        }
        p
    }

    /// Project a world point to pixel coordinates.
    pub fn projection(&self, p3d: DVec3) -> DVec2 {
        let p_cam = self.r() * p3d + self.t();
        self.cam.cam2img(p_cam)
    }

    /// Unit viewing direction in world coordinates through a pixel.
    pub fn ray_direction(&self, p2d: DVec2) -> DVec3 {
        let dir_cam = self.cam.img2cam(p2d);
        (self.r().transpose() * dir_cam).normalize()
    }
}
