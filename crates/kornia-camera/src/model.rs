use glam::{DMat3, DVec2, DVec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of fixed-point iterations used to invert the radial distortion.
const UNDISTORT_MAX_ITERATIONS: usize = 100;

/// Convergence tolerance of the undistortion fixed-point iteration.
const UNDISTORT_EPS: f64 = 1e-12;

/// Error types for camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// The parameter vector does not match the camera model.
    #[error("Camera model {model} expects {expected} parameters, got {actual}")]
    InvalidParams {
        /// Name of the camera model.
        model: &'static str,
        /// Number of parameters required by the model.
        expected: usize,
        /// Number of parameters provided.
        actual: usize,
    },

    /// A focal length is not finite or not strictly positive.
    #[error("Invalid focal length: {0}")]
    InvalidFocalLength(f64),

    /// The intrinsic matrix is not of the form [[fx, 0, cx], [0, fy, cy], [0, 0, 1]].
    #[error("Invalid camera intrinsics matrix: {0}")]
    InvalidIntrinsics(String),

    /// The camera model name is not known.
    #[error("Unknown camera model: {0}")]
    UnknownModel(String),

    /// The operation is not supported for this camera model.
    #[error("Operation not supported for camera model {0}")]
    UnsupportedModel(&'static str),
}

/// Closed set of supported intrinsic camera models.
///
/// Parameter layout per model:
///
/// - `SimplePinhole`: `[f, cx, cy]`
/// - `Pinhole`: `[fx, fy, cx, cy]`
/// - `SimpleRadial`: `[f, cx, cy, k]`
/// - `Radial`: `[f, cx, cy, k1, k2]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraModelId {
    /// Pinhole camera with a single focal length.
    SimplePinhole,
    /// Pinhole camera with independent focal lengths.
    Pinhole,
    /// Single focal length and one radial distortion coefficient.
    SimpleRadial,
    /// Single focal length and two radial distortion coefficients.
    Radial,
}

impl CameraModelId {
    /// Number of parameters expected by the model.
    pub fn num_params(&self) -> usize {
        match self {
            CameraModelId::SimplePinhole => 3,
            CameraModelId::Pinhole => 4,
            CameraModelId::SimpleRadial => 4,
            CameraModelId::Radial => 5,
        }
    }

    /// Canonical upper-case name of the model.
    pub fn name(&self) -> &'static str {
        match self {
            CameraModelId::SimplePinhole => "SIMPLE_PINHOLE",
            CameraModelId::Pinhole => "PINHOLE",
            CameraModelId::SimpleRadial => "SIMPLE_RADIAL",
            CameraModelId::Radial => "RADIAL",
        }
    }

    /// Parse a model from its canonical name.
    pub fn from_name(name: &str) -> Result<Self, CameraError> {
        match name {
            "SIMPLE_PINHOLE" => Ok(CameraModelId::SimplePinhole),
            "PINHOLE" => Ok(CameraModelId::Pinhole),
            "SIMPLE_RADIAL" => Ok(CameraModelId::SimpleRadial),
            "RADIAL" => Ok(CameraModelId::Radial),
            other => Err(CameraError::UnknownModel(other.to_string())),
        }
    }

    /// Whether the model carries lens distortion.
    pub fn has_distortion(&self) -> bool {
        matches!(self, CameraModelId::SimpleRadial | CameraModelId::Radial)
    }
}

/// Intrinsic calibration of a camera.
///
/// Deserialization goes through [`Camera::new`], so a malformed camera is rejected on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CameraParams")]
pub struct Camera {
    /// Intrinsic model.
    pub model: CameraModelId,
    /// Model parameters, laid out as documented on [`CameraModelId`].
    pub params: Vec<f64>,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

/// Unchecked serialized form of a [`Camera`].
#[derive(Deserialize)]
struct CameraParams {
    model: CameraModelId,
    params: Vec<f64>,
    width: u32,
    height: u32,
}

impl TryFrom<CameraParams> for Camera {
    type Error = CameraError;

    fn try_from(raw: CameraParams) -> Result<Self, Self::Error> {
        Camera::new(raw.model, raw.params, (raw.width, raw.height))
    }
}

impl Camera {
    /// Create a camera, checking the parameters against the model.
    ///
    /// # Arguments
    ///
    /// * `model` - The intrinsic model.
    /// * `params` - The model parameters.
    /// * `image_size` - The image dimensions (width, height).
    pub fn new(
        model: CameraModelId,
        params: Vec<f64>,
        image_size: (u32, u32),
    ) -> Result<Self, CameraError> {
        if params.len() != model.num_params() {
            return Err(CameraError::InvalidParams {
                model: model.name(),
                expected: model.num_params(),
                actual: params.len(),
            });
        }

        let camera = Self {
            model,
            params,
            width: image_size.0,
            height: image_size.1,
        };

        let (fx, fy) = camera.focal_lengths();
        for f in [fx, fy] {
            if !f.is_finite() || f <= 0.0 {
                return Err(CameraError::InvalidFocalLength(f));
            }
        }

        Ok(camera)
    }

    /// Create a pinhole camera from a 3x3 intrinsics matrix.
    pub fn from_k(k: &DMat3, image_size: (u32, u32)) -> Result<Self, CameraError> {
        // glam matrices are column major: x_axis is the first column
        if k.y_axis.x != 0.0 || k.x_axis.y != 0.0 || k.x_axis.z != 0.0 || k.y_axis.z != 0.0 {
            return Err(CameraError::InvalidIntrinsics(
                "Intrinsics matrix must have form [[fx, 0, cx], [0, fy, cy], [0, 0, 1]]"
                    .to_string(),
            ));
        }
        if k.z_axis.z != 1.0 {
            return Err(CameraError::InvalidIntrinsics(format!(
                "Expected K[2][2] == 1, got {}",
                k.z_axis.z
            )));
        }

        Self::new(
            CameraModelId::Pinhole,
            vec![k.x_axis.x, k.y_axis.y, k.z_axis.x, k.z_axis.y],
            image_size,
        )
    }

    /// Focal lengths (fx, fy) in pixels.
    pub fn focal_lengths(&self) -> (f64, f64) {
        match self.model {
            CameraModelId::Pinhole => (self.params[0], self.params[1]),
            CameraModelId::SimplePinhole | CameraModelId::SimpleRadial | CameraModelId::Radial => {
                (self.params[0], self.params[0])
            }
        }
    }

    /// Mean focal length in pixels.
    pub fn focal_length(&self) -> f64 {
        let (fx, fy) = self.focal_lengths();
        0.5 * (fx + fy)
    }

    /// Principal point (cx, cy) in pixels.
    pub fn principal_point(&self) -> DVec2 {
        match self.model {
            CameraModelId::Pinhole => DVec2::new(self.params[2], self.params[3]),
            CameraModelId::SimplePinhole | CameraModelId::SimpleRadial | CameraModelId::Radial => {
                DVec2::new(self.params[1], self.params[2])
            }
        }
    }

    /// Calibration matrix K.
    pub fn k(&self) -> DMat3 {
        let (fx, fy) = self.focal_lengths();
        let c = self.principal_point();
        DMat3::from_cols(
            DVec3::new(fx, 0.0, 0.0),
            DVec3::new(0.0, fy, 0.0),
            DVec3::new(c.x, c.y, 1.0),
        )
    }

    /// Inverse of the calibration matrix.
    pub fn k_inv(&self) -> DMat3 {
        let (fx, fy) = self.focal_lengths();
        let c = self.principal_point();
        DMat3::from_cols(
            DVec3::new(1.0 / fx, 0.0, 0.0),
            DVec3::new(0.0, 1.0 / fy, 0.0),
            DVec3::new(-c.x / fx, -c.y / fy, 1.0),
        )
    }

    fn radial_coeffs(&self) -> (f64, f64) {
        match self.model {
            CameraModelId::SimplePinhole | CameraModelId::Pinhole => (0.0, 0.0),
            CameraModelId::SimpleRadial => (self.params[3], 0.0),
            CameraModelId::Radial => (self.params[3], self.params[4]),
        }
    }

    /// Apply the lens distortion to a point in normalized image coordinates.
    pub fn distort(&self, normalized: DVec2) -> DVec2 {
        let (k1, k2) = self.radial_coeffs();
        if k1 == 0.0 && k2 == 0.0 {
            return normalized;
        }
        let r2 = normalized.length_squared();
        normalized * (1.0 + k1 * r2 + k2 * r2 * r2)
    }

    /// Remove the lens distortion from a point in normalized image coordinates.
    pub fn undistort(&self, distorted: DVec2) -> DVec2 {
        let (k1, k2) = self.radial_coeffs();
        if k1 == 0.0 && k2 == 0.0 {
            return distorted;
        }

        let mut x = distorted;
        for _ in 0..UNDISTORT_MAX_ITERATIONS {
            let r2 = x.length_squared();
            let x_new = distorted / (1.0 + k1 * r2 + k2 * r2 * r2);
            let delta = (x_new - x).length();
            x = x_new;
            if delta < UNDISTORT_EPS {
                break;
            }
        }
        x
    }

    /// Map a point in camera coordinates to pixels.
    pub fn cam2img(&self, p_cam: DVec3) -> DVec2 {
        let normalized = DVec2::new(p_cam.x / p_cam.z, p_cam.y / p_cam.z);
        let d = self.distort(normalized);
        let (fx, fy) = self.focal_lengths();
        let c = self.principal_point();
        DVec2::new(fx * d.x + c.x, fy * d.y + c.y)
    }

    /// Map a pixel to an (unnormalized) viewing direction in camera coordinates, z = 1.
    pub fn img2cam(&self, p2d: DVec2) -> DVec3 {
        let (fx, fy) = self.focal_lengths();
        let c = self.principal_point();
        let distorted = DVec2::new((p2d.x - c.x) / fx, (p2d.y - c.y) / fy);
        self.undistort(distorted).extend(1.0)
    }

    /// Positional uncertainty of a back-projected point at a given depth.
    ///
    /// `var2d` is the pixel noise of the 2D observation.
    pub fn uncertainty(&self, depth: f64, var2d: f64) -> f64 {
        var2d * depth / self.focal_length()
    }

    /// Return a copy of the camera rescaled to a new image size.
    ///
    /// Single focal length models use the mean of both scale factors.
    pub fn resize(&self, width: u32, height: u32) -> Self {
        let sx = width as f64 / self.width as f64;
        let sy = height as f64 / self.height as f64;
        let mut params = self.params.clone();
        match self.model {
            CameraModelId::Pinhole => {
                params[0] *= sx;
                params[1] *= sy;
                params[2] *= sx;
                params[3] *= sy;
            }
            CameraModelId::SimplePinhole | CameraModelId::SimpleRadial | CameraModelId::Radial => {
                params[0] *= 0.5 * (sx + sy);
                params[1] *= sx;
                params[2] *= sy;
            }
        }
        Self {
            model: self.model,
            params,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_invalid_param_count() {
        let res = Camera::new(CameraModelId::Pinhole, vec![500.0, 320.0, 240.0], (640, 480));
        assert!(matches!(
            res,
            Err(CameraError::InvalidParams {
                expected: 4,
                actual: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_focal_length() {
        let res = Camera::new(
            CameraModelId::SimplePinhole,
            vec![-1.0, 320.0, 240.0],
            (640, 480),
        );
        assert!(matches!(res, Err(CameraError::InvalidFocalLength(_))));
    }

    #[test]
    fn test_k_and_inverse() -> Result<(), CameraError> {
        let cam = Camera::new(
            CameraModelId::Pinhole,
            vec![500.0, 520.0, 320.0, 240.0],
            (640, 480),
        )?;
        let prod = cam.k() * cam.k_inv();
        let arr = prod.to_cols_array();
        let eye = DMat3::IDENTITY.to_cols_array();
        for i in 0..9 {
            assert_relative_eq!(arr[i], eye[i], epsilon = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_from_k_rejects_skew() {
        let k = DMat3::from_cols(
            DVec3::new(500.0, 0.0, 0.0),
            DVec3::new(1.0, 500.0, 0.0),
            DVec3::new(320.0, 240.0, 1.0),
        );
        assert!(matches!(
            Camera::from_k(&k, (640, 480)),
            Err(CameraError::InvalidIntrinsics(_))
        ));
    }

    #[test]
    fn test_distortion_roundtrip() -> Result<(), CameraError> {
        let cam = Camera::new(
            CameraModelId::Radial,
            vec![500.0, 320.0, 240.0, -0.1, 0.01],
            (640, 480),
        )?;
        let p = DVec2::new(0.3, -0.2);
        let back = cam.undistort(cam.distort(p));
        assert_relative_eq!(back.x, p.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_model_names() -> Result<(), CameraError> {
        for model in [
            CameraModelId::SimplePinhole,
            CameraModelId::Pinhole,
            CameraModelId::SimpleRadial,
            CameraModelId::Radial,
        ] {
            assert_eq!(CameraModelId::from_name(model.name())?, model);
        }
        assert!(CameraModelId::from_name("FISHEYE").is_err());
        Ok(())
    }

    #[test]
    fn test_resize_scales_principal_point() -> Result<(), CameraError> {
        let cam = Camera::new(
            CameraModelId::SimplePinhole,
            vec![500.0, 320.0, 240.0],
            (640, 480),
        )?;
        let half = cam.resize(320, 240);
        assert_relative_eq!(half.focal_length(), 250.0);
        assert_relative_eq!(half.principal_point().x, 160.0);
        assert_relative_eq!(half.principal_point().y, 120.0);
        Ok(())
    }
}
