use glam::{DVec2, DVec3};
use kornia_camera::CameraView;
use serde::{Deserialize, Serialize};

/// A 2D line segment in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line2d {
    /// First endpoint.
    pub start: DVec2,
    /// Second endpoint.
    pub end: DVec2,
}

impl Line2d {
    /// Create a segment from its two endpoints.
    pub fn new(start: DVec2, end: DVec2) -> Self {
        Self { start, end }
    }

    /// Create a segment from `[x1, y1, x2, y2]`.
    pub fn from_array(array: [f64; 4]) -> Self {
        Self::new(
            DVec2::new(array[0], array[1]),
            DVec2::new(array[2], array[3]),
        )
    }

    /// The segment as `[x1, y1, x2, y2]`.
    pub fn as_array(&self) -> [f64; 4] {
        [self.start.x, self.start.y, self.end.x, self.end.y]
    }

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        (self.end - self.start).length()
    }

    /// Middle point of the segment.
    pub fn midpoint(&self) -> DVec2 {
        0.5 * (self.start + self.end)
    }

    /// Unit direction from `start` to `end`.
    pub fn direction(&self) -> DVec2 {
        (self.end - self.start).normalize()
    }

    /// Unit normal of the segment.
    pub fn perp_direction(&self) -> DVec2 {
        self.direction().perp()
    }

    /// Homogeneous coordinates `(a, b, c)` of the infinite line, with `a² + b² = 1`.
    pub fn coords(&self) -> DVec3 {
        let l = self.start.extend(1.0).cross(self.end.extend(1.0));
        l / l.truncate().length()
    }

    /// Distance from a point to the segment.
    pub fn point_distance(&self, p: DVec2) -> f64 {
        let d = self.end - self.start;
        let len2 = d.length_squared();
        if len2 == 0.0 {
            return (p - self.start).length();
        }
        let t = ((p - self.start).dot(d) / len2).clamp(0.0, 1.0);
        (p - (self.start + t * d)).length()
    }
}

/// A 3D line segment in world coordinates.
///
/// `uncertainty` is the positional uncertainty of the segment, used to scale the
/// perpendicular tolerance of scale-invariant 3D linking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line3d {
    /// First endpoint.
    pub start: DVec3,
    /// Second endpoint.
    pub end: DVec3,
    /// Positional uncertainty.
    pub uncertainty: f64,
}

impl Line3d {
    /// Create a segment with unit uncertainty.
    pub fn new(start: DVec3, end: DVec3) -> Self {
        Self {
            start,
            end,
            uncertainty: 1.0,
        }
    }

    /// Placeholder for an observation without a valid triangulation.
    ///
    /// Its endpoints are NaN, so it is rejected by [`Line3d::is_finite`] and every range test.
    pub fn invalid() -> Self {
        Self {
            start: DVec3::NAN,
            end: DVec3::NAN,
            uncertainty: f64::NAN,
        }
    }

    /// Return a copy with the given uncertainty.
    pub fn with_uncertainty(self, uncertainty: f64) -> Self {
        Self {
            uncertainty,
            ..self
        }
    }

    /// The segment as `[[x1, y1, z1], [x2, y2, z2]]`.
    pub fn as_array(&self) -> [[f64; 3]; 2] {
        [self.start.to_array(), self.end.to_array()]
    }

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        (self.end - self.start).length()
    }

    /// Middle point of the segment.
    pub fn midpoint(&self) -> DVec3 {
        0.5 * (self.start + self.end)
    }

    /// Unit direction from `start` to `end`.
    pub fn direction(&self) -> DVec3 {
        (self.end - self.start).normalize()
    }

    /// Whether both endpoints are finite.
    pub fn is_finite(&self) -> bool {
        self.start.is_finite() && self.end.is_finite()
    }

    /// The same segment with swapped endpoints.
    pub fn reversed(&self) -> Self {
        Self {
            start: self.end,
            end: self.start,
            uncertainty: self.uncertainty,
        }
    }

    /// Distance from a point to the segment.
    pub fn point_distance(&self, p: DVec3) -> f64 {
        let d = self.end - self.start;
        let len2 = d.length_squared();
        if len2 == 0.0 {
            return (p - self.start).length();
        }
        let t = ((p - self.start).dot(d) / len2).clamp(0.0, 1.0);
        (p - (self.start + t * d)).length()
    }

    /// Project the segment into a view.
    pub fn projection(&self, view: &CameraView) -> Line2d {
        Line2d::new(view.projection(self.start), view.projection(self.end))
    }

    /// Whether both endpoints lie in front of the camera.
    pub fn is_in_front(&self, view: &CameraView) -> bool {
        view.pose.projdepth(self.start) > 0.0 && view.pose.projdepth(self.end) > 0.0
    }

    /// Angle in degrees, in `[0, 90]`, between the line and the ray from the camera center
    /// to the line midpoint.
    ///
    /// Small angles mean the line is seen nearly end-on and its position across the
    /// viewing ray is poorly constrained.
    pub fn sensitivity(&self, view: &CameraView) -> f64 {
        let ray = (self.midpoint() - view.center()).normalize();
        let cos = ray.dot(self.direction()).abs().min(1.0);
        cos.acos().to_degrees()
    }

    /// Uncertainty of the segment as observed from a view with pixel noise `var2d`.
    ///
    /// Taken as the smaller uncertainty of the two endpoints.
    pub fn compute_uncertainty(&self, view: &CameraView, var2d: f64) -> f64 {
        let u_start = view
            .cam
            .uncertainty(view.pose.projdepth(self.start), var2d);
        let u_end = view.cam.uncertainty(view.pose.projdepth(self.end), var2d);
        u_start.min(u_end)
    }
}

/// Assign to each line the uncertainty it has when observed from `view`.
pub fn set_uncertainty(lines: &[Line3d], view: &CameraView, var2d: f64) -> Vec<Line3d> {
    lines
        .iter()
        .map(|l| l.with_uncertainty(l.compute_uncertainty(view, var2d)))
        .collect()
}
