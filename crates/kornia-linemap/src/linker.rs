//! Rules deciding whether two line observations belong to the same physical line.
//!
//! Metrics are defined once on 3D segments, 2D lines are embedded on the `z = 0` plane.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{check_threshold, LinemapError};
use crate::{Line2d, Line3d};

/// A segment the linking metrics can be evaluated on.
pub trait LineSegment {
    /// Endpoints lifted to 3D.
    fn endpoints(&self) -> (DVec3, DVec3);
}

impl LineSegment for Line2d {
    fn endpoints(&self) -> (DVec3, DVec3) {
        (self.start.extend(0.0), self.end.extend(0.0))
    }
}

impl LineSegment for Line3d {
    fn endpoints(&self) -> (DVec3, DVec3) {
        (self.start, self.end)
    }
}

/// Angle in degrees, in `[0, 90]`, between two lines, direction compared up to sign.
pub fn compute_angle<L: LineSegment>(a: &L, b: &L) -> f64 {
    let (a0, a1) = a.endpoints();
    let (b0, b1) = b.endpoints();
    let cos = (a1 - a0)
        .normalize()
        .dot((b1 - b0).normalize())
        .abs()
        .min(1.0);
    cos.acos().to_degrees()
}

/// Largest distance from the endpoints of `b` to the infinite extension of `a`.
pub fn compute_perp_dist_oneway<L: LineSegment>(a: &L, b: &L) -> f64 {
    let (a0, a1) = a.endpoints();
    let (b0, b1) = b.endpoints();
    let dir = (a1 - a0).normalize();
    let dist = |p: DVec3| (p - a0).cross(dir).length();
    dist(b0).max(dist(b1))
}

/// Symmetric perpendicular distance: the larger of both one-way distances.
pub fn compute_perp_dist<L: LineSegment>(a: &L, b: &L) -> f64 {
    compute_perp_dist_oneway(a, b).max(compute_perp_dist_oneway(b, a))
}

/// Length of `b` projected onto `a` and clipped to `a`'s extent, relative to `a`'s length.
pub fn compute_overlap<L: LineSegment>(a: &L, b: &L) -> f64 {
    let (a0, a1) = a.endpoints();
    let (b0, b1) = b.endpoints();
    let len = (a1 - a0).length();
    if len == 0.0 {
        return 0.0;
    }
    let dir = (a1 - a0) / len;
    let t0 = (b0 - a0).dot(dir);
    let t1 = (b1 - a0).dot(dir);
    let lo = t0.min(t1).max(0.0);
    let hi = t0.max(t1).min(len);
    (hi - lo).max(0.0) / len
}

/// Symmetric overlap: the larger of both one-way overlaps.
pub fn compute_bioverlap<L: LineSegment>(a: &L, b: &L) -> f64 {
    compute_overlap(a, b).max(compute_overlap(b, a))
}

fn validate(
    th_angle: f64,
    th_perp: f64,
    th_overlap: f64,
    enabled: [bool; 3],
) -> Result<(), LinemapError> {
    check_threshold("th_angle", th_angle)?;
    check_threshold("th_perp", th_perp)?;
    check_threshold("th_overlap", th_overlap)?;
    if th_angle > 90.0 {
        return Err(LinemapError::InvalidThreshold {
            name: "th_angle",
            value: th_angle,
        });
    }
    if !enabled.iter().any(|&e| e) {
        return Err(LinemapError::NoCriterionEnabled);
    }
    Ok(())
}

/// Thresholds and enabled criteria for linking 2D lines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineLinker2dConfig {
    /// Maximum angle in degrees.
    pub th_angle: f64,
    /// Maximum perpendicular distance in pixels.
    pub th_perp: f64,
    /// Minimum overlap ratio.
    pub th_overlap: f64,
    /// Enable the angle criterion.
    pub use_angle: bool,
    /// Enable the perpendicular distance criterion.
    pub use_perp: bool,
    /// Enable the overlap criterion.
    pub use_overlap: bool,
}

/// Decides whether two 2D lines are the same line.
///
/// Every enabled criterion must pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineLinker2d {
    config: LineLinker2dConfig,
}

impl LineLinker2d {
    /// Create a linker, validating its thresholds.
    pub fn new(config: LineLinker2dConfig) -> Result<Self, LinemapError> {
        validate(
            config.th_angle,
            config.th_perp,
            config.th_overlap,
            [config.use_angle, config.use_perp, config.use_overlap],
        )?;
        Ok(Self { config })
    }

    /// The linker configuration.
    pub fn config(&self) -> &LineLinker2dConfig {
        &self.config
    }

    /// Angle criterion.
    pub fn check_angle(&self, a: &Line2d, b: &Line2d) -> bool {
        compute_angle(a, b) <= self.config.th_angle
    }

    /// Perpendicular distance criterion.
    pub fn check_perp(&self, a: &Line2d, b: &Line2d) -> bool {
        compute_perp_dist(a, b) <= self.config.th_perp
    }

    /// Overlap criterion.
    pub fn check_overlap(&self, a: &Line2d, b: &Line2d) -> bool {
        compute_bioverlap(a, b) >= self.config.th_overlap
    }

    /// Whether `a` and `b` are the same line. Symmetric in its arguments.
    pub fn check(&self, a: &Line2d, b: &Line2d) -> bool {
        (!self.config.use_angle || self.check_angle(a, b))
            && (!self.config.use_perp || self.check_perp(a, b))
            && (!self.config.use_overlap || self.check_overlap(a, b))
    }
}

/// Thresholds and enabled criteria for linking 3D lines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineLinker3dConfig {
    /// Maximum angle in degrees.
    pub th_angle: f64,
    /// Maximum perpendicular distance in world units.
    pub th_perp: f64,
    /// Minimum overlap ratio.
    pub th_overlap: f64,
    /// Enable the angle criterion.
    pub use_angle: bool,
    /// Enable the perpendicular distance criterion.
    pub use_perp: bool,
    /// Enable the overlap criterion.
    pub use_overlap: bool,
    /// Scale the perpendicular threshold by the smaller uncertainty of the two lines.
    pub use_scaleinv: bool,
}

/// Decides whether two 3D lines are the same line.
///
/// Every enabled criterion must pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineLinker3d {
    config: LineLinker3dConfig,
}

impl LineLinker3d {
    /// Create a linker, validating its thresholds.
    pub fn new(config: LineLinker3dConfig) -> Result<Self, LinemapError> {
        validate(
            config.th_angle,
            config.th_perp,
            config.th_overlap,
            [config.use_angle, config.use_perp, config.use_overlap],
        )?;
        Ok(Self { config })
    }

    /// The linker configuration.
    pub fn config(&self) -> &LineLinker3dConfig {
        &self.config
    }

    /// Perpendicular threshold effective for the pair `(a, b)`.
    pub fn perp_threshold(&self, a: &Line3d, b: &Line3d) -> f64 {
        if self.config.use_scaleinv {
            self.config.th_perp * a.uncertainty.min(b.uncertainty)
        } else {
            self.config.th_perp
        }
    }

    /// Angle criterion.
    pub fn check_angle(&self, a: &Line3d, b: &Line3d) -> bool {
        compute_angle(a, b) <= self.config.th_angle
    }

    /// Perpendicular distance criterion.
    pub fn check_perp(&self, a: &Line3d, b: &Line3d) -> bool {
        compute_perp_dist(a, b) <= self.perp_threshold(a, b)
    }

    /// Overlap criterion.
    pub fn check_overlap(&self, a: &Line3d, b: &Line3d) -> bool {
        compute_bioverlap(a, b) >= self.config.th_overlap
    }

    /// Whether `a` and `b` are the same line. Symmetric in its arguments.
    pub fn check(&self, a: &Line3d, b: &Line3d) -> bool {
        (!self.config.use_angle || self.check_angle(a, b))
            && (!self.config.use_perp || self.check_perp(a, b))
            && (!self.config.use_overlap || self.check_overlap(a, b))
    }
}

/// Serializable configuration of a [`LineLinker`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineLinkerConfig {
    /// 2D linking rules.
    pub linker_2d: LineLinker2dConfig,
    /// 3D linking rules.
    pub linker_3d: LineLinker3dConfig,
}

/// Bundle of the 2D and 3D linkers used by the merging engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineLinker {
    /// 2D linker.
    pub linker_2d: LineLinker2d,
    /// 3D linker.
    pub linker_3d: LineLinker3d,
}

impl LineLinker {
    /// Bundle two linkers.
    pub fn new(linker_2d: LineLinker2d, linker_3d: LineLinker3d) -> Self {
        Self {
            linker_2d,
            linker_3d,
        }
    }

    /// Build both linkers from a configuration.
    pub fn from_config(config: &LineLinkerConfig) -> Result<Self, LinemapError> {
        Ok(Self::new(
            LineLinker2d::new(config.linker_2d)?,
            LineLinker3d::new(config.linker_3d)?,
        ))
    }

    /// Check a pair of 2D lines.
    pub fn check_connection_2d(&self, a: &Line2d, b: &Line2d) -> bool {
        self.linker_2d.check(a, b)
    }

    /// Check a pair of 3D lines.
    pub fn check_connection_3d(&self, a: &Line3d, b: &Line3d) -> bool {
        self.linker_3d.check(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{linker_2d, linker_3d};
    use approx::assert_relative_eq;
    use glam::DVec2;

    fn l2(x1: f64, y1: f64, x2: f64, y2: f64) -> Line2d {
        Line2d::new(DVec2::new(x1, y1), DVec2::new(x2, y2))
    }

    #[test]
    fn test_metrics() {
        let a = l2(0.0, 0.0, 100.0, 0.0);
        let b = l2(50.0, 2.0, 150.0, 2.0);
        assert_relative_eq!(compute_angle(&a, &b), 0.0, epsilon = 1e-9);
        assert_relative_eq!(compute_perp_dist(&a, &b), 2.0, epsilon = 1e-9);
        assert_relative_eq!(compute_overlap(&a, &b), 0.5, epsilon = 1e-9);
        assert_relative_eq!(compute_bioverlap(&a, &b), 0.5, epsilon = 1e-9);

        // reversed direction is the same line
        let c = l2(100.0, 100.0, 0.0, 0.0);
        assert_relative_eq!(compute_angle(&a, &c), 45.0, epsilon = 1e-9);
        assert_relative_eq!(compute_angle(&a, &l2(100.0, 0.0, 0.0, 0.0)), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bioverlap_short_inside_long() {
        let long = l2(0.0, 0.0, 100.0, 0.0);
        let short = l2(40.0, 0.0, 50.0, 0.0);
        assert_relative_eq!(compute_overlap(&long, &short), 0.1, epsilon = 1e-9);
        assert_relative_eq!(compute_overlap(&short, &long), 1.0, epsilon = 1e-9);
        assert_relative_eq!(compute_bioverlap(&long, &short), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_linker2d_conjunctive() {
        let linker = linker_2d();
        let a = l2(0.0, 0.0, 100.0, 0.0);
        // aligned but far away
        assert!(!linker.check(&a, &l2(0.0, 50.0, 100.0, 50.0)));
        // close but rotated
        assert!(!linker.check(&a, &l2(0.0, 0.0, 100.0, 30.0)));
        // disjoint along the line
        assert!(!linker.check(&a, &l2(200.0, 0.0, 300.0, 0.0)));
        // same line
        assert!(linker.check(&a, &l2(10.0, 1.0, 90.0, 2.0)));
    }

    #[test]
    fn test_linker2d_symmetric() {
        let linker = linker_2d();
        let lines = [
            l2(0.0, 0.0, 100.0, 0.0),
            l2(10.0, 1.0, 90.0, 2.0),
            l2(0.0, 4.0, 20.0, 4.5),
            l2(95.0, -3.0, 300.0, 8.0),
            l2(50.0, 50.0, 60.0, 10.0),
        ];
        for a in &lines {
            for b in &lines {
                assert_eq!(linker.check(a, b), linker.check(b, a));
            }
        }
    }

    #[test]
    fn test_linker3d_scaleinv() -> Result<(), LinemapError> {
        let mut config = *linker_3d().config();
        config.use_scaleinv = true;
        let linker = LineLinker3d::new(config)?;
        let a = Line3d::new(DVec3::ZERO, DVec3::X).with_uncertainty(2.0);
        let b = Line3d::new(DVec3::new(0.0, 0.08, 0.0), DVec3::new(1.0, 0.08, 0.0))
            .with_uncertainty(3.0);
        // 0.08 exceeds 0.05 but not 0.05 * 2
        assert!(!linker_3d().check(&a, &b));
        assert!(linker.check(&a, &b));
        assert!(linker.check(&b, &a));
        Ok(())
    }

    #[test]
    fn test_invalid_configs() {
        let mut config = *linker_2d().config();
        config.th_angle = 120.0;
        assert!(matches!(
            LineLinker2d::new(config),
            Err(LinemapError::InvalidThreshold { name: "th_angle", .. })
        ));

        let mut config = *linker_2d().config();
        config.th_perp = f64::NAN;
        assert!(LineLinker2d::new(config).is_err());

        let mut config = *linker_3d().config();
        config.use_angle = false;
        config.use_perp = false;
        config.use_overlap = false;
        assert!(matches!(
            LineLinker3d::new(config),
            Err(LinemapError::NoCriterionEnabled)
        ));
    }
}
