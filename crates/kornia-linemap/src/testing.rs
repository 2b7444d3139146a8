//! Synthetic fixtures shared by the unit tests.

use glam::{DMat3, DVec3};
use kornia_camera::{Camera, CameraModelId, CameraPose, CameraView};

use crate::{Line2d, Line3d, LineLinker, LineLinker2d, LineLinker2dConfig, LineLinker3d, LineLinker3dConfig};

/// A 640x480 pinhole view at `center` looking at `target`.
pub(crate) fn look_at_view(center: DVec3, target: DVec3) -> CameraView {
    let cam = Camera::new(
        CameraModelId::SimplePinhole,
        vec![500.0, 320.0, 240.0],
        (640, 480),
    )
    .unwrap();
    let z = (target - center).normalize();
    let x = DVec3::Y.cross(z).normalize();
    let y = z.cross(x);
    let r = DMat3::from_cols(x, y, z).transpose();
    CameraView::new(cam, CameraPose::from_center(&r, center))
}

/// Views on a horizontal arc of radius 5 around the origin, spaced by `step_deg`.
pub(crate) fn arc_views(n: usize, step_deg: f64) -> Vec<CameraView> {
    (0..n)
        .map(|i| {
            let a = (i as f64 * step_deg).to_radians();
            let center = DVec3::new(5.0 * a.sin(), 0.0, -5.0 * a.cos());
            look_at_view(center, DVec3::ZERO)
        })
        .collect()
}

/// Two views with a one unit baseline looking at the origin.
pub(crate) fn two_views() -> (CameraView, CameraView) {
    (
        look_at_view(DVec3::new(0.0, 0.0, -5.0), DVec3::ZERO),
        look_at_view(DVec3::new(1.0, 0.0, -5.0), DVec3::ZERO),
    )
}

/// A 3D segment crossing the field of view of [`two_views`].
pub(crate) fn test_line() -> Line3d {
    Line3d::new(DVec3::new(-0.8, -0.5, 0.3), DVec3::new(0.6, 0.7, -0.2))
}

/// Projections of `line` into every view.
pub(crate) fn project_all(line: &Line3d, views: &[CameraView]) -> Vec<Line2d> {
    views.iter().map(|v| line.projection(v)).collect()
}

pub(crate) fn linker_2d() -> LineLinker2d {
    LineLinker2d::new(LineLinker2dConfig {
        th_angle: 8.0,
        th_perp: 5.0,
        th_overlap: 0.1,
        use_angle: true,
        use_perp: true,
        use_overlap: true,
    })
    .unwrap()
}

pub(crate) fn linker_3d() -> LineLinker3d {
    LineLinker3d::new(LineLinker3dConfig {
        th_angle: 10.0,
        th_perp: 0.05,
        th_overlap: 0.01,
        use_angle: true,
        use_perp: true,
        use_overlap: true,
        use_scaleinv: false,
    })
    .unwrap()
}

pub(crate) fn linker() -> LineLinker {
    LineLinker::new(linker_2d(), linker_3d())
}
