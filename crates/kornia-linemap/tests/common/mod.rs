#![allow(dead_code)]

use glam::{DMat3, DVec2, DVec3};
use kornia_camera::{Camera, CameraModelId, CameraPose, CameraView};
use kornia_linemap::{
    Line2d, Line3d, LineLinker, LineLinker2d, LineLinker2dConfig, LineLinker3d,
    LineLinker3dConfig,
};
use rand::{rngs::StdRng, Rng};

/// A 1280x960 pinhole view at `center` looking at `target`.
pub fn look_at_view(center: DVec3, target: DVec3) -> CameraView {
    let cam = Camera::new(
        CameraModelId::Pinhole,
        vec![1200.0, 1200.0, 640.0, 480.0],
        (1280, 960),
    )
    .unwrap();
    let z = (target - center).normalize();
    let x = DVec3::Y.cross(z).normalize();
    let y = z.cross(x);
    let r = DMat3::from_cols(x, y, z).transpose();
    CameraView::new(cam, CameraPose::from_center(&r, center))
}

/// `n` views on a horizontal arc of radius 3 around the origin, spaced by `step_deg`.
pub fn arc_views(n: usize, step_deg: f64) -> Vec<CameraView> {
    (0..n)
        .map(|i| {
            let a = (i as f64 * step_deg).to_radians();
            look_at_view(DVec3::new(3.0 * a.sin(), 0.0, -3.0 * a.cos()), DVec3::ZERO)
        })
        .collect()
}

pub fn ground_truth_lines() -> Vec<Line3d> {
    vec![
        Line3d::new(DVec3::new(-0.8, -0.5, 0.3), DVec3::new(0.6, 0.7, -0.2)),
        Line3d::new(DVec3::new(-0.3, 0.6, 0.2), DVec3::new(0.4, -0.6, -0.1)),
    ]
}

pub fn add_noise(l: &Line2d, rng: &mut StdRng, noise_px: f64) -> Line2d {
    let mut jitter = || DVec2::new(rng.random_range(-noise_px..noise_px), rng.random_range(-noise_px..noise_px));
    Line2d::new(l.start + jitter(), l.end + jitter())
}

pub fn all_neighbors(n: usize) -> Vec<Vec<usize>> {
    (0..n)
        .map(|i| (0..n).filter(|&j| j != i).collect())
        .collect()
}

pub fn linker_2d() -> LineLinker2d {
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

pub fn linker_3d() -> LineLinker3d {
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

pub fn linker() -> LineLinker {
    LineLinker::new(linker_2d(), linker_3d())
}
