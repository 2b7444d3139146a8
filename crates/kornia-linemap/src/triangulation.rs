//! Two-view line triangulation primitives.
//!
//! All functions are pure. Degenerate configurations such as near-parallel rays are not
//! rejected here: they yield non-finite or far away coordinates, which callers filter with
//! [`test_line_inside_ranges`], [`Line3d::is_finite`] or the sensitivity checks.

use glam::{DMat3, DVec2, DVec3};
use kornia_camera::CameraView;

use crate::{Line2d, Line3d};

/// Minimum distance between two camera centers for epipolar geometry to be defined.
const MIN_BASELINE: f64 = 1e-9;

fn skew(t: DVec3) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(0.0, t.z, -t.y),
        DVec3::new(-t.z, 0.0, t.x),
        DVec3::new(t.y, -t.x, 0.0),
    )
}

/// Fundamental matrix mapping pixels of `view1` to epipolar lines of `view2`.
///
/// F = K2^-T [t]x R K1^-1 with (R, t) the relative pose from view1 to view2.
pub fn fundamental_matrix(view1: &CameraView, view2: &CameraView) -> DMat3 {
    let r = view2.r() * view1.r().transpose();
    let t = view2.t() - r * view1.t();
    let e = skew(t) * r;
    view2.k_inv().transpose() * e * view1.k_inv()
}

/// Whether both endpoints of `line` are inside the axis aligned box `ranges`.
///
/// Non-finite endpoints are never inside.
pub fn test_line_inside_ranges(line: &Line3d, ranges: &(DVec3, DVec3)) -> bool {
    let (lo, hi) = ranges;
    let inside = |p: DVec3| p.cmpge(*lo).all() && p.cmple(*hi).all();
    inside(line.start) && inside(line.end)
}

/// Unit normal of the plane through the camera center of `view` and the 2D line `l`.
pub fn get_normal_direction(l: &Line2d, view: &CameraView) -> DVec3 {
    let ray_start = view.ray_direction(l.start);
    let ray_end = view.ray_direction(l.end);
    ray_start.cross(ray_end).normalize()
}

/// 3D direction of a vanishing point given in homogeneous pixel coordinates.
///
/// The sign of the returned direction is arbitrary.
pub fn get_direction_from_vp(vp: DVec3, view: &CameraView) -> DVec3 {
    (view.r().transpose() * (view.k_inv() * vp)).normalize()
}

/// Intersection of the infinite line `l` with the epipolar line of pixel `p` of `view1`.
fn epipolar_intersection(f: &DMat3, p: DVec2, l: &Line2d) -> DVec2 {
    let epiline = *f * p.extend(1.0);
    let x = l.coords().cross(epiline);
    x.truncate() / x.z
}

/// Intersection over union between `l2` and the interval cut on its infinite line by the
/// epipolar lines of `l1`'s endpoints.
///
/// Returns a score in `[0, 1]`. Views with coincident centers have no epipolar geometry, so
/// such pairs (including a view with itself) score `0.0`, as do epipolar lines parallel to
/// `l2`.
pub fn compute_epipolar_iou(
    l1: &Line2d,
    view1: &CameraView,
    l2: &Line2d,
    view2: &CameraView,
) -> f64 {
    if (view1.center() - view2.center()).length() < MIN_BASELINE {
        return 0.0;
    }

    let f = fundamental_matrix(view1, view2);
    let d = l2.end - l2.start;
    let len2 = d.length_squared();
    if len2 == 0.0 {
        return 0.0;
    }

    // 1D coordinates along l2, l2 itself spans [0, 1]
    let param = |p: DVec2| (p - l2.start).dot(d) / len2;
    let u1 = param(epipolar_intersection(&f, l1.start, l2));
    let u2 = param(epipolar_intersection(&f, l1.end, l2));
    let (lo, hi) = if u1 <= u2 { (u1, u2) } else { (u2, u1) };

    let intersection = (hi.min(1.0) - lo.max(0.0)).max(0.0);
    let union = hi.max(1.0) - lo.min(0.0);
    let iou = intersection / union;
    if iou.is_finite() {
        iou
    } else {
        0.0
    }
}

/// Triangulate a pixel correspondence.
///
/// Returns the midpoint of the shortest segment between the two viewing rays, which
/// minimizes the sum of squared distances to both rays.
pub fn point_triangulation(
    p1: DVec2,
    view1: &CameraView,
    p2: DVec2,
    view2: &CameraView,
) -> DVec3 {
    let c1 = view1.center();
    let c2 = view2.center();
    let d1 = view1.ray_direction(p1);
    let d2 = view2.ray_direction(p2);

    let w0 = c1 - c2;
    let b = d1.dot(d2);
    let d = d1.dot(w0);
    let e = d2.dot(w0);
    // rays are unit length, so the normal equations reduce to this 2x2 system
    let denom = 1.0 - b * b;
    let s = (b * e - d) / denom;
    let t = (e - b * d) / denom;

    0.5 * ((c1 + s * d1) + (c2 + t * d2))
}

/// Triangulate a line by matching each endpoint of `l1` with the point of `l2` on its
/// epipolar line.
pub fn triangulate_endpoints(
    l1: &Line2d,
    view1: &CameraView,
    l2: &Line2d,
    view2: &CameraView,
) -> Line3d {
    let f = fundamental_matrix(view1, view2);
    let start = point_triangulation(l1.start, view1, epipolar_intersection(&f, l1.start, l2), view2);
    let end = point_triangulation(l1.end, view1, epipolar_intersection(&f, l1.end, l2), view2);
    Line3d::new(start, end)
}

/// Triangulate a line by plane intersection, asymmetric towards `(view1, l1)`.
///
/// The rays through the endpoints of `l1` are intersected with the plane spanned by the
/// center of `view2` and `l2`. The result lies exactly on the back-projected plane of `l1`
/// and spans `l1`'s extent.
pub fn triangulate(l1: &Line2d, view1: &CameraView, l2: &Line2d, view2: &CameraView) -> Line3d {
    let c1 = view1.center();
    let n2 = get_normal_direction(l2, view2);
    let offset = (view2.center() - c1).dot(n2);

    let intersect = |p: DVec2| {
        let ray = view1.ray_direction(p);
        c1 + ray * (offset / ray.dot(n2))
    };
    Line3d::new(intersect(l1.start), intersect(l1.end))
}

/// Triangulate a line with a known 3D direction, asymmetric towards `(view1, l1)`.
///
/// The direction is first projected onto the back-projected plane of `l1`. The line is then
/// anchored where the viewing ray through the midpoint of `l2` pierces that plane, and its
/// endpoints are cut by the rays through the endpoints of `l1`.
pub fn triangulate_with_direction(
    l1: &Line2d,
    view1: &CameraView,
    l2: &Line2d,
    view2: &CameraView,
    direction: DVec3,
) -> Line3d {
    let c1 = view1.center();
    let n1 = get_normal_direction(l1, view1);
    let dir = (direction - direction.dot(n1) * n1).normalize();

    let c2 = view2.center();
    let ray2 = view2.ray_direction(l2.midpoint());
    let anchor = c2 + ray2 * ((c1 - c2).dot(n1) / ray2.dot(n1));

    // solve c1 + a * ray = anchor + s * dir in the least squares sense
    let cut = |p: DVec2| {
        let ray = view1.ray_direction(p);
        let w = anchor - c1;
        let rd = ray.dot(dir);
        let s = (dir.dot(w) - ray.dot(w) * rd) / (rd * rd - 1.0);
        anchor + s * dir
    };
    Line3d::new(cut(l1.start), cut(l1.end))
}
