//! Computing the representative 3D line of a track.

use glam::DVec3;
use kornia_camera::CameraView;

use crate::linker::{compute_angle, compute_perp_dist_oneway};
use crate::{Line3d, LineLinker2d, TrackSupport};

/// Candidates scoring within this factor of the best are considered equally good and
/// averaged.
pub const COMPARABLE_SCORE_RATIO: f64 = 1.05;

/// Reprojection residual of `line` against every support, normalized by the 2D linker
/// thresholds.
///
/// Each support adds `angle / th_angle + perp / th_perp`, summed in support order. A line
/// behind any supporting camera has an infinite residual.
///
/// PRECONDITION: every support's view id indexes `views`.
pub fn reprojection_residual(
    line: &Line3d,
    supports: &[TrackSupport],
    views: &[CameraView],
    linker_2d: &LineLinker2d,
) -> f64 {
    let th_angle = linker_2d.config().th_angle.max(f64::EPSILON);
    let th_perp = linker_2d.config().th_perp.max(f64::EPSILON);

    let mut residual = 0.0;
    for support in supports {
        let view = &views[support.view_id];
        if !line.is_in_front(view) {
            return f64::INFINITY;
        }
        let proj = line.projection(view);
        residual += compute_angle(&proj, &support.line2d) / th_angle
            + compute_perp_dist_oneway(&proj, &support.line2d) / th_perp;
    }
    residual
}

/// Pick the representative line among `candidates`.
///
/// The candidate with the lowest [`reprojection_residual`] wins, ties going to the
/// earliest. When several candidates score within [`COMPARABLE_SCORE_RATIO`] of the best,
/// they are oriented like the best one and their endpoints averaged in candidate order.
/// Returns `None` if no candidate has a finite residual.
pub fn select_representative(
    candidates: &[Line3d],
    supports: &[TrackSupport],
    views: &[CameraView],
    linker_2d: &LineLinker2d,
) -> Option<Line3d> {
    let scores: Vec<f64> = candidates
        .iter()
        .map(|c| {
            if c.is_finite() {
                reprojection_residual(c, supports, views, linker_2d)
            } else {
                f64::INFINITY
            }
        })
        .collect();

    let (best_idx, best_score) = scores
        .iter()
        .copied()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))?;
    if !best_score.is_finite() {
        return None;
    }

    let best = candidates[best_idx];
    let dir = best.direction();
    let comparable: Vec<Line3d> = candidates
        .iter()
        .zip(&scores)
        .filter(|(_, s)| **s <= best_score * COMPARABLE_SCORE_RATIO)
        .map(|(c, _)| if c.direction().dot(dir) < 0.0 { c.reversed() } else { *c })
        .collect();

    if comparable.len() == 1 {
        return Some(best);
    }

    let n = comparable.len() as f64;
    let start = comparable.iter().fold(DVec3::ZERO, |acc, l| acc + l.start) / n;
    let end = comparable.iter().fold(DVec3::ZERO, |acc, l| acc + l.end) / n;
    let uncertainty = comparable
        .iter()
        .map(|l| l.uncertainty)
        .fold(f64::INFINITY, f64::min);
    Some(Line3d::new(start, end).with_uncertainty(uncertainty))
}

/// Least squares 3D line through the endpoints of `lines`.
///
/// The direction is the principal axis of the endpoint scatter, oriented like the first
/// line. The extent spans the projections of all endpoints and the uncertainty is the
/// smallest input uncertainty. Non-finite lines are ignored; returns `None` if nothing is
/// left.
pub fn fit_line3d(lines: &[Line3d]) -> Option<Line3d> {
    let finite: Vec<&Line3d> = lines.iter().filter(|l| l.is_finite()).collect();
    let first = finite.first()?;

    let points: Vec<DVec3> = finite.iter().flat_map(|l| [l.start, l.end]).collect();
    let centroid = points.iter().fold(DVec3::ZERO, |acc, p| acc + *p) / points.len() as f64;

    // 3x3 scatter matrix of the centered endpoints
    let mut scatter = faer::Mat::<f64>::zeros(3, 3);
    for p in &points {
        let d = (*p - centroid).to_array();
        for i in 0..3 {
            for j in 0..3 {
                scatter.write(i, j, scatter.read(i, j) + d[i] * d[j]);
            }
        }
    }

    let svd = scatter.svd();
    let v = svd.v();
    let mut dir = DVec3::new(v.read(0, 0), v.read(1, 0), v.read(2, 0)).normalize();
    if dir.dot(first.end - first.start) < 0.0 {
        dir = -dir;
    }

    let (t_min, t_max) = points
        .iter()
        .map(|p| (*p - centroid).dot(dir))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
            (lo.min(t), hi.max(t))
        });
    let uncertainty = finite
        .iter()
        .map(|l| l.uncertainty)
        .fold(f64::INFINITY, f64::min);

    Some(Line3d::new(centroid + t_min * dir, centroid + t_max * dir).with_uncertainty(uncertainty))
}
