//! Generating one 3D hypothesis per 2D line from its neighbor views.

use glam::DVec3;
use kornia_camera::CameraView;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{check_lengths, check_threshold, check_view_index, LinemapError};
use crate::triangulation::{compute_epipolar_iou, test_line_inside_ranges, triangulate};
use crate::{Line2d, Line3d};

/// Acceptance rules for triangulated hypotheses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HypothesisConfig {
    /// Minimum epipolar IoU of a line pair to be triangulated, in `[0, 1]`.
    pub min_epipolar_iou: f64,
    /// Minimum sensitivity angle in degrees, in both views of the pair.
    pub th_sensitivity: f64,
    /// Optional bounding box the hypothesis must lie in.
    #[serde(default)]
    pub ranges: Option<(DVec3, DVec3)>,
}

impl HypothesisConfig {
    fn validate(&self) -> Result<(), LinemapError> {
        check_threshold("min_epipolar_iou", self.min_epipolar_iou)?;
        if self.min_epipolar_iou > 1.0 {
            return Err(LinemapError::InvalidThreshold {
                name: "min_epipolar_iou",
                value: self.min_epipolar_iou,
            });
        }
        check_threshold("th_sensitivity", self.th_sensitivity)
    }

    fn accepts(&self, line: &Line3d, view1: &CameraView, view2: &CameraView) -> bool {
        line.is_finite()
            && line.is_in_front(view1)
            && line.is_in_front(view2)
            && self
                .ranges
                .map_or(true, |ranges| test_line_inside_ranges(line, &ranges))
            && line.sensitivity(view1) > self.th_sensitivity
            && line.sensitivity(view2) > self.th_sensitivity
    }
}

/// The best hypothesis for line `l` of `view_id` against all lines of its neighbors.
fn best_hypothesis(
    l: &Line2d,
    view_id: usize,
    all_lines_2d: &[Vec<Line2d>],
    views: &[CameraView],
    neighbors: &[usize],
    config: &HypothesisConfig,
) -> Line3d {
    let view = &views[view_id];
    let mut best: Option<(f64, Line3d)> = None;
    for &ng in neighbors {
        if ng == view_id {
            continue;
        }
        let ng_view = &views[ng];
        for m in &all_lines_2d[ng] {
            let iou = compute_epipolar_iou(l, view, m, ng_view);
            if iou <= 0.0 || iou < config.min_epipolar_iou {
                continue;
            }
            if best.is_some_and(|(best_iou, _)| iou <= best_iou) {
                continue;
            }
            let candidate = triangulate(l, view, m, ng_view);
            if config.accepts(&candidate, view, ng_view) {
                best = Some((iou, candidate));
            }
        }
    }
    best.map_or_else(Line3d::invalid, |(_, line)| line)
}

/// Triangulate one 3D hypothesis for every 2D line.
///
/// Each line is paired with every line of its neighbor views whose epipolar IoU reaches
/// `config.min_epipolar_iou`, and triangulated with
/// [`triangulate`](crate::triangulation::triangulate). Among the accepted candidates the
/// pair with the highest IoU wins, the earliest on ties. Lines without an accepted candidate
/// get [`Line3d::invalid`].
///
/// The output has the shape of `all_lines_2d`, as expected by
/// [`merge_to_line_tracks`](crate::merging::merge_to_line_tracks).
pub fn triangulate_hypotheses(
    all_lines_2d: &[Vec<Line2d>],
    views: &[CameraView],
    neighbors: &[Vec<usize>],
    config: &HypothesisConfig,
) -> Result<Vec<Vec<Line3d>>, LinemapError> {
    check_lengths("all_lines_2d", all_lines_2d.len(), "views", views.len())?;
    check_lengths("neighbors", neighbors.len(), "views", views.len())?;
    for &ng in neighbors.iter().flatten() {
        check_view_index(ng, views.len())?;
    }
    config.validate()?;

    let hypotheses: Vec<Vec<Line3d>> = all_lines_2d
        .par_iter()
        .enumerate()
        .map(|(view_id, lines)| {
            lines
                .iter()
                .map(|l| {
                    best_hypothesis(l, view_id, all_lines_2d, views, &neighbors[view_id], config)
                })
                .collect()
        })
        .collect();

    let num_valid = hypotheses.iter().flatten().filter(|l| l.is_finite()).count();
    let num_lines = hypotheses.iter().map(Vec::len).sum::<usize>();
    log::info!("triangulated {num_valid} of {num_lines} line hypotheses");
    Ok(hypotheses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_line, two_views};

    fn config() -> HypothesisConfig {
        HypothesisConfig {
            min_epipolar_iou: 0.5,
            th_sensitivity: 5.0,
            ranges: None,
        }
    }

    #[test]
    fn test_hypotheses_recover_lines() -> Result<(), LinemapError> {
        let (v1, v2) = two_views();
        let a = test_line();
        let b = Line3d::new(DVec3::new(-0.3, -0.6, 0.2), DVec3::new(0.2, 0.6, -0.3));
        let views = vec![v1, v2];
        let lines_2d: Vec<Vec<Line2d>> = views
            .iter()
            .map(|v| vec![a.projection(v), b.projection(v)])
            .collect();

        let hyps = triangulate_hypotheses(&lines_2d, &views, &[vec![1], vec![0]], &config())?;
        for view_hyps in &hyps {
            assert!((view_hyps[0].midpoint() - a.midpoint()).length() < 1e-6);
            assert!((view_hyps[1].midpoint() - b.midpoint()).length() < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_hypotheses_without_neighbors_are_invalid() -> Result<(), LinemapError> {
        let (v1, v2) = two_views();
        let a = test_line();
        let views = vec![v1, v2];
        let lines_2d: Vec<Vec<Line2d>> = views.iter().map(|v| vec![a.projection(v)]).collect();

        let hyps = triangulate_hypotheses(&lines_2d, &views, &[vec![], vec![0]], &config())?;
        assert!(!hyps[0][0].is_finite());
        assert!(hyps[1][0].is_finite());
        Ok(())
    }

    #[test]
    fn test_hypotheses_outside_ranges() -> Result<(), LinemapError> {
        let (v1, v2) = two_views();
        let a = test_line();
        let views = vec![v1, v2];
        let lines_2d: Vec<Vec<Line2d>> = views.iter().map(|v| vec![a.projection(v)]).collect();
        let boxed = HypothesisConfig {
            ranges: Some((DVec3::splat(10.0), DVec3::splat(20.0))),
            ..config()
        };

        let hyps = triangulate_hypotheses(&lines_2d, &views, &[vec![1], vec![0]], &boxed)?;
        assert!(hyps.iter().flatten().all(|l| !l.is_finite()));
        Ok(())
    }

    #[test]
    fn test_invalid_iou_threshold() {
        let bad = HypothesisConfig {
            min_epipolar_iou: 1.5,
            ..config()
        };
        assert!(matches!(
            triangulate_hypotheses(&[], &[], &[], &bad),
            Err(LinemapError::InvalidThreshold {
                name: "min_epipolar_iou",
                ..
            })
        ));
    }
}
