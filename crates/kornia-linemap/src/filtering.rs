//! Quality filters over line tracks.
//!
//! The `check_*` functions report one flag per support and leave the decision to the
//! caller. The `filter_*` functions return new track collections and never modify their
//! input.

use kornia_camera::CameraView;
use rayon::prelude::*;

use crate::error::{check_threshold, check_view_index, LinemapError};
use crate::linker::{compute_angle, compute_overlap, compute_perp_dist_oneway};
use crate::LineTrack;

fn check_support_views(track: &LineTrack, views: &[CameraView]) -> Result<(), LinemapError> {
    for support in &track.supports {
        check_view_index(support.view_id, views.len())?;
    }
    Ok(())
}

/// Whether each support of `track` is consistent with the reprojection of its representative
/// line.
///
/// A support passes when the representative lies in front of its camera, and the projection
/// deviates from the observed 2D line by at most `th_angular2d` degrees and `th_perp2d`
/// pixels. The perpendicular distance is measured from the observed endpoints to the
/// projected line.
pub fn check_reprojection(
    track: &LineTrack,
    views: &[CameraView],
    th_angular2d: f64,
    th_perp2d: f64,
) -> Result<Vec<bool>, LinemapError> {
    check_threshold("th_angular2d", th_angular2d)?;
    check_threshold("th_perp2d", th_perp2d)?;
    check_support_views(track, views)?;

    let line = &track.line;
    Ok(track
        .supports
        .iter()
        .map(|support| {
            let view = &views[support.view_id];
            if !line.is_finite() || !line.is_in_front(view) {
                return false;
            }
            let proj = line.projection(view);
            compute_angle(&proj, &support.line2d) <= th_angular2d
                && compute_perp_dist_oneway(&proj, &support.line2d) <= th_perp2d
        })
        .collect())
}

/// Remove the supports failing [`check_reprojection`].
///
/// A track with more than `num_outliers` failing supports is discarded entirely, as is a
/// track left with fewer than two supports. The representative line is unchanged, so
/// filtering an already filtered collection returns it as is.
pub fn filter_supporting_lines(
    tracks: &[LineTrack],
    views: &[CameraView],
    th_angular2d: f64,
    th_perp2d: f64,
    num_outliers: usize,
) -> Result<Vec<LineTrack>, LinemapError> {
    let filtered: Vec<Option<LineTrack>> = tracks
        .par_iter()
        .map(|track| -> Result<Option<LineTrack>, LinemapError> {
            let flags = check_reprojection(track, views, th_angular2d, th_perp2d)?;
            let num_failing = flags.iter().filter(|&&ok| !ok).count();
            if num_failing > num_outliers {
                return Ok(None);
            }
            let supports: Vec<_> = track
                .supports
                .iter()
                .zip(&flags)
                .filter(|(_, ok)| **ok)
                .map(|(s, _)| *s)
                .collect();
            if supports.len() < 2 {
                return Ok(None);
            }
            Ok(Some(LineTrack::new(track.line, supports)))
        })
        .collect::<Result<_, LinemapError>>()?;

    let out: Vec<LineTrack> = filtered.into_iter().flatten().collect();
    log::debug!(
        "supporting line filter kept {} of {} tracks",
        out.len(),
        tracks.len()
    );
    Ok(out)
}

/// Whether each support observes the representative line from a well conditioned angle.
///
/// A support passes when the angle between its viewing ray to the line midpoint and the line
/// direction is strictly greater than `th_angular3d` degrees.
pub fn check_sensitivity(
    track: &LineTrack,
    views: &[CameraView],
    th_angular3d: f64,
) -> Result<Vec<bool>, LinemapError> {
    check_threshold("th_angular3d", th_angular3d)?;
    check_support_views(track, views)?;

    Ok(track
        .supports
        .iter()
        .map(|s| track.line.sensitivity(&views[s.view_id]) > th_angular3d)
        .collect())
}

/// Keep the tracks with at least `min_support_ns` supports passing [`check_sensitivity`].
///
/// Tracks are kept or dropped whole.
pub fn filter_tracks_by_sensitivity(
    tracks: &[LineTrack],
    views: &[CameraView],
    th_angular3d: f64,
    min_support_ns: usize,
) -> Result<Vec<LineTrack>, LinemapError> {
    keep_tracks(tracks, "sensitivity", min_support_ns, |track| {
        check_sensitivity(track, views, th_angular3d)
    })
}

/// Overlap ratio of each support: the fraction of the observed 2D line covered by the
/// projection of the representative line. Zero when the line is behind the camera.
pub fn compute_overlap_ratios(
    track: &LineTrack,
    views: &[CameraView],
) -> Result<Vec<f64>, LinemapError> {
    check_support_views(track, views)?;

    let line = &track.line;
    Ok(track
        .supports
        .iter()
        .map(|s| {
            let view = &views[s.view_id];
            if !line.is_finite() || !line.is_in_front(view) {
                return 0.0;
            }
            compute_overlap(&s.line2d, &line.projection(view))
        })
        .collect())
}

/// Whether the overlap ratio of each support is at least `th_overlap`.
pub fn check_overlap(
    track: &LineTrack,
    views: &[CameraView],
    th_overlap: f64,
) -> Result<Vec<bool>, LinemapError> {
    check_threshold("th_overlap", th_overlap)?;
    Ok(compute_overlap_ratios(track, views)?
        .into_iter()
        .map(|ratio| ratio >= th_overlap)
        .collect())
}

/// Keep the tracks with at least `min_support_ns` supports passing [`check_overlap`].
pub fn filter_tracks_by_overlap(
    tracks: &[LineTrack],
    views: &[CameraView],
    th_overlap: f64,
    min_support_ns: usize,
) -> Result<Vec<LineTrack>, LinemapError> {
    keep_tracks(tracks, "overlap", min_support_ns, |track| {
        check_overlap(track, views, th_overlap)
    })
}

fn keep_tracks<F>(
    tracks: &[LineTrack],
    name: &str,
    min_support_ns: usize,
    check: F,
) -> Result<Vec<LineTrack>, LinemapError>
where
    F: Fn(&LineTrack) -> Result<Vec<bool>, LinemapError> + Send + Sync,
{
    let kept: Vec<Option<LineTrack>> = tracks
        .par_iter()
        .map(|track| -> Result<Option<LineTrack>, LinemapError> {
            let num_passing = check(track)?.into_iter().filter(|&ok| ok).count();
            Ok((num_passing >= min_support_ns).then(|| track.clone()))
        })
        .collect::<Result<_, LinemapError>>()?;

    let out: Vec<LineTrack> = kept.into_iter().flatten().collect();
    log::debug!("{} filter kept {} of {} tracks", name, out.len(), tracks.len());
    Ok(out)
}
