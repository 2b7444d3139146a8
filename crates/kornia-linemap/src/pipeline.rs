//! End-to-end line mapping: merging, filtering and remerging.

use kornia_camera::CameraView;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{check_lengths, check_threshold, LinemapError};
use crate::filtering::{
    filter_supporting_lines, filter_tracks_by_overlap, filter_tracks_by_sensitivity,
};
use crate::hypothesis::{triangulate_hypotheses, HypothesisConfig};
use crate::line::set_uncertainty;
use crate::merging::{merge_to_line_tracks, remerge_line_tracks_until_stable};
use crate::{
    Line2d, Line3d, LineGraph, LineLinker, LineLinker3d, LineLinker3dConfig, LineLinkerConfig,
    LineTrack,
};

/// Thresholds of the track quality filters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilteringConfig {
    /// Maximum reprojection angle in degrees.
    pub th_angular2d: f64,
    /// Maximum reprojection perpendicular distance in pixels.
    pub th_perp2d: f64,
    /// Minimum sensitivity angle in degrees.
    pub th_angular3d: f64,
    /// Minimum overlap ratio between the reprojection and an observation.
    pub th_overlap: f64,
    /// Minimum number of supports passing the sensitivity and overlap filters.
    pub min_support_ns: usize,
    /// Number of failing supports a track may lose before it is discarded.
    pub num_outliers: usize,
}

/// Configuration of a [`LineMapper`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineMapperConfig {
    /// Linkers of the merging pass.
    pub linker: LineLinkerConfig,
    /// Linker of the remerging pass.
    pub remerge_linker_3d: LineLinker3dConfig,
    /// Track filters.
    pub filtering: FilteringConfig,
    /// Upper bound on the number of remerging passes.
    pub max_remerge_iterations: usize,
    /// Pixel noise used to assign uncertainties to the 3D hypotheses before merging.
    #[serde(default)]
    pub var2d: Option<f64>,
}

/// Runs the line mapping stages in order.
///
/// # Example
///
/// ```no_run
/// use kornia_linemap::pipeline::{LineMapper, LineMapperConfig};
///
/// let json = std::fs::read_to_string("linemap.json").unwrap();
/// let config: LineMapperConfig = serde_json::from_str(&json).unwrap();
/// let mapper = LineMapper::new(config).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct LineMapper {
    config: LineMapperConfig,
    linker: LineLinker,
    remerge_linker: LineLinker3d,
}

impl LineMapper {
    /// Create a mapper, validating every threshold of `config`.
    pub fn new(config: LineMapperConfig) -> Result<Self, LinemapError> {
        let linker = LineLinker::from_config(&config.linker)?;
        let remerge_linker = LineLinker3d::new(config.remerge_linker_3d)?;

        let filtering = &config.filtering;
        check_threshold("th_angular2d", filtering.th_angular2d)?;
        check_threshold("th_perp2d", filtering.th_perp2d)?;
        check_threshold("th_angular3d", filtering.th_angular3d)?;
        check_threshold("th_overlap", filtering.th_overlap)?;
        if let Some(var2d) = config.var2d {
            check_threshold("var2d", var2d)?;
        }

        Ok(Self {
            config,
            linker,
            remerge_linker,
        })
    }

    /// The mapper configuration.
    pub fn config(&self) -> &LineMapperConfig {
        &self.config
    }

    /// Build line tracks from 2D lines and their 3D hypotheses.
    ///
    /// Tracks are merged with [`merge_to_line_tracks`], cleaned of inconsistent supports,
    /// filtered by sensitivity and overlap, remerged until their number is stable and
    /// finally cleaned once more.
    pub fn run(
        &self,
        graph: &LineGraph,
        all_lines_2d: &[Vec<Line2d>],
        views: &[CameraView],
        all_lines_3d: &[Vec<Line3d>],
        neighbors: &[Vec<usize>],
    ) -> Result<Vec<LineTrack>, LinemapError> {
        check_lengths("all_lines_3d", all_lines_3d.len(), "views", views.len())?;
        let f = &self.config.filtering;

        let lines_3d: Vec<Vec<Line3d>> = match self.config.var2d {
            Some(var2d) => all_lines_3d
                .par_iter()
                .zip(views)
                .map(|(lines, view)| set_uncertainty(lines, view, var2d))
                .collect(),
            None => all_lines_3d.to_vec(),
        };

        let tracks = merge_to_line_tracks(
            graph,
            all_lines_2d,
            views,
            &lines_3d,
            neighbors,
            &self.linker,
        )?;

        let tracks =
            filter_supporting_lines(&tracks, views, f.th_angular2d, f.th_perp2d, f.num_outliers)?;
        log::info!("{} tracks after the reprojection filter", tracks.len());

        let tracks = filter_tracks_by_sensitivity(&tracks, views, f.th_angular3d, f.min_support_ns)?;
        log::info!("{} tracks after the sensitivity filter", tracks.len());

        let tracks = filter_tracks_by_overlap(&tracks, views, f.th_overlap, f.min_support_ns)?;
        log::info!("{} tracks after the overlap filter", tracks.len());

        let tracks = remerge_line_tracks_until_stable(
            tracks,
            &self.remerge_linker,
            f.num_outliers,
            self.config.max_remerge_iterations,
        );

        let tracks =
            filter_supporting_lines(&tracks, views, f.th_angular2d, f.th_perp2d, f.num_outliers)?;
        log::info!("{} line tracks reconstructed", tracks.len());
        Ok(tracks)
    }

    /// Triangulate hypotheses with [`triangulate_hypotheses`] and [`run`](Self::run) the
    /// pipeline on them, without a prior graph.
    pub fn run_with_triangulation(
        &self,
        all_lines_2d: &[Vec<Line2d>],
        views: &[CameraView],
        neighbors: &[Vec<usize>],
        hypotheses: &HypothesisConfig,
    ) -> Result<Vec<LineTrack>, LinemapError> {
        let all_lines_3d = triangulate_hypotheses(all_lines_2d, views, neighbors, hypotheses)?;
        self.run(
            &LineGraph::new(),
            all_lines_2d,
            views,
            &all_lines_3d,
            neighbors,
        )
    }
}
