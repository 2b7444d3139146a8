#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Kornia Linemap
//!
//! Reconstruction of persistent 3D line segments, or line tracks, from 2D line detections
//! observed by many calibrated views.
//!
//! ## Key Features
//!
//! - **Triangulation**: point, endpoint, plane intersection and direction constrained line
//!   triangulation, with epipolar IoU scoring of line pairs
//! - **Linking**: conjunctive angle, perpendicular distance and overlap rules in 2D and 3D
//! - **Merging**: clustering of consistent observations into tracks over a line graph
//! - **Filtering**: reprojection, sensitivity and overlap filters with outlier budgets
//! - **Remerging**: union of tracks describing the same physical line
//!
//! ## Example: Merging two views
//!
//! ```rust
//! use glam::{DMat3, DVec3};
//! use kornia_camera::{Camera, CameraModelId, CameraPose, CameraView};
//! use kornia_linemap::{
//!     merging::merge_to_line_tracks, Line3d, LineGraph, LineLinker, LineLinker2d,
//!     LineLinker2dConfig, LineLinker3d, LineLinker3dConfig,
//! };
//!
//! let cam = Camera::new(CameraModelId::SimplePinhole, vec![500.0, 320.0, 240.0], (640, 480))?;
//! let views = vec![
//!     CameraView::new(cam.clone(), CameraPose::from_center(&DMat3::IDENTITY, DVec3::new(0.0, 0.0, -5.0))),
//!     CameraView::new(cam, CameraPose::from_center(&DMat3::IDENTITY, DVec3::new(1.0, 0.0, -5.0))),
//! ];
//!
//! let line = Line3d::new(DVec3::new(-0.5, -0.5, 0.0), DVec3::new(0.5, 0.5, 0.2));
//! let lines_2d: Vec<_> = views.iter().map(|v| vec![line.projection(v)]).collect();
//! let lines_3d = vec![vec![line]; 2];
//!
//! let linker = LineLinker::new(
//!     LineLinker2d::new(LineLinker2dConfig {
//!         th_angle: 8.0,
//!         th_perp: 5.0,
//!         th_overlap: 0.1,
//!         use_angle: true,
//!         use_perp: true,
//!         use_overlap: true,
//!     })?,
//!     LineLinker3d::new(LineLinker3dConfig {
//!         th_angle: 10.0,
//!         th_perp: 0.05,
//!         th_overlap: 0.01,
//!         use_angle: true,
//!         use_perp: true,
//!         use_overlap: true,
//!         use_scaleinv: false,
//!     })?,
//! );
//!
//! let tracks = merge_to_line_tracks(
//!     &LineGraph::new(),
//!     &lines_2d,
//!     &views,
//!     &lines_3d,
//!     &[vec![1], vec![0]],
//!     &linker,
//! )?;
//! assert_eq!(tracks.len(), 1);
//! assert_eq!(tracks[0].count_views(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Representative line selection and least squares line fitting.
pub mod aggregate;

/// Error types for the line mapping pipeline.
pub mod error;

/// Track quality filters.
///
/// Reprojection, sensitivity and overlap checks, and the filters built on them.
pub mod filtering;

/// Arena graph over line observations.
pub mod graph;

/// Triangulation of one 3D hypothesis per 2D line.
pub mod hypothesis;

/// 2D and 3D line segments.
pub mod line;

/// Line linking metrics and rules.
pub mod linker;

/// Track merging and remerging.
pub mod merging;

/// End-to-end pipeline and its configuration.
pub mod pipeline;

/// Line tracks and their supports.
pub mod track;

/// Two-view triangulation primitives.
pub mod triangulation;

/// Disjoint-set forest used for component extraction.
pub mod union_find;

#[cfg(test)]
mod testing;

pub use error::LinemapError;
pub use graph::{LineGraph, LineNode};
pub use line::{Line2d, Line3d};
pub use linker::{
    LineLinker, LineLinker2d, LineLinker2dConfig, LineLinker3d, LineLinker3dConfig,
    LineLinkerConfig,
};
pub use pipeline::{FilteringConfig, LineMapper, LineMapperConfig};
pub use track::{LineTrack, TrackSupport};
