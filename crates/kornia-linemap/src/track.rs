use serde::{Deserialize, Serialize};

use crate::{Line2d, Line3d};

/// One observation supporting a track: a 2D line of a view and the 3D hypothesis
/// triangulated for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSupport {
    /// Index of the view.
    pub view_id: usize,
    /// Index of the 2D line within the view.
    pub line_id: usize,
    /// The observed 2D line.
    pub line2d: Line2d,
    /// The 3D hypothesis contributed by this observation.
    pub line3d: Line3d,
}

/// A reconstructed 3D line and the observations supporting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineTrack {
    /// Representative 3D line.
    pub line: Line3d,
    /// Supporting observations.
    pub supports: Vec<TrackSupport>,
}

impl LineTrack {
    /// Create a track.
    pub fn new(line: Line3d, supports: Vec<TrackSupport>) -> Self {
        Self { line, supports }
    }

    /// Number of supporting 2D lines.
    pub fn count_lines(&self) -> usize {
        self.supports.len()
    }

    /// Number of distinct supporting views.
    pub fn count_views(&self) -> usize {
        self.sorted_view_ids().len()
    }

    /// View index of every support, in support order.
    pub fn view_ids(&self) -> Vec<usize> {
        self.supports.iter().map(|s| s.view_id).collect()
    }

    /// Distinct supporting view indices, ascending.
    pub fn sorted_view_ids(&self) -> Vec<usize> {
        let mut ids = self.view_ids();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Observed 2D lines, in support order.
    pub fn line2d_list(&self) -> Vec<Line2d> {
        self.supports.iter().map(|s| s.line2d).collect()
    }

    /// Contributed 3D hypotheses, in support order.
    pub fn line3d_list(&self) -> Vec<Line3d> {
        self.supports.iter().map(|s| s.line3d).collect()
    }

    /// Supports observed in a given view.
    pub fn supports_in_view(&self, view_id: usize) -> impl Iterator<Item = &TrackSupport> {
        self.supports.iter().filter(move |s| s.view_id == view_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DVec2, DVec3};

    fn support(view_id: usize, line_id: usize) -> TrackSupport {
        TrackSupport {
            view_id,
            line_id,
            line2d: Line2d::new(DVec2::ZERO, DVec2::ONE),
            line3d: Line3d::new(DVec3::ZERO, DVec3::ONE),
        }
    }

    #[test]
    fn test_counts() {
        let track = LineTrack::new(
            Line3d::new(DVec3::ZERO, DVec3::X),
            vec![support(3, 0), support(1, 2), support(3, 4)],
        );
        assert_eq!(track.count_lines(), 3);
        assert_eq!(track.count_views(), 2);
        assert_eq!(track.sorted_view_ids(), vec![1, 3]);
        assert_eq!(track.supports_in_view(3).count(), 2);
    }

    #[test]
    fn test_json_roundtrip() -> Result<(), serde_json::Error> {
        let track = LineTrack::new(
            Line3d::new(DVec3::ZERO, DVec3::X).with_uncertainty(0.25),
            vec![support(0, 1), support(2, 0)],
        );
        let json = serde_json::to_string(&track)?;
        let back: LineTrack = serde_json::from_str(&json)?;
        assert_eq!(back, track);
        Ok(())
    }
}
