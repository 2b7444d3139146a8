use thiserror::Error;

/// Error types for the line mapping pipeline.
///
/// Only malformed structural input is an error. Geometric edge cases such as degenerate
/// triangulations or failing thresholds are reported through predicates and filtered
/// collections instead.
#[derive(Debug, Error)]
pub enum LinemapError {
    /// Two per-view collections disagree in length.
    #[error("Mismatched array lengths: {left_name} ({left_len}) != {right_name} ({right_len})")]
    MismatchedLengths {
        /// Label for the left-hand collection.
        left_name: &'static str,
        /// Length of the left-hand collection.
        left_len: usize,
        /// Label for the right-hand collection.
        right_name: &'static str,
        /// Length of the right-hand collection.
        right_len: usize,
    },

    /// A view index does not refer to any of the provided views.
    #[error("View index {index} is out of range for {num_views} views")]
    ViewIndexOutOfRange {
        /// The offending view index.
        index: usize,
        /// Number of available views.
        num_views: usize,
    },

    /// A line index does not refer to any line of its view.
    #[error("Line {line_id} is out of range for view {view_id} with {num_lines} lines")]
    LineIndexOutOfRange {
        /// View the line belongs to.
        view_id: usize,
        /// The offending line index.
        line_id: usize,
        /// Number of lines in the view.
        num_lines: usize,
    },

    /// A view has a different number of 2D lines and 3D hypotheses.
    #[error("View {view_id} has {num_lines_2d} 2D lines but {num_lines_3d} 3D hypotheses")]
    LinesPerViewMismatch {
        /// The offending view.
        view_id: usize,
        /// Number of 2D lines in the view.
        num_lines_2d: usize,
        /// Number of 3D hypotheses in the view.
        num_lines_3d: usize,
    },

    /// A threshold is not finite, negative, or outside its valid range.
    #[error("Invalid threshold {name}: {value}")]
    InvalidThreshold {
        /// Name of the threshold.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A line linker was configured with every criterion disabled.
    #[error("Line linker needs at least one enabled criterion")]
    NoCriterionEnabled,
}

/// Ensure two collections have the same length.
pub(crate) fn check_lengths(
    left_name: &'static str,
    left_len: usize,
    right_name: &'static str,
    right_len: usize,
) -> Result<(), LinemapError> {
    if left_len != right_len {
        return Err(LinemapError::MismatchedLengths {
            left_name,
            left_len,
            right_name,
            right_len,
        });
    }
    Ok(())
}

/// Ensure a view index refers to one of `num_views` views.
pub(crate) fn check_view_index(index: usize, num_views: usize) -> Result<(), LinemapError> {
    if index >= num_views {
        return Err(LinemapError::ViewIndexOutOfRange { index, num_views });
    }
    Ok(())
}

/// Ensure a threshold is finite and non-negative.
pub(crate) fn check_threshold(name: &'static str, value: f64) -> Result<(), LinemapError> {
    if !value.is_finite() || value < 0.0 {
        return Err(LinemapError::InvalidThreshold { name, value });
    }
    Ok(())
}
