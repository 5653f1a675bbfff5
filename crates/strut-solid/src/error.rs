//! Error types for the solidification pipeline.
//!
//! Only genuine input contract violations surface as errors. Expected
//! geometric edge cases — degenerate curves, solver non-convergence, planar
//! nodes — are filtered or reported through [`crate::SolidifyReport`] and
//! never raise a [`SolidError`].
//!
//! Each error carries a machine-readable code in the format `SOLID-XXXX`:
//! - `SOLID-1xxx`: input errors (curves, radii)
//! - `SOLID-2xxx`: graph/solver contract violations
//! - `SOLID-3xxx`: meshing errors

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for solidification operations.
pub type SolidResult<T> = Result<T, SolidError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// SOLID-1001: network is empty after canonicalization
    EmptyNetwork = 1001,
    /// SOLID-1002: non-positive strut radius
    InvalidRadius = 1002,
    /// SOLID-1003: curve is invalid (NaN coordinates or zero-length polyline)
    InvalidCurve = 1003,
    /// SOLID-2001: per-node radius table does not match the node count
    RadiusCountMismatch = 2001,
    /// SOLID-3001: assembled mesh is empty
    EmptyOutput = 3001,
}

impl ErrorCode {
    /// Returns the error code as a string in the format `SOLID-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::EmptyNetwork => "SOLID-1001",
            ErrorCode::InvalidRadius => "SOLID-1002",
            ErrorCode::InvalidCurve => "SOLID-1003",
            ErrorCode::RadiusCountMismatch => "SOLID-2001",
            ErrorCode::EmptyOutput => "SOLID-3001",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during network solidification.
#[derive(Debug, Error, Diagnostic)]
pub enum SolidError {
    /// No usable struts survived canonicalization.
    #[error("network is empty: {details}")]
    #[diagnostic(
        code(solid::input::empty),
        help(
            "All input curves were dropped as degenerate or duplicate. Check the tolerance against the model scale."
        )
    )]
    EmptyNetwork { details: String },

    /// A node was assigned a non-positive radius.
    #[error("invalid radius {radius} at node {node_index}")]
    #[diagnostic(
        code(solid::input::radius),
        help("Strut radii must be strictly positive. Check the radius specification.")
    )]
    InvalidRadius { node_index: usize, radius: f64 },

    /// An input curve carries NaN/infinite coordinates.
    #[error("invalid curve at input index {curve_index}: {details}")]
    #[diagnostic(
        code(solid::input::curve),
        help("Curve endpoints and control points must be finite.")
    )]
    InvalidCurve { curve_index: usize, details: String },

    /// A per-node radius table has the wrong length.
    #[error("radius table has {provided} entries but the network has {expected} nodes")]
    #[diagnostic(
        code(solid::graph::radius_count),
        help("Provide one radius per canonical node, or use a constant/function radius.")
    )]
    RadiusCountMismatch { provided: usize, expected: usize },

    /// The pipeline produced no geometry at all.
    #[error("solidification produced an empty mesh: {details}")]
    #[diagnostic(
        code(solid::mesh::empty),
        help("Every node and strut failed locally; inspect the report counters and logs.")
    )]
    EmptyOutput { details: String },
}

impl SolidError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            SolidError::EmptyNetwork { .. } => ErrorCode::EmptyNetwork,
            SolidError::InvalidRadius { .. } => ErrorCode::InvalidRadius,
            SolidError::InvalidCurve { .. } => ErrorCode::InvalidCurve,
            SolidError::RadiusCountMismatch { .. } => ErrorCode::RadiusCountMismatch,
            SolidError::EmptyOutput { .. } => ErrorCode::EmptyOutput,
        }
    }

    // Constructor helpers for common error patterns

    /// Create an EmptyNetwork error.
    pub fn empty_network(details: impl Into<String>) -> Self {
        SolidError::EmptyNetwork {
            details: details.into(),
        }
    }

    /// Create an InvalidRadius error.
    pub fn invalid_radius(node_index: usize, radius: f64) -> Self {
        SolidError::InvalidRadius { node_index, radius }
    }

    /// Create an InvalidCurve error.
    pub fn invalid_curve(curve_index: usize, details: impl Into<String>) -> Self {
        SolidError::InvalidCurve {
            curve_index,
            details: details.into(),
        }
    }

    /// Create a RadiusCountMismatch error.
    pub fn radius_count_mismatch(provided: usize, expected: usize) -> Self {
        SolidError::RadiusCountMismatch { provided, expected }
    }

    /// Create an EmptyOutput error.
    pub fn empty_output(details: impl Into<String>) -> Self {
        SolidError::EmptyOutput {
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = SolidError::invalid_radius(3, -0.5);
        assert_eq!(err.code(), ErrorCode::InvalidRadius);
        assert_eq!(err.code().as_str(), "SOLID-1002");
    }

    #[test]
    fn test_error_display() {
        let err = SolidError::invalid_radius(3, -0.5);
        let display = format!("{}", err);
        assert!(display.contains("node 3"));
        assert!(display.contains("-0.5"));

        let err = SolidError::radius_count_mismatch(4, 9);
        let display = format!("{}", err);
        assert!(display.contains("4 entries"));
        assert!(display.contains("9 nodes"));
    }
}
