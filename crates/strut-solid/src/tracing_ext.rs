//! Tracing helpers for pipeline phases.
//!
//! Enable output by installing a subscriber in the host application:
//!
//! ```rust,ignore
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env())
//!     .init();
//! // RUST_LOG=strut_solid=debug for per-phase detail
//! ```

use std::time::Instant;
use tracing::{debug, info};

use crate::types::Mesh;

/// Logs the elapsed time of an operation when dropped.
///
/// ```rust,ignore
/// fn expensive_phase() {
///     let _timer = OperationTimer::new("expensive_phase");
///     // ... work ...
/// } // logs duration here
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
}

impl OperationTimer {
    /// Start timing a named operation.
    pub fn new(name: &'static str) -> Self {
        debug!(operation = name, "starting");
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Elapsed time so far.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        info!(
            operation = self.name,
            elapsed_ms = format!("{:.2}", self.elapsed_ms()),
            "completed"
        );
    }
}

/// Log summary statistics for a mesh.
pub fn log_mesh_stats(label: &str, mesh: &Mesh) {
    info!(
        label,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        boundary_edges = mesh.boundary_edge_count(),
        "mesh stats"
    );
}
