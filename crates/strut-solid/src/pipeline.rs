//! The solidification pipeline.
//!
//! Phases run in strict order — canonicalize, assemble graph, solve offsets,
//! build sleeves, sharp-node fix, hulls and end caps, final assembly — and
//! each phase only reads what the previous ones finalized. Per-node and
//! per-strut failures stay local: the pipeline finishes with whatever
//! geometry it could build and reports the casualties.

use rayon::prelude::*;
use tracing::{info, info_span};

use crate::assemble::assemble;
use crate::canonical::canonicalize;
use crate::curve::StrutCurve;
use crate::endcap::build_end_cap;
use crate::error::{SolidError, SolidResult};
use crate::graph::{LatticeGraph, RadiusSpec};
use crate::hull::build_node_hull;
use crate::offset::{solve_offsets, SolverParams};
use crate::sleeve::build_sleeves;
use crate::tracing_ext::{log_mesh_stats, OperationTimer};
use crate::types::Mesh;

/// Parameters for the whole solidification pipeline.
///
/// # Example
///
/// ```
/// use strut_solid::SolidifyParams;
///
/// // Defaults are tuned for unit-scale lattices
/// let params = SolidifyParams::default();
///
/// // Or customize
/// let params = SolidifyParams::default()
///     .with_sides(12)
///     .with_tolerance(1e-5);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "pipeline-config",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct SolidifyParams {
    /// Perimeter vertices per cross-section ring.
    ///
    /// Default: `8`
    pub sides: usize,

    /// Geometric tolerance for coincidence and intersection tests, in model
    /// units. Also the canonicalization weld distance.
    ///
    /// Default: `1e-6`
    pub tolerance: f64,

    /// Document epsilon: curves shorter than `max(tolerance, 100 ·
    /// model_epsilon)` are dropped as degenerate.
    ///
    /// Default: `1e-9`
    pub model_epsilon: f64,

    /// Offset solver tuning.
    pub solver: SolverParams,
}

impl Default for SolidifyParams {
    fn default() -> Self {
        Self {
            sides: 8,
            tolerance: 1e-6,
            model_epsilon: 1e-9,
            solver: SolverParams::default(),
        }
    }
}

impl SolidifyParams {
    /// Set the ring side count (minimum 3).
    pub fn with_sides(mut self, sides: usize) -> Self {
        self.sides = sides.max(3);
        self
    }

    /// Set the geometric tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the solver parameters.
    pub fn with_solver(mut self, solver: SolverParams) -> Self {
        self.solver = solver;
        self
    }
}

/// Diagnostics from a solidification run.
///
/// Everything here is informational; the only hard failures are surfaced as
/// [`SolidError`] from [`solidify`] itself.
#[derive(Debug, Clone, Default)]
pub struct SolidifyReport {
    /// Canonical node count.
    pub nodes: usize,
    /// Canonical strut count.
    pub struts: usize,
    /// Input curves dropped (invalid + degenerate + duplicate).
    pub dropped_curves: usize,
    /// Nodes where the offset solver hit its budget; the mesh may overlap
    /// locally there.
    pub unconverged_nodes: Vec<usize>,
    /// Struts skipped because their plates overlapped.
    pub skipped_struts: Vec<usize>,
    /// Nodes that produced no hull or cap (local failures).
    pub failed_nodes: Vec<usize>,
    /// Planar nodes closed with a flat cap instead of a hull.
    pub planar_fallback_nodes: Vec<usize>,
    /// Sharp nodes that received a synthetic plate.
    pub sharp_nodes: usize,
    /// Vertices merged in the final weld.
    pub welded_vertices: usize,
}

impl SolidifyReport {
    /// True when nothing was dropped, skipped, or left unconverged.
    pub fn is_clean(&self) -> bool {
        self.dropped_curves == 0
            && self.unconverged_nodes.is_empty()
            && self.skipped_struts.is_empty()
            && self.failed_nodes.is_empty()
            && self.planar_fallback_nodes.is_empty()
    }
}

/// Result of a solidification run.
#[derive(Debug)]
pub struct SolidifyResult {
    /// The merged output mesh, watertight except at reported trouble spots.
    pub mesh: Mesh,
    /// Diagnostics.
    pub report: SolidifyReport,
}

/// Solidify a strut network into one triangle mesh.
///
/// # Errors
///
/// Fails only on input contract violations: an empty network after
/// filtering, non-positive radii, or a pipeline that produced no geometry at
/// all. Geometric edge cases degrade locally and show up in the report.
pub fn solidify(
    curves: &[StrutCurve],
    radius: &RadiusSpec,
    params: &SolidifyParams,
) -> SolidResult<SolidifyResult> {
    let _span = info_span!("solidify", curves = curves.len()).entered();
    let _timer = OperationTimer::new("solidify");

    // Phase 1: canonicalize.
    let network = canonicalize(curves, params.tolerance, params.model_epsilon);
    if network.struts.is_empty() {
        return Err(SolidError::empty_network(format!(
            "{} input curves, {} dropped",
            curves.len(),
            network.dropped_total()
        )));
    }

    // Phase 2: graph assembly (validates radii).
    let mut graph = LatticeGraph::build(&network, radius)?;

    let mut report = SolidifyReport {
        nodes: graph.nodes.len(),
        struts: graph.struts.len(),
        dropped_curves: network.dropped_total(),
        ..Default::default()
    };

    // Phase 3: offsets. The solver is the single writer of `Plate::offset`;
    // after this barrier the graph is read-only apart from plate rings.
    let offset_report = solve_offsets(&mut graph, &params.solver, params.tolerance);
    report.unconverged_nodes = offset_report.unconverged_nodes.clone();

    // Phase 4: sleeves (fills plate rings).
    let sleeves = build_sleeves(&mut graph, params.sides);
    report.skipped_struts = sleeves.skipped.clone();

    // Phase 5: sharp-node plates, appended before any hulling starts.
    report.sharp_nodes = graph.append_sharp_plates(params.sides, params.solver.sharp_angle_deg);

    // Phase 6: hulls (degree ≥ 2) and end caps (degree 1), independently per
    // node.
    let node_meshes: Vec<(usize, Option<Mesh>, bool)> = (0..graph.nodes.len())
        .into_par_iter()
        .map(|node_idx| match graph.nodes[node_idx].degree() {
            0 => (node_idx, None, false),
            1 => (node_idx, build_end_cap(&graph, node_idx), false),
            _ => match build_node_hull(&graph, node_idx, params.tolerance) {
                Some(hull) => (node_idx, Some(hull.mesh), hull.planar_fallback),
                None => (node_idx, None, false),
            },
        })
        .collect();

    let mut parts: Vec<Mesh> = sleeves.meshes.into_iter().flatten().collect();
    for (node_idx, mesh, planar) in node_meshes {
        if planar {
            report.planar_fallback_nodes.push(node_idx);
        }
        match mesh {
            Some(mesh) => parts.push(mesh),
            None => {
                if graph.nodes[node_idx].degree() > 0 {
                    report.failed_nodes.push(node_idx);
                }
            }
        }
    }

    if parts.is_empty() {
        return Err(SolidError::empty_output(format!(
            "{} struts and {} nodes all failed locally",
            report.struts, report.nodes
        )));
    }

    // Phase 7: merge, weld, orient, normals.
    let (mesh, stats) = assemble(parts, params.tolerance);
    report.welded_vertices = stats.welded_vertices;

    log_mesh_stats("solidified mesh", &mesh);
    if !report.is_clean() {
        info!(
            dropped = report.dropped_curves,
            unconverged = report.unconverged_nodes.len(),
            skipped = report.skipped_struts.len(),
            failed = report.failed_nodes.len(),
            "solidification finished with local degradations"
        );
    }

    Ok(SolidifyResult { mesh, report })
}
