//! Node-local offset solving.
//!
//! At every multi-strut node each strut's end cap ("plate") must retreat far
//! enough from the node center that no two plate circles cut each other;
//! otherwise the node hull self-intersects. The solver walks plates outward
//! along their curves in fixed increments until every pair of circles is
//! clear, then stores the retreat distance (with a safety margin) on the
//! plates.
//!
//! Convergence is not guaranteed for degenerate geometry (e.g. fully
//! collinear struts with mismatched radii), so the iteration count is a
//! configurable budget and running out of it is a soft failure reported per
//! node, never an error.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::graph::LatticeGraph;

/// Tuning parameters for the offset solver.
///
/// The defaults reproduce the behavior the rest of the pipeline is calibrated
/// against; they are heuristic, not derived, which is why each one is
/// exposed instead of hard-coded.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "pipeline-config",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct SolverParams {
    /// Iteration budget per node before giving up with a soft failure.
    ///
    /// Default: `500`
    pub max_iterations: usize,

    /// Each flagged plate travels by `initial_offset / travel_divisor` per
    /// iteration.
    ///
    /// Default: `10.0`
    pub travel_divisor: f64,

    /// Converged offsets are scaled by this factor before being stored, so
    /// hull faces clear the sleeve walls.
    ///
    /// Default: `1.05`
    pub safety_margin: f64,

    /// Minimum angle (degrees) between every plate normal and the negated
    /// normal sum for a node to count as sharp (all struts in one
    /// half-space).
    ///
    /// Default: `90.0`
    pub sharp_angle_deg: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            travel_divisor: 10.0,
            safety_margin: 1.05,
            sharp_angle_deg: 90.0,
        }
    }
}

impl SolverParams {
    /// Set the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the travel divisor.
    pub fn with_travel_divisor(mut self, travel_divisor: f64) -> Self {
        self.travel_divisor = travel_divisor.max(1.0);
        self
    }

    /// Set the safety margin.
    pub fn with_safety_margin(mut self, safety_margin: f64) -> Self {
        self.safety_margin = safety_margin.max(1.0);
        self
    }
}

/// Outcome of the offset phase.
#[derive(Debug, Clone, Default)]
pub struct OffsetReport {
    /// Nodes the solver ran on (degree ≥ 2).
    pub solved_nodes: usize,
    /// Nodes that hit the iteration budget; their plates carry best-effort
    /// offsets and the finished mesh may have minor overlap there.
    pub unconverged_nodes: Vec<usize>,
    /// Largest iteration count any node needed.
    pub max_iterations_used: usize,
}

impl OffsetReport {
    /// Whether every node converged.
    #[inline]
    pub fn all_converged(&self) -> bool {
        self.unconverged_nodes.is_empty()
    }
}

/// Does the circle (center, unit normal, radius) cut or touch the plane
/// (point, unit normal)?
///
/// The extremal signed distance of circle points from the plane is
/// `n·(c − p) ± r·sqrt(1 − (n·m)²)`, so the circle is secant or tangent
/// exactly when the center's distance is within that amplitude. `tolerance`
/// widens the tangent case so near-touching configurations keep traveling.
pub fn circle_intersects_plane(
    circle_center: &Point3<f64>,
    circle_normal: &Vector3<f64>,
    radius: f64,
    plane_point: &Point3<f64>,
    plane_normal: &Vector3<f64>,
    tolerance: f64,
) -> bool {
    let center_dist = plane_normal.dot(&(circle_center - plane_point)).abs();
    let cos = plane_normal.dot(circle_normal).clamp(-1.0, 1.0);
    let amplitude = radius * (1.0 - cos * cos).max(0.0).sqrt();
    center_dist <= amplitude + tolerance
}

/// Per-node solver state: one entry per incident strut.
struct PlateWalk {
    plate: usize,
    curve: crate::curve::StrutCurve,
    /// Current normalized curve parameter.
    t: f64,
    /// Fixed per-iteration increment (initial parameter / divisor).
    dt: f64,
}

struct NodeSolution {
    node: usize,
    /// `(plate index, arc-length offset)` pairs.
    offsets: Vec<(usize, f64)>,
    converged: bool,
    iterations: usize,
}

/// Solve one node. Returns best-effort offsets even on non-convergence.
fn solve_node(graph: &LatticeGraph, node_idx: usize, params: &SolverParams, tolerance: f64) -> NodeSolution {
    let node = &graph.nodes[node_idx];
    let radius = node.radius;

    let mut walks: Vec<PlateWalk> = node
        .struts
        .iter()
        .map(|&strut_idx| {
            let curve = graph.curve_from_node(strut_idx, node_idx);
            let t0 = curve.param_at_length(radius);
            PlateWalk {
                plate: graph.plate_at(strut_idx, node_idx),
                curve,
                t: t0,
                dt: (t0 / params.travel_divisor).max(f64::MIN_POSITIVE),
            }
        })
        .collect();

    let mut converged = false;
    let mut iterations = 0;

    for iter in 0..=params.max_iterations {
        iterations = iter;

        let rings: Vec<(Point3<f64>, Vector3<f64>)> = walks
            .iter()
            .map(|w| (w.curve.point_at(w.t), w.curve.tangent_at(w.t)))
            .collect();

        let mut travel = vec![false; walks.len()];
        for a in 0..walks.len() {
            for b in (a + 1)..walks.len() {
                let (ca, na) = rings[a];
                let (cb, nb) = rings[b];
                // Both directions; either positive test flags both struts.
                if circle_intersects_plane(&cb, &nb, radius, &ca, &na, tolerance)
                    || circle_intersects_plane(&ca, &na, radius, &cb, &nb, tolerance)
                {
                    travel[a] = true;
                    travel[b] = true;
                }
            }
        }

        if !travel.iter().any(|&t| t) {
            converged = true;
            break;
        }
        if iter == params.max_iterations {
            break;
        }

        for (walk, &flagged) in walks.iter_mut().zip(travel.iter()) {
            if flagged {
                walk.t = (walk.t + walk.dt).min(1.0);
            }
        }
    }

    let offsets = walks
        .iter()
        .map(|w| {
            let arc = w.t * w.curve.length();
            (w.plate, arc * params.safety_margin)
        })
        .collect();

    NodeSolution {
        node: node_idx,
        offsets,
        converged,
        iterations,
    }
}

/// Run the offset solver over every node of degree ≥ 2.
///
/// Nodes are independent, so they are solved in parallel; the computed
/// offsets are then written back sequentially (the only mutation of
/// `Plate::offset` in the pipeline). Degree-1 plates keep offset 0 and the
/// sleeve runs all the way to the node.
pub fn solve_offsets(
    graph: &mut LatticeGraph,
    params: &SolverParams,
    tolerance: f64,
) -> OffsetReport {
    let candidates: Vec<usize> = (0..graph.nodes.len())
        .filter(|&i| graph.nodes[i].degree() >= 2)
        .collect();

    let shared: &LatticeGraph = graph;
    let solutions: Vec<NodeSolution> = candidates
        .par_iter()
        .map(|&node_idx| solve_node(shared, node_idx, params, tolerance))
        .collect();

    let mut report = OffsetReport {
        solved_nodes: solutions.len(),
        ..Default::default()
    };

    for solution in solutions {
        for (plate_idx, offset) in &solution.offsets {
            graph.plates[*plate_idx].offset = *offset;
        }
        report.max_iterations_used = report.max_iterations_used.max(solution.iterations);
        if !solution.converged {
            warn!(
                node = solution.node,
                budget = params.max_iterations,
                "offset solver hit iteration budget; mesh may overlap locally"
            );
            report.unconverged_nodes.push(solution.node);
        } else {
            debug!(
                node = solution.node,
                iterations = solution.iterations,
                "offsets converged"
            );
        }
    }

    report
}
