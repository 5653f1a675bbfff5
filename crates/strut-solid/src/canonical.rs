//! Network canonicalization.
//!
//! Raw curve input is redundant: endpoints that should be one lattice node
//! arrive as near-coincident points, and upstream trimming can emit the same
//! strut twice. This pass dedups endpoints into unique nodes within the
//! caller's tolerance and filters degenerate or duplicate curves. Nothing
//! here is fatal; dropped input is counted for diagnostics.

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::{debug, info};

use crate::curve::StrutCurve;

/// A strut surviving canonicalization: its curve plus canonical node indices.
#[derive(Debug, Clone)]
pub struct CanonicalStrut {
    /// Centerline, still oriented as the input curve was.
    pub curve: StrutCurve,
    /// `[start_node, end_node]` indices into [`CanonicalNetwork::nodes`].
    pub nodes: [usize; 2],
}

/// The deduplicated curve network.
#[derive(Debug, Clone, Default)]
pub struct CanonicalNetwork {
    /// Unique node positions, in first-seen order.
    pub nodes: Vec<Point3<f64>>,
    /// Surviving struts, in input order.
    pub struts: Vec<CanonicalStrut>,
    /// Curves dropped for NaN/infinite coordinates.
    pub dropped_invalid: usize,
    /// Curves dropped as too short (or as self-loops after node welding).
    pub dropped_degenerate: usize,
    /// Curves dropped as duplicates of an earlier strut.
    pub dropped_duplicate: usize,
}

impl CanonicalNetwork {
    /// Total number of curves dropped by canonicalization.
    #[inline]
    pub fn dropped_total(&self) -> usize {
        self.dropped_invalid + self.dropped_degenerate + self.dropped_duplicate
    }
}

/// Spatial index over registered node positions.
///
/// Cell size is 2× the tolerance so any candidate within tolerance lives in
/// the 3×3×3 cell neighborhood.
struct NodeIndex {
    cells: HashMap<(i64, i64, i64), Vec<usize>>,
    cell_size: f64,
}

impl NodeIndex {
    fn new(tolerance: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size: (tolerance * 2.0).max(f64::MIN_POSITIVE),
        }
    }

    #[inline]
    fn cell_of(&self, p: &Point3<f64>) -> (i64, i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
            (p.z / self.cell_size).floor() as i64,
        )
    }

    /// Nearest registered node within `tolerance`, if any.
    fn nearest_within(
        &self,
        p: &Point3<f64>,
        nodes: &[Point3<f64>],
        tolerance: f64,
    ) -> Option<usize> {
        let (cx, cy, cz) = self.cell_of(p);
        let mut best: Option<(usize, f64)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(candidates) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) {
                        for &idx in candidates {
                            let dist = (nodes[idx] - p).norm();
                            if dist <= tolerance && best.map_or(true, |(_, d)| dist < d) {
                                best = Some((idx, dist));
                            }
                        }
                    }
                }
            }
        }
        best.map(|(idx, _)| idx)
    }

    fn insert(&mut self, p: &Point3<f64>, idx: usize) {
        self.cells.entry(self.cell_of(p)).or_default().push(idx);
    }

    fn remove(&mut self, p: &Point3<f64>, idx: usize) {
        if let Some(cell) = self.cells.get_mut(&self.cell_of(p)) {
            cell.retain(|&i| i != idx);
        }
    }

    /// Reuse the nearest node within `tolerance` or register a new one.
    /// Newly created node indices are recorded in `created` so a dropped
    /// curve can roll its registrations back.
    fn register(
        &mut self,
        p: Point3<f64>,
        nodes: &mut Vec<Point3<f64>>,
        tolerance: f64,
        created: &mut Vec<usize>,
    ) -> usize {
        match self.nearest_within(&p, nodes, tolerance) {
            Some(existing) => existing,
            None => {
                let idx = nodes.len();
                nodes.push(p);
                self.insert(&p, idx);
                created.push(idx);
                idx
            }
        }
    }
}

/// Dedup endpoints into unique nodes and filter degenerate/duplicate curves.
///
/// * An endpoint within `tolerance` of an already-registered node reuses that
///   node's index; otherwise a new node is registered.
/// * A curve shorter than `max(tolerance, 100 · model_epsilon)` is dropped,
///   as is a curve whose endpoints weld to the same node.
/// * A curve joining an already-seen node pair is a duplicate only if its
///   midpoint also lies within `tolerance` of the recorded curve's midpoint;
///   distinct parallel struts between the same two nodes both survive.
///
/// Running this on an already-canonical network reproduces the node and strut
/// lists in identical order.
pub fn canonicalize(
    curves: &[StrutCurve],
    tolerance: f64,
    model_epsilon: f64,
) -> CanonicalNetwork {
    let min_length = tolerance.max(100.0 * model_epsilon);

    let mut network = CanonicalNetwork::default();
    let mut index = NodeIndex::new(tolerance);
    // Unordered node pair -> midpoints of struts already recorded for it.
    let mut pair_midpoints: HashMap<(usize, usize), Vec<Point3<f64>>> = HashMap::new();

    for (curve_idx, curve) in curves.iter().enumerate() {
        if !curve.is_finite() {
            debug!(curve = curve_idx, "dropping curve with non-finite coordinates");
            network.dropped_invalid += 1;
            continue;
        }
        if curve.length() < min_length {
            debug!(
                curve = curve_idx,
                length = curve.length(),
                "dropping degenerate curve"
            );
            network.dropped_degenerate += 1;
            continue;
        }

        // Nodes registered by this curve, in case it gets dropped below and
        // must not leave orphans behind (idempotence depends on it).
        let mut created: Vec<usize> = Vec::new();
        let start_node = index.register(curve.start(), &mut network.nodes, tolerance, &mut created);
        let end_node = index.register(curve.end(), &mut network.nodes, tolerance, &mut created);

        if start_node == end_node {
            debug!(curve = curve_idx, node = start_node, "dropping self-loop curve");
            for idx in created.into_iter().rev() {
                let position = network.nodes.remove(idx);
                index.remove(&position, idx);
            }
            network.dropped_degenerate += 1;
            continue;
        }

        let pair = if start_node < end_node {
            (start_node, end_node)
        } else {
            (end_node, start_node)
        };
        let midpoint = curve.midpoint();

        let recorded = pair_midpoints.entry(pair).or_default();
        if recorded.iter().any(|m| (m - midpoint).norm() <= tolerance) {
            debug!(
                curve = curve_idx,
                nodes = ?pair,
                "dropping duplicate strut"
            );
            network.dropped_duplicate += 1;
            continue;
        }
        recorded.push(midpoint);

        network.struts.push(CanonicalStrut {
            curve: curve.clone(),
            nodes: [start_node, end_node],
        });
    }

    info!(
        nodes = network.nodes.len(),
        struts = network.struts.len(),
        dropped = network.dropped_total(),
        "canonicalized network"
    );

    network
}
