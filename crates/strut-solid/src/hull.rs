//! Incremental convex hulls at multi-strut nodes.
//!
//! All plate rings at a node are hulled into one convex solid, then the flat
//! "cap" faces that duplicate a plate disk are deleted so the hull's open
//! boundary matches the adjoining sleeve's end ring exactly. The offset
//! solver has already guaranteed that no ring is engulfed by another plate's
//! disk; without that, the insertion loop below produces self-intersecting
//! garbage.
//!
//! The visibility test deliberately counts points *within tolerance of* a
//! face plane as visible: coplanar ring points must split their cap faces so
//! the whole ring ends up on the hull, which is what makes cap culling open
//! a clean, ring-shaped boundary.

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::{debug, trace};

use crate::graph::LatticeGraph;
use crate::types::Mesh;

/// Is `point` on the outward side of the plane through `a`, `b`, `c`
/// (CCW winding), or within `tolerance` of it?
///
/// Degenerate (zero-area) faces are treated as visible so they get replaced
/// rather than surviving as slivers.
pub fn is_visible(
    point: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    tolerance: f64,
) -> bool {
    let normal = (b - a).cross(&(c - a));
    let norm = normal.norm();
    if norm < f64::EPSILON {
        return true;
    }
    normal.dot(&(point - a)) / norm >= -tolerance
}

/// A convex hull over a labeled point set.
///
/// `labels[v]` is the strut-plate index the vertex came from, or `None` for
/// synthetic sharp-plate points and for vertices welded together from
/// different plates.
#[derive(Debug, Clone)]
pub struct ConvexHull {
    pub vertices: Vec<Point3<f64>>,
    pub labels: Vec<Option<usize>>,
    pub faces: Vec<[usize; 3]>,
}

impl ConvexHull {
    /// V − E + F; 2 for a closed genus-0 surface.
    pub fn euler_characteristic(&self) -> i64 {
        let mut edges: HashMap<(usize, usize), ()> = HashMap::new();
        for face in &self.faces {
            for e in 0..3 {
                let a = face[e];
                let b = face[(e + 1) % 3];
                edges.insert(if a < b { (a, b) } else { (b, a) }, ());
            }
        }
        let referenced: hashbrown::HashSet<usize> =
            self.faces.iter().flat_map(|f| f.iter().copied()).collect();
        referenced.len() as i64 - edges.len() as i64 + self.faces.len() as i64
    }
}

/// Build the hull of `points` incrementally.
///
/// Seeds a tetrahedron from the first non-collinear triple plus the first
/// point off their plane, then inserts the remaining points one at a time:
/// visible faces are deleted and the hole is fanned from the new vertex to
/// every horizon edge. Points within `tolerance` of an existing hull vertex
/// are welded instead of inserted.
///
/// Returns `None` when no 4 points span a volume (fully planar input); the
/// caller falls back to a flat cap.
pub fn build_convex_hull(
    points: &[(Point3<f64>, Option<usize>)],
    tolerance: f64,
) -> Option<ConvexHull> {
    let (seed, apex) = find_seed(points, tolerance)?;
    let [i0, i1, i2] = seed;

    let mut hull = ConvexHull {
        vertices: vec![points[i0].0, points[i1].0, points[i2].0, points[apex].0],
        labels: vec![points[i0].1, points[i1].1, points[i2].1, points[apex].1],
        faces: Vec::new(),
    };

    // Four outward-oriented seed faces: each face's plane keeps the opposite
    // vertex behind it.
    for (face, opposite) in [
        ([0, 1, 2], 3),
        ([0, 1, 3], 2),
        ([0, 2, 3], 1),
        ([1, 2, 3], 0),
    ] {
        hull.faces.push(orient_outward(&hull.vertices, face, opposite));
    }

    let seeded: [usize; 4] = [i0, i1, i2, apex];
    for (idx, (position, label)) in points.iter().enumerate() {
        if seeded.contains(&idx) {
            continue;
        }
        insert_point(&mut hull, position, *label, tolerance);
    }

    Some(hull)
}

/// First non-collinear triple and first point off its plane.
fn find_seed(
    points: &[(Point3<f64>, Option<usize>)],
    tolerance: f64,
) -> Option<([usize; 3], usize)> {
    if points.len() < 4 {
        return None;
    }

    let mut triple: Option<[usize; 3]> = None;
    'outer: for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            for k in (j + 1)..points.len() {
                let ab = points[j].0 - points[i].0;
                let ac = points[k].0 - points[i].0;
                if ab.cross(&ac).norm() > tolerance {
                    triple = Some([i, j, k]);
                    break 'outer;
                }
            }
        }
    }
    let [i0, i1, i2] = triple?;

    let normal = (points[i1].0 - points[i0].0)
        .cross(&(points[i2].0 - points[i0].0))
        .normalize();
    let apex = points.iter().enumerate().position(|(idx, (p, _))| {
        idx != i0 && idx != i1 && idx != i2 && normal.dot(&(p - points[i0].0)).abs() > tolerance
    })?;

    Some(([i0, i1, i2], apex))
}

/// Reorder a face so `opposite` lies behind its plane.
fn orient_outward(vertices: &[Point3<f64>], face: [usize; 3], opposite: usize) -> [usize; 3] {
    let [a, b, c] = face;
    let normal = (vertices[b] - vertices[a]).cross(&(vertices[c] - vertices[a]));
    if normal.dot(&(vertices[opposite] - vertices[a])) > 0.0 {
        [a, c, b]
    } else {
        face
    }
}

fn insert_point(hull: &mut ConvexHull, position: &Point3<f64>, label: Option<usize>, tolerance: f64) {
    // Weld with an existing hull vertex if coincident; conflicting plate
    // labels collapse to None so cap culling never eats a shared vertex.
    for (v_idx, v) in hull.vertices.iter().enumerate() {
        if (v - position).norm() <= tolerance {
            if hull.labels[v_idx] != label {
                hull.labels[v_idx] = None;
            }
            return;
        }
    }

    let visible: Vec<usize> = (0..hull.faces.len())
        .filter(|&f| {
            let [a, b, c] = hull.faces[f];
            is_visible(
                position,
                &hull.vertices[a],
                &hull.vertices[b],
                &hull.vertices[c],
                tolerance,
            )
        })
        .collect();

    if visible.is_empty() {
        // Interior point; contributes nothing.
        trace!("hull point inside current hull, skipped");
        return;
    }

    // Horizon: directed edges of visible faces whose undirected edge is not
    // shared with another visible face.
    let visible_set: hashbrown::HashSet<usize> = visible.iter().copied().collect();
    let mut edge_owner: HashMap<(usize, usize), usize> = HashMap::new();
    for (f_idx, face) in hull.faces.iter().enumerate() {
        for e in 0..3 {
            let a = face[e];
            let b = face[(e + 1) % 3];
            let key = if a < b { (a, b) } else { (b, a) };
            // Each undirected edge of a closed hull has exactly two faces;
            // remember the one not currently visible.
            if !visible_set.contains(&f_idx) {
                edge_owner.insert(key, f_idx);
            }
        }
    }

    let mut horizon: Vec<(usize, usize)> = Vec::new();
    for &f_idx in &visible {
        let face = hull.faces[f_idx];
        for e in 0..3 {
            let a = face[e];
            let b = face[(e + 1) % 3];
            let key = if a < b { (a, b) } else { (b, a) };
            if edge_owner.contains_key(&key) {
                horizon.push((a, b));
            }
        }
    }

    // Delete visible faces (descending index so removals stay valid).
    let mut to_remove = visible;
    to_remove.sort_unstable_by(|a, b| b.cmp(a));
    for f_idx in to_remove {
        hull.faces.swap_remove(f_idx);
    }

    let new_vertex = hull.vertices.len();
    hull.vertices.push(*position);
    hull.labels.push(label);

    // The kept neighbor traverses each horizon edge as (b, a), so the fan
    // face traverses (a, b) and stays outward.
    for (a, b) in horizon {
        hull.faces.push([a, b, new_vertex]);
    }
}

/// One node's hull after plate-face culling.
#[derive(Debug)]
pub struct NodeHull {
    pub mesh: Mesh,
    /// Plate cap faces removed to open the sleeve seams.
    pub culled_faces: usize,
    /// Set when the node was planar and got a flat cap instead of a hull.
    pub planar_fallback: bool,
}

/// Flatten a node's plate rings into labeled hull input points.
///
/// True strut plates label their points with the plate index so their caps
/// can be culled later; synthetic sharp plates stay unlabeled (their faces
/// must survive, they close the hull).
fn collect_node_points(
    graph: &LatticeGraph,
    node_idx: usize,
) -> Vec<(Point3<f64>, Option<usize>)> {
    let mut points = Vec::new();
    for &plate_idx in &graph.nodes[node_idx].plates {
        let plate = &graph.plates[plate_idx];
        let label = plate.is_strut_plate().then_some(plate_idx);
        for p in &plate.ring {
            points.push((*p, label));
        }
    }
    points
}

/// Build the culled hull mesh for one node of degree ≥ 2.
///
/// Returns `None` when the node has no ring geometry at all (every incident
/// sleeve was skipped); the assembler treats that as a local failure.
pub fn build_node_hull(graph: &LatticeGraph, node_idx: usize, tolerance: f64) -> Option<NodeHull> {
    let points = collect_node_points(graph, node_idx);
    if points.is_empty() {
        return None;
    }

    let Some(mut hull) = build_convex_hull(&points, tolerance) else {
        debug!(node = node_idx, "planar node, using flat cap fallback");
        return flat_cap_fallback(&points).map(|mesh| NodeHull {
            mesh,
            culled_faces: 0,
            planar_fallback: true,
        });
    };

    // Cull plate caps: every face whose three vertices share one strut-plate
    // label duplicates that plate's disk.
    let before = hull.faces.len();
    hull.faces.retain(|&[a, b, c]| {
        !(hull.labels[a].is_some()
            && hull.labels[a] == hull.labels[b]
            && hull.labels[b] == hull.labels[c])
    });
    let culled = before - hull.faces.len();

    Some(NodeHull {
        mesh: hull_to_mesh(&hull),
        culled_faces: culled,
        planar_fallback: false,
    })
}

/// Compact a hull into a [`Mesh`], dropping vertices orphaned by culling
/// (ring centers lose all their faces with the cap).
fn hull_to_mesh(hull: &ConvexHull) -> Mesh {
    let mut remap: HashMap<usize, u32> = HashMap::new();
    let mut mesh = Mesh::with_capacity(hull.vertices.len(), hull.faces.len());

    for face in &hull.faces {
        let mut out = [0u32; 3];
        for (slot, &v) in out.iter_mut().zip(face.iter()) {
            *slot = *remap
                .entry(v)
                .or_insert_with(|| mesh.push_vertex(hull.vertices[v]));
        }
        mesh.faces.push(out);
    }
    mesh
}

/// Degenerate-node fallback: a double-sided fan over the first ring, so the
/// output stays closed (zero volume) instead of indexing past the point
/// list.
fn flat_cap_fallback(points: &[(Point3<f64>, Option<usize>)]) -> Option<Mesh> {
    if points.len() < 3 {
        return None;
    }
    let mut mesh = Mesh::new();
    for (p, _) in points {
        mesh.push_vertex(*p);
    }
    let n = points.len() as u32;
    for i in 1..n - 1 {
        mesh.faces.push([0, i, i + 1]);
        mesh.faces.push([0, i + 1, i]);
    }
    Some(mesh)
}
