//! Flat caps for degree-1 nodes.
//!
//! A strut that dead-ends gets no hull; its tube is closed with a fan from
//! the plate's ring center to every consecutive pair of perimeter vertices.

use tracing::debug;

use crate::graph::LatticeGraph;
use crate::types::{Mesh, Triangle};

/// Build the fan cap for a degree-1 node.
///
/// Returns `None` if the node's single plate has no ring (its sleeve was
/// skipped); the assembler treats that as a local failure.
pub fn build_end_cap(graph: &LatticeGraph, node_idx: usize) -> Option<Mesh> {
    let node = &graph.nodes[node_idx];
    debug_assert_eq!(node.degree(), 1);

    let plate = &graph.plates[*node.plates.first()?];
    if plate.ring.len() < 4 {
        debug!(node = node_idx, "no ring on end plate, skipping cap");
        return None;
    }

    let mut mesh = Mesh::with_capacity(plate.ring.len(), plate.ring.len() - 1);
    for p in &plate.ring {
        mesh.push_vertex(*p);
    }

    let sides = (plate.ring.len() - 1) as u32;
    for i in 1..=sides {
        let next = if i == sides { 1 } else { i + 1 };
        mesh.faces.push([0, i, next]);
    }

    // The cap faces away from the tube, opposite the plate normal; flip the
    // fan if the ring's winding says otherwise.
    let first = Triangle::new(
        mesh.vertices[0].position,
        mesh.vertices[1].position,
        mesh.vertices[2].position,
    );
    if let Some(normal) = first.normal() {
        if normal.dot(&plate.normal) > 0.0 {
            for face in &mut mesh.faces {
                face.swap(1, 2);
            }
        }
    }

    Some(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize;
    use crate::curve::StrutCurve;
    use crate::graph::{LatticeGraph, RadiusSpec};
    use crate::sleeve::build_sleeves;
    use nalgebra::Point3;

    fn capped_strut(sides: usize) -> (LatticeGraph, Mesh, Mesh) {
        let curves = vec![StrutCurve::line(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        )];
        let net = canonicalize(&curves, 1e-6, 1e-9);
        let mut graph = LatticeGraph::build(&net, &RadiusSpec::Constant(0.1)).unwrap();
        build_sleeves(&mut graph, sides);
        let cap0 = build_end_cap(&graph, 0).expect("start cap");
        let cap1 = build_end_cap(&graph, 1).expect("end cap");
        (graph, cap0, cap1)
    }

    #[test]
    fn test_fan_shape() {
        let sides = 8;
        let (_, cap0, _) = capped_strut(sides);
        assert_eq!(cap0.vertex_count(), sides + 1);
        assert_eq!(cap0.face_count(), sides);
        // A fan over a closed ring has only the perimeter as boundary.
        assert_eq!(cap0.boundary_edge_count(), sides);
    }

    #[test]
    fn test_caps_face_away_from_tube() {
        let (graph, cap0, cap1) = capped_strut(8);

        let normal0 = cap0.triangles().next().unwrap().normal().unwrap();
        let normal1 = cap1.triangles().next().unwrap().normal().unwrap();

        let plate0 = &graph.plates[graph.nodes[0].plates[0]];
        let plate1 = &graph.plates[graph.nodes[1].plates[0]];
        assert!(normal0.dot(&plate0.normal) < 0.0, "start cap faces the tube");
        assert!(normal1.dot(&plate1.normal) < 0.0, "end cap faces the tube");
    }

    #[test]
    fn test_missing_ring_returns_none() {
        let curves = vec![StrutCurve::line(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        )];
        let net = canonicalize(&curves, 1e-6, 1e-9);
        let graph = LatticeGraph::build(&net, &RadiusSpec::Constant(0.1)).unwrap();
        // Sleeves never ran.
        assert!(build_end_cap(&graph, 0).is_none());
    }
}
