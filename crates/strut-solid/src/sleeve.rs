//! Sleeve (tube) mesh generation along struts.
//!
//! A sleeve spans one strut between its two plates, tapering linearly from
//! the start radius to the end radius. Cross-section rings are rotated by a
//! half step per division so the wall triangulates into near-equilateral
//! triangles instead of long diagonal slivers; the first and last rings are
//! written back onto the strut's plates so the node hulls can pick them up
//! verbatim, which is what makes the sleeve/hull seam exact.

use nalgebra::Point3;
use rayon::prelude::*;
use tracing::debug;

use crate::curve::cross_section_ring;
use crate::graph::LatticeGraph;
use crate::types::Mesh;

/// Sleeve meshes for all struts, indexed like `graph.struts`.
#[derive(Debug, Default)]
pub struct SleeveSet {
    /// One wall mesh per strut; `None` where the strut was skipped.
    pub meshes: Vec<Option<Mesh>>,
    /// Struts skipped because their plates overlap (offsets consumed the
    /// whole curve). Local failures only; the assembler works around them.
    pub skipped: Vec<usize>,
}

/// Even division count proportioning the tube into roughly square segments.
fn division_count(length: f64, mean_radius: f64) -> usize {
    let rings = (length / (2.0 * mean_radius)).round() as i64 * 2;
    rings.max(2) as usize
}

struct SleeveGeometry {
    mesh: Mesh,
    /// Ring center + perimeter for the start plate.
    start_ring: Vec<Point3<f64>>,
    /// Ring center + perimeter for the end plate.
    end_ring: Vec<Point3<f64>>,
}

/// Build the wall mesh for one strut, or `None` if its plates overlap.
fn build_sleeve(graph: &LatticeGraph, strut_idx: usize, sides: usize) -> Option<SleeveGeometry> {
    let strut = &graph.struts[strut_idx];
    let curve = &strut.curve;
    let total = curve.length();

    let start_offset = graph.plates[strut.plates[0]].offset;
    let end_offset = graph.plates[strut.plates[1]].offset;

    let t0 = curve.param_at_length(start_offset);
    let t1 = curve.param_at_length(total - end_offset);
    if t1 - t0 <= f64::EPSILON {
        return None;
    }

    let [r0, r1] = strut.radii;
    let length = (t1 - t0) * total;
    let divisions = division_count(length, (r0 + r1) * 0.5);
    let half_step = std::f64::consts::PI / sides as f64;

    // Linear struts have one tangent, and the ring frame is derived from the
    // tangent, so evaluating it once fixes the frame for every ring.
    let fixed_tangent = curve.is_linear().then(|| curve.tangent_at(0.0));

    let mut mesh = Mesh::with_capacity((divisions + 1) * sides, divisions * 2 * sides);
    let mut start_ring = Vec::with_capacity(sides + 1);
    let mut end_ring = Vec::with_capacity(sides + 1);

    for j in 0..=divisions {
        let fraction = j as f64 / divisions as f64;
        let t = t0 + (t1 - t0) * fraction;
        let center = curve.point_at(t);
        let radius = r0 + (r1 - r0) * fraction;
        let phase = j as f64 * half_step;

        let tangent = fixed_tangent.unwrap_or_else(|| curve.tangent_at(t));
        let ring = cross_section_ring(&center, &tangent, radius, sides, phase);

        if j == 0 {
            start_ring.push(center);
            start_ring.extend(ring.iter().copied());
        }
        if j == divisions {
            end_ring.push(center);
            end_ring.extend(ring.iter().copied());
        }

        for p in ring {
            mesh.push_vertex(p);
        }
    }

    // Wall quads, two triangles each; the half-twist between adjacent rings
    // alternates the diagonals by construction.
    for j in 0..divisions {
        let a = (j * sides) as u32;
        let b = ((j + 1) * sides) as u32;
        for i in 0..sides as u32 {
            let i1 = (i + 1) % sides as u32;
            mesh.faces.push([a + i, a + i1, b + i]);
            mesh.faces.push([a + i1, b + i1, b + i]);
        }
    }

    Some(SleeveGeometry {
        mesh,
        start_ring,
        end_ring,
    })
}

/// Build sleeves for every strut and store plate rings on the graph.
///
/// Struts are independent, so the geometry is computed in parallel; plate
/// rings are written back sequentially afterwards.
pub fn build_sleeves(graph: &mut LatticeGraph, sides: usize) -> SleeveSet {
    let shared: &LatticeGraph = graph;
    let geometries: Vec<Option<SleeveGeometry>> = (0..shared.struts.len())
        .into_par_iter()
        .map(|strut_idx| build_sleeve(shared, strut_idx, sides))
        .collect();

    let mut set = SleeveSet {
        meshes: Vec::with_capacity(geometries.len()),
        skipped: Vec::new(),
    };

    for (strut_idx, geometry) in geometries.into_iter().enumerate() {
        match geometry {
            Some(geometry) => {
                let [start_plate, end_plate] = graph.struts[strut_idx].plates;
                graph.plates[start_plate].ring = geometry.start_ring;
                graph.plates[end_plate].ring = geometry.end_ring;
                set.meshes.push(Some(geometry.mesh));
            }
            None => {
                debug!(strut = strut_idx, "skipping sleeve; plates overlap");
                set.skipped.push(strut_idx);
                set.meshes.push(None);
            }
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize;
    use crate::curve::StrutCurve;
    use crate::graph::RadiusSpec;
    use nalgebra::Vector3;

    fn straight_graph(length: f64, radius: f64) -> LatticeGraph {
        let curves = vec![StrutCurve::line(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(length, 0.0, 0.0),
        )];
        let net = canonicalize(&curves, 1e-6, 1e-9);
        LatticeGraph::build(&net, &RadiusSpec::Constant(radius)).unwrap()
    }

    #[test]
    fn test_division_count_even_and_bounded() {
        assert_eq!(division_count(1.0, 0.1), 10);
        assert_eq!(division_count(0.05, 0.1), 2); // rounds to 0, clamped
        assert_eq!(division_count(0.7, 0.1), 8); // 3.5 rounds away from zero
        assert!(division_count(123.4, 0.37) % 2 == 0);
    }

    #[test]
    fn test_straight_sleeve_wall_distance() {
        let (length, radius, sides) = (1.0, 0.1, 8);
        let mut graph = straight_graph(length, radius);
        let set = build_sleeves(&mut graph, sides);

        assert!(set.skipped.is_empty());
        let mesh = set.meshes[0].as_ref().unwrap();

        let divisions = division_count(length, radius);
        assert_eq!(mesh.vertex_count(), (divisions + 1) * sides);
        assert_eq!(mesh.face_count(), divisions * 2 * sides);

        // Every wall vertex sits exactly one radius off the X axis.
        for v in &mesh.vertices {
            let radial = (v.position.y.powi(2) + v.position.z.powi(2)).sqrt();
            assert!((radial - radius).abs() < 1e-9, "radial {}", radial);
            assert!(v.position.x >= -1e-9 && v.position.x <= length + 1e-9);
        }
    }

    #[test]
    fn test_plate_rings_written_back() {
        let (length, radius, sides) = (1.0, 0.1, 6);
        let mut graph = straight_graph(length, radius);
        build_sleeves(&mut graph, sides);

        for plate in &graph.plates {
            assert_eq!(plate.ring.len(), sides + 1);
            // Element 0 is the ring center on the axis.
            let center = plate.ring[0];
            for p in &plate.ring[1..] {
                assert!(((p - center).norm() - radius).abs() < 1e-9);
            }
        }
        // Degree-1 plates have zero offset: rings centered on the nodes.
        assert!((graph.plates[0].ring[0] - Point3::new(0.0, 0.0, 0.0)).norm() < 1e-12);
        assert!((graph.plates[1].ring[0] - Point3::new(length, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_tapered_sleeve_interpolates_radius() {
        let curves = vec![StrutCurve::line(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        )];
        let net = canonicalize(&curves, 1e-6, 1e-9);
        let radii = RadiusSpec::PerNode(vec![0.1, 0.3]);
        let mut graph = LatticeGraph::build(&net, &radii).unwrap();
        let set = build_sleeves(&mut graph, 8);
        let mesh = set.meshes[0].as_ref().unwrap();

        for v in &mesh.vertices {
            let expected = 0.1 + (0.3 - 0.1) * (v.position.x / 2.0);
            let radial = (v.position.y.powi(2) + v.position.z.powi(2)).sqrt();
            assert!((radial - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_adjacent_rings_half_twisted() {
        let (length, radius, sides) = (1.0, 0.1, 8);
        let mut graph = straight_graph(length, radius);
        let set = build_sleeves(&mut graph, sides);
        let mesh = set.meshes[0].as_ref().unwrap();

        let ring0: Vec<_> = mesh.vertices[..sides].iter().collect();
        let ring1: Vec<_> = mesh.vertices[sides..2 * sides].iter().collect();
        let axis = Vector3::x();
        let half_step = std::f64::consts::PI / sides as f64;

        // Angle in the YZ plane advances by exactly half a side step.
        for (a, b) in ring0.iter().zip(ring1.iter()) {
            let angle_a = a.position.z.atan2(a.position.y);
            let angle_b = b.position.z.atan2(b.position.y);
            let mut delta = angle_b - angle_a;
            while delta < 0.0 {
                delta += std::f64::consts::TAU;
            }
            assert!((delta - half_step).abs() < 1e-9 || (delta - half_step - std::f64::consts::TAU).abs() < 1e-9);
            // Both rings stay perpendicular to the axis.
            assert!(a.position.coords.cross(&axis).norm() > 0.0);
        }
    }

    #[test]
    fn test_overlapping_plates_skip_sleeve() {
        let mut graph = straight_graph(1.0, 0.1);
        // Force offsets past the midpoint from both ends.
        graph.plates[0].offset = 0.6;
        graph.plates[1].offset = 0.6;
        let set = build_sleeves(&mut graph, 8);

        assert_eq!(set.skipped, vec![0]);
        assert!(set.meshes[0].is_none());
        // Skipped struts leave their plate rings untouched.
        assert!(graph.plates[0].ring.is_empty());
    }

    #[test]
    fn test_outward_winding() {
        let mut graph = straight_graph(1.0, 0.1);
        let set = build_sleeves(&mut graph, 8);
        let mesh = set.meshes[0].as_ref().unwrap();

        // Each face normal must point away from the axis at its centroid.
        for tri in mesh.triangles() {
            let n = tri.normal().expect("non-degenerate wall face");
            let c = tri.centroid();
            let radial = Vector3::new(0.0, c.y, c.z);
            assert!(n.dot(&radial) > 0.0, "inward-facing wall triangle");
        }
    }
}
