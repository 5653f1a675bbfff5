//! End-to-end tests for the solidification pipeline.
//!
//! These exercise the full chain — canonicalize -> graph -> offsets ->
//! sleeves -> hulls/caps -> assembly — against the geometric scenarios the
//! engine is calibrated for.

use nalgebra::Point3;
use strut_solid::{
    build_convex_hull, solidify, RadiusSpec, SolidifyParams, SolidifyResult, StrutCurve,
};

fn origin() -> Point3<f64> {
    Point3::new(0.0, 0.0, 0.0)
}

/// Three unit struts along +X, +Y, +Z meeting at the origin.
fn tripod_curves() -> Vec<StrutCurve> {
    vec![
        StrutCurve::line(origin(), Point3::new(1.0, 0.0, 0.0)),
        StrutCurve::line(origin(), Point3::new(0.0, 1.0, 0.0)),
        StrutCurve::line(origin(), Point3::new(0.0, 0.0, 1.0)),
    ]
}

fn run(curves: Vec<StrutCurve>, radius: f64) -> SolidifyResult {
    solidify(
        &curves,
        &RadiusSpec::Constant(radius),
        &SolidifyParams::default(),
    )
    .expect("pipeline succeeds")
}

/// No two vertices of the final mesh may coincide within the weld tolerance.
fn assert_no_duplicate_vertices(result: &SolidifyResult, tolerance: f64) {
    let verts = &result.mesh.vertices;
    for i in 0..verts.len() {
        for j in (i + 1)..verts.len() {
            let dist = (verts[i].position - verts[j].position).norm();
            assert!(
                dist > tolerance,
                "vertices {} and {} coincide (distance {})",
                i,
                j,
                dist
            );
        }
    }
}

#[test]
fn straight_strut_solidifies_to_closed_cylinder() {
    let radius = 0.1;
    let result = run(
        vec![StrutCurve::line(origin(), Point3::new(1.0, 0.0, 0.0))],
        radius,
    );

    assert!(result.report.is_clean());
    assert!(result.mesh.is_watertight());

    // Every vertex is either a cap center on the axis or a wall/rim vertex
    // at exactly one radius off it.
    for v in &result.mesh.vertices {
        let radial = (v.position.y.powi(2) + v.position.z.powi(2)).sqrt();
        assert!(
            radial < 1e-9 || (radial - radius).abs() < 1e-9,
            "unexpected radial distance {}",
            radial
        );
    }

    // Volume close to the ideal prism over the octagonal cross-section.
    let sides = 8_f64;
    let polygon_area = 0.5 * sides * radius * radius * (std::f64::consts::TAU / sides).sin();
    let volume = result.mesh.signed_volume();
    assert!(
        (volume - polygon_area).abs() / polygon_area < 0.05,
        "volume {} vs expected {}",
        volume,
        polygon_area
    );
}

#[test]
fn collinear_pass_through_node_stays_watertight() {
    let result = run(
        vec![
            StrutCurve::line(Point3::new(-1.0, 0.0, 0.0), origin()),
            StrutCurve::line(origin(), Point3::new(1.0, 0.0, 0.0)),
        ],
        0.2,
    );

    assert!(result.report.is_clean());
    assert_eq!(result.report.nodes, 3);
    assert!(result.report.unconverged_nodes.is_empty());
    assert!(result.mesh.is_watertight());
    assert!(result.mesh.signed_volume() > 0.0);
}

#[test]
fn tripod_end_to_end() {
    let tolerance = 1e-6;
    let result = run(tripod_curves(), 0.1);

    assert!(result.report.is_clean(), "report: {:?}", result.report);
    assert_eq!(result.report.nodes, 4);
    assert_eq!(result.report.struts, 3);
    // The origin node is sharp: all three struts leave into one octant.
    assert_eq!(result.report.sharp_nodes, 1);

    assert!(result.mesh.is_watertight());
    assert!(result.mesh.signed_volume() > 0.0);
    assert_no_duplicate_vertices(&result, tolerance);
}

#[test]
fn tripod_vertex_count_is_deterministic() {
    let first = run(tripod_curves(), 0.1);
    let second = run(tripod_curves(), 0.1);

    assert_eq!(first.mesh.vertex_count(), second.mesh.vertex_count());
    assert_eq!(first.mesh.face_count(), second.mesh.face_count());

    for (a, b) in first
        .mesh
        .vertices
        .iter()
        .zip(second.mesh.vertices.iter())
    {
        assert!((a.position - b.position).norm() < 1e-12);
    }
}

#[test]
fn planar_cross_node_solidifies() {
    // Four struts in the XY plane meeting at the origin.
    let result = run(
        vec![
            StrutCurve::line(origin(), Point3::new(1.0, 0.0, 0.0)),
            StrutCurve::line(origin(), Point3::new(0.0, 1.0, 0.0)),
            StrutCurve::line(origin(), Point3::new(-1.0, 0.0, 0.0)),
            StrutCurve::line(origin(), Point3::new(0.0, -1.0, 0.0)),
        ],
        0.1,
    );

    // Plate rings extend out of the strut plane, so the hull is volumetric
    // and the node is balanced, not sharp.
    assert_eq!(result.report.sharp_nodes, 0);
    assert!(result.report.planar_fallback_nodes.is_empty());
    assert!(result.mesh.is_watertight());
}

#[test]
fn tapered_strut_respects_per_node_radii() {
    let curves = vec![StrutCurve::line(origin(), Point3::new(2.0, 0.0, 0.0))];
    let result = solidify(
        &curves,
        &RadiusSpec::PerNode(vec![0.1, 0.25]),
        &SolidifyParams::default(),
    )
    .unwrap();

    assert!(result.mesh.is_watertight());
    for v in &result.mesh.vertices {
        let radial = (v.position.y.powi(2) + v.position.z.powi(2)).sqrt();
        let expected = 0.1 + (0.25 - 0.1) * (v.position.x / 2.0);
        assert!(
            radial < 1e-9 || (radial - expected).abs() < 1e-6,
            "taper violated at x={}: {} vs {}",
            v.position.x,
            radial,
            expected
        );
    }
}

#[test]
fn curved_strut_polyline_solidifies() {
    // Quarter-circle-ish arc sampled as a polyline.
    let samples: Vec<Point3<f64>> = (0..=16)
        .map(|i| {
            let t = std::f64::consts::FRAC_PI_2 * i as f64 / 16.0;
            Point3::new(t.cos(), t.sin(), 0.0)
        })
        .collect();
    let result = run(vec![StrutCurve::polyline(samples)], 0.05);

    assert!(result.report.is_clean());
    assert!(result.mesh.is_watertight());

    // Wall vertices stay close to one radius off the arc.
    for v in &result.mesh.vertices {
        let planar = (v.position.x.powi(2) + v.position.y.powi(2)).sqrt();
        let dist_to_arc = ((planar - 1.0).powi(2) + v.position.z.powi(2)).sqrt();
        assert!(
            dist_to_arc < 0.05 + 0.01,
            "vertex strays {} from the arc tube",
            dist_to_arc
        );
    }
}

#[test]
fn radius_function_evaluated_at_nodes() {
    let curves = vec![
        StrutCurve::line(origin(), Point3::new(1.0, 0.0, 0.0)),
        StrutCurve::line(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)),
    ];
    let spec = RadiusSpec::from_fn(|p| 0.05 + 0.05 * p.x);
    let result = solidify(&curves, &spec, &SolidifyParams::default()).unwrap();

    assert!(result.mesh.is_watertight());

    // Radii grow with x: 0.05 at x=0 up to 0.15 at x=2.
    let (_, max) = result.mesh.bounds().unwrap();
    assert!(max.y > 0.149 && max.y < 0.16);
    for v in &result.mesh.vertices {
        if v.position.x < 0.1 {
            let radial = (v.position.y.powi(2) + v.position.z.powi(2)).sqrt();
            assert!(radial < 0.056, "thick vertex near the thin end: {}", radial);
        }
    }
}

#[test]
fn messy_input_is_filtered_not_fatal() {
    let mut curves = tripod_curves();
    // Exact duplicate, a degenerate stub, and a NaN curve.
    curves.push(StrutCurve::line(origin(), Point3::new(1.0, 0.0, 0.0)));
    curves.push(StrutCurve::line(origin(), Point3::new(1e-9, 0.0, 0.0)));
    curves.push(StrutCurve::line(
        Point3::new(f64::NAN, 0.0, 0.0),
        Point3::new(1.0, 1.0, 1.0),
    ));

    let result = run(curves, 0.1);
    assert_eq!(result.report.dropped_curves, 3);
    assert_eq!(result.report.struts, 3);
    assert!(result.mesh.is_watertight());
}

#[test]
fn non_positive_radius_is_an_input_error() {
    let err = solidify(
        &tripod_curves(),
        &RadiusSpec::Constant(-1.0),
        &SolidifyParams::default(),
    )
    .unwrap_err();
    assert_eq!(err.code().as_str(), "SOLID-1002");
}

#[test]
fn hull_seed_rejects_planar_points_explicitly() {
    // Fully planar point set: the hull must decline, not panic.
    let pts: Vec<(Point3<f64>, Option<usize>)> = (0..12)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / 12.0;
            (Point3::new(a.cos(), a.sin(), 0.0), None)
        })
        .collect();
    assert!(build_convex_hull(&pts, 1e-9).is_none());
}

#[test]
fn octet_cell_corner_network() {
    // A denser joint: six struts from one corner of an octet cell.
    let tips = [
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(-1.0, 0.0, 0.0),
        Point3::new(0.0, -1.0, 0.0),
        Point3::new(0.0, 0.0, -1.0),
    ];
    let curves: Vec<StrutCurve> = tips
        .iter()
        .map(|&tip| StrutCurve::line(origin(), tip))
        .collect();

    let result = run(curves, 0.08);
    assert!(result.report.is_clean(), "report: {:?}", result.report);
    assert_eq!(result.report.sharp_nodes, 0);
    assert!(result.mesh.is_watertight());
    assert!(result.mesh.signed_volume() > 0.0);
}
