//! Example: solidifying an octet-truss corner joint.
//!
//! Builds the strut fan that meets at one corner of an octet-truss unit
//! cell, solidifies it with a graded radius, and prints mesh statistics.
//!
//! Run with: `cargo run --example octet_joint`
//! Set `RUST_LOG=strut_solid=debug` for per-phase logs.

use nalgebra::Point3;
use strut_solid::{solidify, RadiusSpec, SolidifyParams, StrutCurve};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let origin = Point3::new(0.0, 0.0, 0.0);

    // Axis struts plus the face diagonals of the octet cell corner.
    let tips = [
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(0.5, 0.5, 0.0),
        Point3::new(0.5, 0.0, 0.5),
        Point3::new(0.0, 0.5, 0.5),
    ];
    let curves: Vec<StrutCurve> = tips
        .iter()
        .map(|&tip| StrutCurve::line(origin, tip))
        .collect();

    // Struts thin out with height, the way a gravity-loaded lattice would.
    let radius = RadiusSpec::from_fn(|p| 0.08 - 0.03 * p.z);

    let params = SolidifyParams::default().with_sides(12);
    let result = solidify(&curves, &radius, &params)?;

    println!(
        "solidified {} struts across {} nodes",
        result.report.struts, result.report.nodes
    );
    println!(
        "mesh: {} vertices, {} faces, watertight: {}",
        result.mesh.vertex_count(),
        result.mesh.face_count(),
        result.mesh.is_watertight()
    );
    println!(
        "volume: {:.6}, surface area: {:.6}",
        result.mesh.signed_volume(),
        result.mesh.surface_area()
    );

    if !result.report.is_clean() {
        println!("degradations: {:?}", result.report);
    }

    Ok(())
}
