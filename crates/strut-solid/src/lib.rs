//! Strut-network solidification for lattice structures.
//!
//! This crate turns an abstract 3D wireframe — nodes connected by struts,
//! each strut carrying a radius at both ends — into a single watertight
//! triangle mesh suitable for fabrication or structural analysis. It is the
//! "solidification" stage of a lattice design pipeline: grid generation,
//! conformal mapping, and design-space trimming happen upstream and only
//! need to hand over a clean curve network plus per-node radii.
//!
//! # Pipeline
//!
//! 1. **Canonicalize**: dedup curve endpoints into unique nodes within a
//!    tolerance, drop degenerate and duplicate curves
//! 2. **Graph**: build the node/strut/plate arena
//! 3. **Offsets**: retreat every plate from its node until no two plate
//!    circles intersect (the no-overlap invariant the hulls depend on)
//! 4. **Sleeves**: tapered, half-twisted tube meshes along each strut
//! 5. **Hulls & caps**: incremental convex hull at every multi-strut node
//!    with plate caps culled to open exact sleeve seams; fan caps at
//!    dead ends
//! 6. **Assemble**: merge, weld, unify winding, compute vertex normals
//!
//! # Quick Start
//!
//! ```
//! use nalgebra::Point3;
//! use strut_solid::{solidify, RadiusSpec, SolidifyParams, StrutCurve};
//!
//! let origin = Point3::new(0.0, 0.0, 0.0);
//! let curves = vec![
//!     StrutCurve::line(origin, Point3::new(1.0, 0.0, 0.0)),
//!     StrutCurve::line(origin, Point3::new(0.0, 1.0, 0.0)),
//!     StrutCurve::line(origin, Point3::new(0.0, 0.0, 1.0)),
//! ];
//!
//! let result = solidify(
//!     &curves,
//!     &RadiusSpec::Constant(0.1),
//!     &SolidifyParams::default(),
//! )
//! .unwrap();
//!
//! assert!(result.mesh.is_watertight());
//! ```
//!
//! # Error Handling
//!
//! Operations return [`SolidResult<T>`]. Only input contract violations are
//! errors; geometric edge cases (degenerate curves, solver non-convergence,
//! planar nodes) degrade locally and are surfaced through
//! [`SolidifyReport`]. A non-converged node means the mesh may overlap
//! slightly there — callers should treat it as a warning, not a failure.
//!
//! # Units
//!
//! The library is unit-agnostic; the caller's `tolerance` is the only scale
//! anchor. Radii must be strictly positive.

pub mod assemble;
pub mod canonical;
pub mod curve;
pub mod endcap;
pub mod error;
pub mod graph;
pub mod hull;
pub mod offset;
pub mod sleeve;
pub mod tracing_ext;
pub mod types;

mod pipeline;

// Re-export core types at crate root
pub use error::{ErrorCode, SolidError, SolidResult};
pub use types::{Mesh, Triangle, Vertex};

pub use canonical::{canonicalize, CanonicalNetwork, CanonicalStrut};
pub use curve::StrutCurve;
pub use graph::{LatticeGraph, Node, NodeState, Plate, RadiusSpec, Strut};
pub use offset::{solve_offsets, OffsetReport, SolverParams};
pub use pipeline::{solidify, SolidifyParams, SolidifyReport, SolidifyResult};

// Re-export phase entry points for callers driving the pipeline manually
pub use assemble::{assemble, AssembleStats};
pub use endcap::build_end_cap;
pub use hull::{build_convex_hull, build_node_hull, ConvexHull, NodeHull};
pub use sleeve::{build_sleeves, SleeveSet};
