//! The lattice graph: nodes, struts, and plates.
//!
//! The object graph is cyclic (a node knows its struts, a strut knows its
//! nodes and plates, a plate knows its node), so everything lives in flat
//! arenas cross-referenced by integer index. Records are created once during
//! assembly; the offset solver later writes each plate's `offset` exactly
//! once, the sleeve builder fills plate rings, and everything downstream
//! treats the graph as read-only.

use std::sync::Arc;

use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::canonical::CanonicalNetwork;
use crate::curve::{cross_section_ring, StrutCurve};
use crate::error::{SolidError, SolidResult};

/// Trimming state of a node, assigned by upstream design-space trimming.
///
/// This engine only ever sees fully trimmed networks, so nodes default to
/// [`NodeState::Inside`]; the tag is carried through for callers that keep
/// their own bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeState {
    #[default]
    Inside,
    Outside,
    Boundary,
}

/// A lattice node: a point where one or more struts meet.
#[derive(Debug, Clone)]
pub struct Node {
    /// 3D position.
    pub position: Point3<f64>,
    /// Strut radius at this node; strictly positive.
    pub radius: f64,
    /// Indices of incident struts.
    pub struts: Vec<usize>,
    /// Indices of plates owned by this node (one per strut, plus one if sharp).
    pub plates: Vec<usize>,
    /// Trimming tag, always `Inside` for networks this engine receives.
    pub state: NodeState,
    /// Set when all incident struts sit in one half-space.
    pub sharp: bool,
}

impl Node {
    /// Strut degree of the node.
    #[inline]
    pub fn degree(&self) -> usize {
        self.struts.len()
    }
}

/// A strut: a (possibly curved) connector between two nodes.
#[derive(Debug, Clone)]
pub struct Strut {
    /// Centerline, oriented from `nodes[0]` to `nodes[1]`.
    pub curve: StrutCurve,
    /// `[start_node, end_node]` indices.
    pub nodes: [usize; 2],
    /// `[start_plate, end_plate]` indices.
    pub plates: [usize; 2],
    /// Radius at each end, copied from the node radii.
    pub radii: [f64; 2],
}

impl Strut {
    /// Average of the two end radii.
    #[inline]
    pub fn mean_radius(&self) -> f64 {
        (self.radii[0] + self.radii[1]) * 0.5
    }
}

/// The cross-section ring where a strut's tube stops retreating from a node.
#[derive(Debug, Clone)]
pub struct Plate {
    /// Owning node index.
    pub node: usize,
    /// Owning strut index, `None` for a synthetic sharp-node plate.
    pub strut: Option<usize>,
    /// Unit normal pointing away from the node.
    pub normal: Vector3<f64>,
    /// Arc-length retreat from the node along the strut. Written once by the
    /// offset solver; stays 0 for plates of degree-1 nodes.
    pub offset: f64,
    /// Ring vertices. True strut plates carry `sides + 1` points with element
    /// 0 the ring center; synthetic sharp plates carry `sides` perimeter
    /// points only. Filled by the sleeve builder (or at creation for
    /// synthetic plates).
    pub ring: Vec<Point3<f64>>,
}

impl Plate {
    /// Whether this is a true strut plate (ring center + perimeter).
    #[inline]
    pub fn is_strut_plate(&self) -> bool {
        self.strut.is_some()
    }
}

/// How node radii are assigned.
///
/// Spatial-gradient radius fields are evaluated externally; this engine only
/// ever calls a black-box function of position.
#[derive(Clone)]
pub enum RadiusSpec {
    /// One radius for every node.
    Constant(f64),
    /// Explicit per-node radii, in canonical node order.
    PerNode(Vec<f64>),
    /// Radius as a function of node position.
    Function(Arc<dyn Fn(Point3<f64>) -> f64 + Send + Sync>),
}

impl std::fmt::Debug for RadiusSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RadiusSpec::Constant(r) => write!(f, "Constant({})", r),
            RadiusSpec::PerNode(v) => write!(f, "PerNode({} entries)", v.len()),
            RadiusSpec::Function(_) => write!(f, "Function(<closure>)"),
        }
    }
}

impl RadiusSpec {
    /// Radius from a function of node position.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(Point3<f64>) -> f64 + Send + Sync + 'static,
    {
        RadiusSpec::Function(Arc::new(f))
    }

    /// Evaluate radii for the given node positions, validating positivity.
    pub fn evaluate(&self, positions: &[Point3<f64>]) -> SolidResult<Vec<f64>> {
        let radii: Vec<f64> = match self {
            RadiusSpec::Constant(r) => vec![*r; positions.len()],
            RadiusSpec::PerNode(v) => {
                if v.len() != positions.len() {
                    return Err(SolidError::radius_count_mismatch(v.len(), positions.len()));
                }
                v.clone()
            }
            RadiusSpec::Function(f) => positions.iter().map(|&p| f(p)).collect(),
        };

        for (idx, &r) in radii.iter().enumerate() {
            if !(r.is_finite() && r > 0.0) {
                return Err(SolidError::invalid_radius(idx, r));
            }
        }
        Ok(radii)
    }
}

/// Arena-backed lattice graph.
#[derive(Debug, Clone, Default)]
pub struct LatticeGraph {
    pub nodes: Vec<Node>,
    pub struts: Vec<Strut>,
    pub plates: Vec<Plate>,
}

impl LatticeGraph {
    /// Assemble the graph from a canonical network and a radius assignment.
    ///
    /// Each strut gets two plates: the start plate's normal is the curve
    /// tangent at its start (pointing away from the start node), the end
    /// plate's normal is the negated tangent at the end.
    pub fn build(network: &CanonicalNetwork, radius: &RadiusSpec) -> SolidResult<Self> {
        if network.struts.is_empty() {
            return Err(SolidError::empty_network(format!(
                "{} curves dropped, none survived",
                network.dropped_total()
            )));
        }

        let radii = radius.evaluate(&network.nodes)?;

        let mut graph = LatticeGraph {
            nodes: network
                .nodes
                .iter()
                .zip(radii.iter())
                .map(|(&position, &radius)| Node {
                    position,
                    radius,
                    struts: Vec::new(),
                    plates: Vec::new(),
                    state: NodeState::Inside,
                    sharp: false,
                })
                .collect(),
            struts: Vec::with_capacity(network.struts.len()),
            plates: Vec::with_capacity(network.struts.len() * 2),
        };

        for canonical in &network.struts {
            let strut_idx = graph.struts.len();
            let [start_node, end_node] = canonical.nodes;

            let start_plate = graph.plates.len();
            let end_plate = start_plate + 1;
            graph.plates.push(Plate {
                node: start_node,
                strut: Some(strut_idx),
                normal: canonical.curve.tangent_at(0.0),
                offset: 0.0,
                ring: Vec::new(),
            });
            graph.plates.push(Plate {
                node: end_node,
                strut: Some(strut_idx),
                normal: -canonical.curve.tangent_at(1.0),
                offset: 0.0,
                ring: Vec::new(),
            });

            graph.nodes[start_node].struts.push(strut_idx);
            graph.nodes[start_node].plates.push(start_plate);
            graph.nodes[end_node].struts.push(strut_idx);
            graph.nodes[end_node].plates.push(end_plate);

            graph.struts.push(Strut {
                curve: canonical.curve.clone(),
                nodes: canonical.nodes,
                plates: [start_plate, end_plate],
                radii: [graph.nodes[start_node].radius, graph.nodes[end_node].radius],
            });
        }

        Ok(graph)
    }

    /// The strut's curve oriented to start at the given node.
    ///
    /// The offset solver and hull builder both reason "outward from the
    /// node", so struts arriving end-first are traversed reversed.
    pub fn curve_from_node(&self, strut_idx: usize, node_idx: usize) -> StrutCurve {
        let strut = &self.struts[strut_idx];
        if strut.nodes[0] == node_idx {
            strut.curve.clone()
        } else {
            strut.curve.reversed()
        }
    }

    /// The plate a strut owns at the given node.
    pub fn plate_at(&self, strut_idx: usize, node_idx: usize) -> usize {
        let strut = &self.struts[strut_idx];
        if strut.nodes[0] == node_idx {
            strut.plates[0]
        } else {
            strut.plates[1]
        }
    }

    /// Detect sharp nodes and append their synthetic plates.
    ///
    /// A node is sharp when every incident plate normal makes an angle of at
    /// least `sharp_angle_deg` with the negated normal sum, which means all
    /// struts are confined to one half-space and the bare hull would collapse
    /// to a sliver. The synthetic plate points along the negated sum, sits
    /// half a radius off the node, and carries a plain `sides`-point ring
    /// with no strut association.
    ///
    /// Call after the offset solver (plate normals are fixed at assembly, so
    /// ordering only matters for the ring positions being final before
    /// hulling).
    pub fn append_sharp_plates(&mut self, sides: usize, sharp_angle_deg: f64) -> usize {
        let threshold_cos = sharp_angle_deg.to_radians().cos();
        let mut appended = 0;

        for node_idx in 0..self.nodes.len() {
            let node = &self.nodes[node_idx];
            if node.degree() < 2 {
                continue;
            }

            let sum: Vector3<f64> = node
                .plates
                .iter()
                .map(|&p| self.plates[p].normal)
                .sum();
            let sum_norm = sum.norm();
            // A balanced node (normals cancel) is not sharp.
            if sum_norm < 1e-9 {
                continue;
            }
            let anti = -sum / sum_norm;

            let is_sharp = node
                .plates
                .iter()
                .all(|&p| anti.dot(&self.plates[p].normal) <= threshold_cos);
            if !is_sharp {
                continue;
            }

            let center = node.position + anti * (node.radius * 0.5);
            let ring = cross_section_ring(&center, &anti, node.radius, sides, 0.0);

            let plate_idx = self.plates.len();
            self.plates.push(Plate {
                node: node_idx,
                strut: None,
                normal: anti,
                offset: node.radius * 0.5,
                ring,
            });
            self.nodes[node_idx].plates.push(plate_idx);
            self.nodes[node_idx].sharp = true;
            appended += 1;
            debug!(node = node_idx, "appended sharp-node plate");
        }

        appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize;

    fn tripod_network() -> CanonicalNetwork {
        let origin = Point3::new(0.0, 0.0, 0.0);
        let curves = vec![
            StrutCurve::line(origin, Point3::new(1.0, 0.0, 0.0)),
            StrutCurve::line(origin, Point3::new(0.0, 1.0, 0.0)),
            StrutCurve::line(origin, Point3::new(0.0, 0.0, 1.0)),
        ];
        canonicalize(&curves, 1e-6, 1e-9)
    }

    #[test]
    fn test_build_cross_references() {
        let net = tripod_network();
        let graph = LatticeGraph::build(&net, &RadiusSpec::Constant(0.1)).unwrap();

        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.struts.len(), 3);
        assert_eq!(graph.plates.len(), 6);

        let center = &graph.nodes[0];
        assert_eq!(center.degree(), 3);
        assert_eq!(center.plates.len(), 3);
        assert_eq!(center.state, NodeState::Inside);

        for (s_idx, strut) in graph.struts.iter().enumerate() {
            let [p0, p1] = strut.plates;
            assert_eq!(graph.plates[p0].strut, Some(s_idx));
            assert_eq!(graph.plates[p0].node, strut.nodes[0]);
            assert_eq!(graph.plates[p1].node, strut.nodes[1]);
        }
    }

    #[test]
    fn test_plate_normals_point_away_from_nodes() {
        let net = tripod_network();
        let graph = LatticeGraph::build(&net, &RadiusSpec::Constant(0.1)).unwrap();

        for strut in &graph.struts {
            let start_normal = graph.plates[strut.plates[0]].normal;
            let end_normal = graph.plates[strut.plates[1]].normal;
            // Along +axis at the shared origin, back along it at the tip.
            assert!((start_normal + end_normal).norm() < 1e-12);
            assert!(start_normal.dot(&strut.curve.tangent_at(0.0)) > 0.99);
        }
    }

    #[test]
    fn test_curve_from_node_reverses() {
        let net = tripod_network();
        let graph = LatticeGraph::build(&net, &RadiusSpec::Constant(0.1)).unwrap();

        // Strut 0 runs origin -> (1,0,0); from the tip it must run back.
        let from_tip = graph.curve_from_node(0, graph.struts[0].nodes[1]);
        assert!((from_tip.start() - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
        assert!((from_tip.end() - Point3::new(0.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_radius_spec_function_and_validation() {
        let net = tripod_network();
        let spec = RadiusSpec::from_fn(|p| 0.05 + 0.1 * p.x.abs());
        let graph = LatticeGraph::build(&net, &spec).unwrap();
        assert!(graph.nodes.iter().all(|n| n.radius > 0.0));

        let bad = RadiusSpec::Constant(0.0);
        assert!(LatticeGraph::build(&net, &bad).is_err());

        let mismatched = RadiusSpec::PerNode(vec![0.1; 2]);
        assert!(LatticeGraph::build(&net, &mismatched).is_err());
    }

    #[test]
    fn test_tripod_center_is_sharp() {
        let net = tripod_network();
        let mut graph = LatticeGraph::build(&net, &RadiusSpec::Constant(0.1)).unwrap();

        let appended = graph.append_sharp_plates(8, 90.0);
        // All three struts leave the origin into one octant: sharp.
        assert_eq!(appended, 1);
        assert!(graph.nodes[0].sharp);
        assert_eq!(graph.nodes[0].plates.len(), 4);

        let synthetic = &graph.plates[*graph.nodes[0].plates.last().unwrap()];
        assert!(synthetic.strut.is_none());
        assert_eq!(synthetic.ring.len(), 8);
        // Normal points into the empty octant.
        let expected = -Vector3::new(1.0, 1.0, 1.0).normalize();
        assert!((synthetic.normal - expected).norm() < 1e-9);
    }

    #[test]
    fn test_collinear_node_not_sharp() {
        let curves = vec![
            StrutCurve::line(Point3::new(-1.0, 0.0, 0.0), Point3::new(0.0, 0.0, 0.0)),
            StrutCurve::line(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)),
        ];
        let net = canonicalize(&curves, 1e-6, 1e-9);
        let mut graph = LatticeGraph::build(&net, &RadiusSpec::Constant(0.1)).unwrap();

        // Opposite normals cancel; the balanced node must not be flagged.
        assert_eq!(graph.append_sharp_plates(8, 90.0), 0);
        assert!(!graph.nodes.iter().any(|n| n.sharp));
    }
}
