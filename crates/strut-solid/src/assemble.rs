//! Final mesh assembly: merge, weld, winding, normals.
//!
//! Sub-meshes arrive with exact shared boundaries (sleeve end rings reappear
//! verbatim as hull/cap boundaries), so a tolerance weld along the seams is
//! all it takes to close the surface. Any sub-mesh may be missing — a
//! skipped sleeve, a failed hull — and assembly simply proceeds with what it
//! has.

use hashbrown::{HashMap, HashSet};
use nalgebra::{Point3, Vector3};
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::types::{Mesh, Triangle};

/// Counters from the assembly phase.
#[derive(Debug, Clone, Default)]
pub struct AssembleStats {
    /// Sub-meshes merged.
    pub merged_parts: usize,
    /// Vertices merged by the seam weld.
    pub welded_vertices: usize,
    /// Faces dropped because welding collapsed them.
    pub collapsed_faces: usize,
    /// Faces flipped while unifying winding.
    pub flipped_faces: usize,
}

/// Merge sub-meshes into one watertight solid.
///
/// Welds vertices within `tolerance`, drops faces the weld collapsed,
/// unifies winding so normals point outward, and computes area-weighted
/// vertex normals.
pub fn assemble(parts: Vec<Mesh>, tolerance: f64) -> (Mesh, AssembleStats) {
    let mut stats = AssembleStats {
        merged_parts: parts.len(),
        ..Default::default()
    };

    let mut mesh = Mesh::new();
    for part in &parts {
        mesh.append(part);
    }
    debug!(
        parts = parts.len(),
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "merged sub-meshes"
    );

    if mesh.is_empty() {
        return (mesh, stats);
    }

    let before_faces = mesh.face_count();
    stats.welded_vertices = weld_vertices(&mut mesh, tolerance);
    stats.collapsed_faces = before_faces - mesh.face_count();

    stats.flipped_faces = unify_winding(&mut mesh);
    compute_vertex_normals(&mut mesh);

    info!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        welded = stats.welded_vertices,
        flipped = stats.flipped_faces,
        "assembled mesh"
    );

    (mesh, stats)
}

#[inline]
fn cell_of(p: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (p.x / cell_size).floor() as i64,
        (p.y / cell_size).floor() as i64,
        (p.z / cell_size).floor() as i64,
    )
}

/// Weld vertices within `tolerance` of each other and compact the vertex
/// array. Returns the number of vertices merged away.
///
/// Spatial hash with 2ε cells, so every weld candidate sits in the 3×3×3
/// cell neighborhood; clusters resolve to their smallest vertex index, which
/// keeps re-assembly deterministic.
pub fn weld_vertices(mesh: &mut Mesh, tolerance: f64) -> usize {
    if mesh.vertices.is_empty() {
        return 0;
    }
    let cell_size = (tolerance * 2.0).max(f64::MIN_POSITIVE);

    let mut cells: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        cells
            .entry(cell_of(&vertex.position, cell_size))
            .or_default()
            .push(idx as u32);
    }

    let mut remap: Vec<u32> = (0..mesh.vertices.len() as u32).collect();
    let mut merged = 0usize;

    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        let idx = idx as u32;
        if remap[idx as usize] != idx {
            continue;
        }
        let (cx, cy, cz) = cell_of(&vertex.position, cell_size);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = cells.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &other in candidates {
                        if other <= idx || remap[other as usize] != other {
                            continue;
                        }
                        let dist = (mesh.vertices[other as usize].position - vertex.position).norm();
                        if dist <= tolerance {
                            remap[other as usize] = idx;
                            merged += 1;
                        }
                    }
                }
            }
        }
    }

    if merged == 0 {
        return 0;
    }

    // Resolve transitive merges, then compact surviving vertices in order.
    for i in 0..remap.len() {
        let mut target = remap[i];
        while remap[target as usize] != target {
            target = remap[target as usize];
        }
        remap[i] = target;
    }

    let mut compact: Vec<u32> = vec![u32::MAX; mesh.vertices.len()];
    let mut survivors = Vec::with_capacity(mesh.vertices.len() - merged);
    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        if remap[idx] == idx as u32 {
            compact[idx] = survivors.len() as u32;
            survivors.push(vertex.clone());
        }
    }
    mesh.vertices = survivors;

    for face in &mut mesh.faces {
        for v in face.iter_mut() {
            *v = compact[remap[*v as usize] as usize];
        }
    }
    mesh.faces
        .retain(|&[a, b, c]| a != b && b != c && a != c);

    merged
}

/// Direction of edge (a, b) inside a face: `Some(true)` if traversed a→b,
/// `Some(false)` if b→a, `None` if absent.
fn edge_direction(face: &[u32; 3], a: u32, b: u32) -> Option<bool> {
    for i in 0..3 {
        let v0 = face[i];
        let v1 = face[(i + 1) % 3];
        if v0 == a && v1 == b {
            return Some(true);
        }
        if v0 == b && v1 == a {
            return Some(false);
        }
    }
    None
}

/// Make winding consistent via BFS over shared edges, then orient the whole
/// mesh outward using its signed volume. Returns the number of faces
/// flipped.
pub fn unify_winding(mesh: &mut Mesh) -> usize {
    if mesh.faces.is_empty() {
        return 0;
    }

    let mut edge_faces: HashMap<(u32, u32), Vec<u32>> = HashMap::new();
    for (f_idx, face) in mesh.faces.iter().enumerate() {
        for e in 0..3 {
            let a = face[e];
            let b = face[(e + 1) % 3];
            let key = if a < b { (a, b) } else { (b, a) };
            edge_faces.entry(key).or_default().push(f_idx as u32);
        }
    }

    let face_count = mesh.faces.len() as u32;
    let mut visited: HashSet<u32> = HashSet::new();
    let mut to_flip: HashSet<u32> = HashSet::new();

    for start in 0..face_count {
        if visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        visited.insert(start);

        while let Some(f_idx) = queue.pop_front() {
            let face = mesh.faces[f_idx as usize];
            for e in 0..3 {
                let a = face[e];
                let b = face[(e + 1) % 3];
                let key = if a < b { (a, b) } else { (b, a) };
                let Some(neighbors) = edge_faces.get(&key) else {
                    continue;
                };
                for &n_idx in neighbors {
                    if n_idx == f_idx || visited.contains(&n_idx) {
                        continue;
                    }
                    visited.insert(n_idx);

                    // Consistent neighbors traverse a shared edge in opposite
                    // directions; same direction means one face is flipped
                    // relative to the other.
                    let same_dir = edge_direction(&mesh.faces[n_idx as usize], a, b)
                        .unwrap_or_default();
                    let flip = if to_flip.contains(&f_idx) {
                        !same_dir
                    } else {
                        same_dir
                    };
                    if flip {
                        to_flip.insert(n_idx);
                    }
                    queue.push_back(n_idx);
                }
            }
        }
    }

    for &f_idx in &to_flip {
        mesh.faces[f_idx as usize].swap(1, 2);
    }
    let mut flipped = to_flip.len();

    // Consistent is not necessarily outward: a negative enclosed volume
    // means the whole surface is inside-out.
    if mesh.signed_volume() < 0.0 {
        for face in &mut mesh.faces {
            face.swap(1, 2);
        }
        flipped += mesh.faces.len();
        debug!("flipped inside-out mesh");
    }

    flipped
}

/// Compute vertex normals as the area-weighted average of adjacent face
/// normals.
pub fn compute_vertex_normals(mesh: &mut Mesh) {
    let mut accum: Vec<Vector3<f64>> = vec![Vector3::zeros(); mesh.vertices.len()];

    for face in &mesh.faces {
        let tri = Triangle::new(
            mesh.vertices[face[0] as usize].position,
            mesh.vertices[face[1] as usize].position,
            mesh.vertices[face[2] as usize].position,
        );
        // Unnormalized cross product has length 2·area: free area weighting.
        let weighted = tri.normal_unnormalized();
        for &v in face {
            accum[v as usize] += weighted;
        }
    }

    for (vertex, sum) in mesh.vertices.iter_mut().zip(accum) {
        let len_sq = sum.norm_squared();
        vertex.normal = (len_sq > f64::EPSILON).then(|| sum / len_sq.sqrt());
    }
}
