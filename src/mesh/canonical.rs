//! Unit-scale meshes for the basic solids.
//!
//! Every generator is a pure function of its shape parameters. Placed
//! instances are produced by combining these with a [`Placement`] from the
//! solver, so the geometry itself never depends on scene state.
//!
//! Conventions:
//! - circle, cone and cylinder lie around the local z axis, radius 1;
//! - cone apex and cylinder top sit at z = 1;
//! - sphere vertices are on the unit sphere and double as normals.
//!
//! [`Placement`]: crate::types::Placement

use super::{MeshData, Vertex};
use glam::Vec3;
use std::collections::HashMap;

/// Segments per revolution for circles, cones and cylinders (10 degrees each).
pub const DEFAULT_SEGMENTS: u32 = 36;

/// Subdivision level of the geodesic sphere.
pub const DEFAULT_SPHERE_LEVEL: u32 = 2;

/// Triangles with an edge shorter than this (squared) are degenerate.
pub const MIN_EDGE_LENGTH_SQUARED: f32 = 1e-10;

fn ring_point(i: f64, segments: u32) -> (f32, f32) {
    let angle = (i * 360.0 / segments as f64).to_radians();
    (angle.cos() as f32, angle.sin() as f32)
}

/// Flat disk in the xy plane: `n` rim vertices plus the center at index `n`,
/// fanned into `n` triangles. All normals are +z.
pub fn unit_circle(segments: u32) -> MeshData {
    let n = segments.max(3);
    let mut mesh = MeshData::with_capacity(n as usize + 1, n as usize);
    for i in 0..n {
        let (x, y) = ring_point(i as f64, n);
        mesh.add_vertex(Vertex::new(Vec3::new(x, y, 0.0), Vec3::Z));
    }
    let center = mesh.add_vertex(Vertex::new(Vec3::ZERO, Vec3::Z));
    for i in 0..n {
        mesh.add_triangle(i, (i + 1) % n, center);
    }
    mesh
}

/// Cone with its base ring at z = 0 and apex at (0, 0, 1).
///
/// Positions double as normals; placement renormalizes them.
pub fn unit_cone(segments: u32) -> MeshData {
    let n = segments.max(3);
    let mut mesh = MeshData::with_capacity(n as usize + 1, n as usize);
    for i in 0..n {
        let (x, y) = ring_point(i as f64, n);
        let p = Vec3::new(x, y, 0.0);
        mesh.add_vertex(Vertex::new(p, p));
    }
    let apex = mesh.add_vertex(Vertex::new(Vec3::Z, Vec3::Z));
    for i in 0..n {
        mesh.add_triangle(i, (i + 1) % n, apex);
    }
    mesh
}

/// Open tube between z = 0 and z = 1.
///
/// The top ring is rotated half a step so no two triangles collapse into a
/// zero-area quad. Normals are radial; with `inward` they point at the axis
/// and every face is wound the other way, for the interior wall of a tube.
pub fn unit_cylinder(segments: u32, inward: bool) -> MeshData {
    let n = segments.max(3);
    let mut mesh = MeshData::with_capacity(2 * n as usize, 2 * n as usize);
    let sign = if inward { -1.0 } else { 1.0 };
    let mut radial = Vec::with_capacity(n as usize);
    for i in 0..n {
        let (x, y) = ring_point(i as f64, n);
        let normal = Vec3::new(x, y, 0.0) * sign;
        radial.push(normal);
        mesh.add_vertex(Vertex::new(Vec3::new(x, y, 0.0), normal));
    }
    for (i, normal) in radial.into_iter().enumerate() {
        let (x, y) = ring_point(i as f64 + 0.5, n);
        mesh.add_vertex(Vertex::new(Vec3::new(x, y, 1.0), normal));
    }
    for i in 0..n {
        let next = (i + 1) % n;
        if inward {
            mesh.add_triangle(i + n, next, i);
            mesh.add_triangle(i + n, next + n, next);
        } else {
            mesh.add_triangle(i, next, i + n);
            mesh.add_triangle(next, next + n, i + n);
        }
    }
    mesh
}

const ICOSAHEDRON_FACES: [[u32; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

fn icosahedron_vertices() -> Vec<Vec3> {
    let t = (1.0 + 5.0f32.sqrt()) / 2.0;
    [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ]
    .into_iter()
    .map(|(x, y, z)| Vec3::new(x, y, z).normalize())
    .collect()
}

/// Geodesic sphere: an icosahedron with each triangle split into four,
/// `level` times, and every vertex pushed back onto the unit sphere.
///
/// Level 0 has 12 vertices and 20 faces; each level multiplies the faces by 4
/// (level 2: 162 vertices, 320 faces).
pub fn unit_sphere(level: u32) -> MeshData {
    let mut positions = icosahedron_vertices();
    let mut faces = ICOSAHEDRON_FACES.to_vec();

    for _ in 0..level {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
        let mut next_faces = Vec::with_capacity(faces.len() * 4);
        for [a, b, c] in faces {
            let ab = midpoint(&mut positions, &mut midpoints, a, b);
            let bc = midpoint(&mut positions, &mut midpoints, b, c);
            let ca = midpoint(&mut positions, &mut midpoints, c, a);
            next_faces.push([a, ab, ca]);
            next_faces.push([b, bc, ab]);
            next_faces.push([c, ca, bc]);
            next_faces.push([ab, bc, ca]);
        }
        faces = next_faces;
    }

    MeshData {
        vertices: positions.into_iter().map(|p| Vertex::new(p, p)).collect(),
        faces,
    }
}

fn midpoint(
    positions: &mut Vec<Vec3>,
    cache: &mut HashMap<(u32, u32), u32>,
    a: u32,
    b: u32,
) -> u32 {
    let key = if a < b { (a, b) } else { (b, a) };
    *cache.entry(key).or_insert_with(|| {
        let p = ((positions[a as usize] + positions[b as usize]) * 0.5).normalize();
        positions.push(p);
        (positions.len() - 1) as u32
    })
}

/// A single triangle through the given points, with the face normal
/// `normalize((p3 - p1) x (p2 - p1))` on all three vertices.
///
/// Returns `None` for a degenerate triangle.
pub fn unit_triangle(p1: Vec3, p2: Vec3, p3: Vec3) -> Option<MeshData> {
    if is_degenerate(p1, p2, p3) {
        return None;
    }
    let normal = (p3 - p1).cross(p2 - p1).try_normalize()?;
    let mut mesh = MeshData::with_capacity(3, 1);
    for p in [p1, p2, p3] {
        mesh.add_vertex(Vertex::new(p, normal));
    }
    mesh.add_triangle(0, 1, 2);
    Some(mesh)
}

/// True when any edge is shorter than [`MIN_EDGE_LENGTH_SQUARED`] allows.
pub fn is_degenerate(p1: Vec3, p2: Vec3, p3: Vec3) -> bool {
    p1.distance_squared(p2) < MIN_EDGE_LENGTH_SQUARED
        || p2.distance_squared(p3) < MIN_EDGE_LENGTH_SQUARED
        || p3.distance_squared(p1) < MIN_EDGE_LENGTH_SQUARED
}

/// Per-vertex normals averaged from the faces around each vertex.
///
/// Degenerate faces are left out of the sums. Vertices with no usable face
/// get a zero normal.
pub fn smooth_normals(positions: &[Vec3], faces: &[[u32; 3]]) -> Vec<Vec3> {
    let mut sums = vec![Vec3::ZERO; positions.len()];
    for &[a, b, c] in faces {
        let (Some(&pa), Some(&pb), Some(&pc)) = (
            positions.get(a as usize),
            positions.get(b as usize),
            positions.get(c as usize),
        ) else {
            continue;
        };
        if is_degenerate(pa, pb, pc) || !(pa.is_finite() && pb.is_finite() && pc.is_finite()) {
            continue;
        }
        let n = (pb - pa).cross(pc - pa);
        sums[a as usize] += n;
        sums[b as usize] += n;
        sums[c as usize] += n;
    }
    sums.into_iter().map(|n| n.normalize_or_zero()).collect()
}
