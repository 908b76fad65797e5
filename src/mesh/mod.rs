//! Triangle meshes: canonical unit shapes and the solver that places them.

pub mod canonical;
pub mod solver;

use crate::types::Placement;
use glam::Vec3;

/// A vertex in a canonical or placed mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in 3D space.
    pub position: Vec3,
    /// Unit normal.
    pub normal: Vec3,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self { position, normal }
    }
}

/// A triangle mesh with per-vertex normals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex data.
    pub vertices: Vec<Vertex>,
    /// Triangles as vertex index triples.
    pub faces: Vec<[u32; 3]>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertices: usize, faces: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            faces: Vec::with_capacity(faces),
        }
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, vertex: Vertex) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(vertex);
        index
    }

    /// Add a triangle by vertex indices.
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.faces.push([i0, i1, i2]);
    }

    /// Get the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices.iter().map(|v| v.position)
    }

    pub fn normals(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices.iter().map(|v| v.normal)
    }

    /// Copy of this mesh with positions and normals mapped through `placement`.
    pub fn placed(&self, placement: &Placement) -> MeshData {
        MeshData {
            vertices: self
                .vertices
                .iter()
                .map(|v| Vertex::new(placement.apply(v.position), placement.apply_normal(v.normal)))
                .collect(),
            faces: self.faces.clone(),
        }
    }
}
