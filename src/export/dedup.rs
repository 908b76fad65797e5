//! Index tables for compact output.
//!
//! Vertices and normals are keyed by their [`Quantized`] value, so anything
//! that prints the same shares one output index. Colors are keyed exactly.
//! The [`UseTable`] decides whether a named definition is emitted in full or
//! referenced.

use super::format::Quantized;
use crate::mesh::canonical::smooth_normals;
use crate::scene::SurfaceMesh;
use crate::types::Color;
use glam::Vec3;
use std::collections::HashMap;

/// Mapping from input indices to deduplicated output indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexMap {
    /// Output index for each input, `None` for skipped inputs.
    pub map: Vec<Option<u32>>,
    /// Output values in index order.
    pub values: Vec<Vec3>,
}

impl IndexMap {
    pub fn get(&self, index: u32) -> Option<u32> {
        self.map.get(index as usize).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn quantized_map(values: impl Iterator<Item = Option<Vec3>>) -> IndexMap {
    let mut keys: HashMap<Quantized, u32> = HashMap::new();
    let mut out = IndexMap::default();
    for value in values {
        let index = value.map(|v| {
            *keys.entry(Quantized::of(v)).or_insert_with(|| {
                out.values.push(v);
                (out.values.len() - 1) as u32
            })
        });
        out.map.push(index);
    }
    out
}

/// Index the vertices marked in `used`, skipping any with a NaN component.
/// Vertices that round to the same triad share an index.
pub fn coordinate_map(vertices: &[Vec3], used: &[bool]) -> IndexMap {
    quantized_map(vertices.iter().enumerate().map(|(i, v)| {
        let wanted = used.get(i).copied().unwrap_or(false);
        (wanted && !v.is_nan()).then_some(*v)
    }))
}

/// Index normals by their rounded triad. Non-finite normals become zero.
pub fn normal_map(normals: &[Vec3], used: &[bool]) -> IndexMap {
    quantized_map(normals.iter().enumerate().map(|(i, n)| {
        let wanted = used.get(i).copied().unwrap_or(false);
        wanted.then(|| if n.is_finite() { *n } else { Vec3::ZERO })
    }))
}

/// Distinct colors in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorList {
    pub colors: Vec<Color>,
    index: HashMap<Color, u32>,
}

impl ColorList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `color`, adding it if it is new.
    pub fn insert(&mut self, color: Color) -> u32 {
        let colors = &mut self.colors;
        *self.index.entry(color).or_insert_with(|| {
            colors.push(color);
            (colors.len() - 1) as u32
        })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// Split a polygon into triangles: a quad `[a, b, c, d]` becomes `[a, b, c]`
/// and `[a, c, d]`; larger polygons are fanned the same way.
pub fn triangulate(polygon: &[u32]) -> impl Iterator<Item = [u32; 3]> + '_ {
    let count = polygon.len().saturating_sub(2);
    (0..count).map(move |i| [polygon[0], polygon[i + 1], polygon[i + 2]])
}

/// Result of a definition lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UseRef {
    /// First request for this key: emit the definition under this id.
    Define(String),
    /// Already defined: refer to this id.
    Reuse(String),
}

/// Definition/reference cache for one export pass.
///
/// Ids are `_0`, `_1`, ... in order of first request.
#[derive(Debug, Clone, Default)]
pub struct UseTable {
    ids: HashMap<String, String>,
}

impl UseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &str) -> UseRef {
        if let Some(id) = self.ids.get(key) {
            return UseRef::Reuse(id.clone());
        }
        let id = format!("_{}", self.ids.len());
        self.ids.insert(key.to_string(), id.clone());
        UseRef::Define(id)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ids.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One output triangle of a prepared surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceFace {
    pub position: [u32; 3],
    pub normal: [u32; 3],
    /// Color indices per corner; all three equal for per-polygon colors.
    pub color: Option<[u32; 3]>,
}

/// A surface after deduplication, ready for any writer.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSurface {
    /// Distinct positions, offset applied.
    pub positions: Vec<Vec3>,
    /// Distinct normals.
    pub normals: Vec<Vec3>,
    /// Normal index of the first corner seen at each position.
    pub position_normals: Vec<u32>,
    /// Distinct colors; empty for a solid surface.
    pub colors: ColorList,
    /// Color index of the first corner seen at each position.
    pub position_colors: Option<Vec<u32>>,
    pub faces: Vec<SurfaceFace>,
    pub color: Color,
    pub per_polygon_colors: bool,
}

impl PreparedSurface {
    /// Dedup a surface. Returns `None` when nothing drawable is left.
    pub fn prepare(surface: &SurfaceMesh) -> Option<PreparedSurface> {
        let vertex_count = surface.vertices.len();
        if vertex_count == 0 {
            return None;
        }

        let mut triangles: Vec<(usize, [u32; 3])> = Vec::new();
        for (i, polygon) in surface.polygons.iter().enumerate() {
            if !surface.is_selected(i) {
                continue;
            }
            if polygon.iter().any(|&v| v as usize >= vertex_count) {
                log::debug!("surface polygon {} references a missing vertex", i);
                continue;
            }
            triangles.extend(triangulate(polygon).map(|t| (i, t)));
        }

        let mut used = vec![false; vertex_count];
        for (_, t) in &triangles {
            for &v in t {
                used[v as usize] = true;
            }
        }

        let offset_vertices: Vec<Vec3> = surface.vertices.iter().map(|v| *v + surface.offset).collect();
        let coords = coordinate_map(&offset_vertices, &used);

        let computed;
        let normals: &[Vec3] = match &surface.normals {
            Some(n) if n.len() >= vertex_count => n,
            _ => {
                let faces: Vec<[u32; 3]> = triangles.iter().map(|(_, t)| *t).collect();
                computed = smooth_normals(&surface.vertices, &faces);
                &computed
            }
        };
        let normal_index = normal_map(normals, &used);

        let per_polygon_colors = surface.polygon_colors.is_some();
        let mut colors = ColorList::new();
        let mut faces = Vec::with_capacity(triangles.len());
        let mut position_normals = vec![u32::MAX; coords.len()];
        let mut position_colors = vec![u32::MAX; coords.len()];

        for (polygon, t) in triangles {
            let position = match (coords.get(t[0]), coords.get(t[1]), coords.get(t[2])) {
                (Some(a), Some(b), Some(c)) => [a, b, c],
                _ => continue,
            };
            let normal = [
                normal_index.get(t[0]).unwrap_or(0),
                normal_index.get(t[1]).unwrap_or(0),
                normal_index.get(t[2]).unwrap_or(0),
            ];
            let color = if let Some(pc) = &surface.polygon_colors {
                let c = colors.insert(pc.get(polygon).copied().unwrap_or(surface.color));
                Some([c; 3])
            } else {
                surface.vertex_colors.as_ref().map(|vc| {
                    t.map(|v| colors.insert(vc.get(v as usize).copied().unwrap_or(surface.color)))
                })
            };
            for k in 0..3 {
                let p = position[k] as usize;
                if position_normals[p] == u32::MAX {
                    position_normals[p] = normal[k];
                }
                if let Some(c) = color {
                    if position_colors[p] == u32::MAX {
                        position_colors[p] = c[k];
                    }
                }
            }
            faces.push(SurfaceFace {
                position,
                normal,
                color,
            });
        }

        if faces.is_empty() {
            return None;
        }

        let has_colors = !colors.is_empty();
        Some(PreparedSurface {
            positions: coords.values,
            normals: normal_index.values,
            position_normals: position_normals
                .into_iter()
                .map(|n| if n == u32::MAX { 0 } else { n })
                .collect(),
            position_colors: has_colors.then(|| {
                position_colors
                    .into_iter()
                    .map(|c| if c == u32::MAX { 0 } else { c })
                    .collect()
            }),
            colors,
            faces,
            color: surface.color,
            per_polygon_colors,
        })
    }

    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty()
    }

    /// Display color of one face: its polygon color, or the mean of its corners.
    pub fn face_color(&self, face: &SurfaceFace) -> Color {
        match face.color {
            Some(c) => {
                let corners: Vec<Color> = c
                    .iter()
                    .filter_map(|&i| self.colors.colors.get(i as usize).copied())
                    .collect();
                Color::average(&corners).unwrap_or(self.color)
            }
            None => self.color,
        }
    }

    pub fn vertex_normal(&self, position: usize) -> Vec3 {
        self.position_normals
            .get(position)
            .and_then(|&n| self.normals.get(n as usize))
            .copied()
            .unwrap_or(Vec3::ZERO)
    }

    pub fn vertex_color(&self, position: usize) -> Color {
        self.position_colors
            .as_ref()
            .and_then(|pc| pc.get(position))
            .and_then(|&c| self.colors.colors.get(c as usize))
            .copied()
            .unwrap_or(self.color)
    }
}
