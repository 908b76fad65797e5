//! Wavefront OBJ export.
//!
//! Every primitive becomes its own group of placed triangles. Materials go
//! to a companion `.mtl` file, one entry per color, and surfaces with color
//! arrays get a PNG texture with one 3x3 pixel block per face.

use super::dedup::{coordinate_map, normal_map, PreparedSurface};
use super::format::{opacity_fraction, rgb_fractional, round, triad};
use super::sink::{write_side_file, OutputTarget, SideFile};
use super::space::{CrossSection, Cylinder};
use super::{Output, SceneWriter};
use crate::error::Result;
use crate::mesh::canonical::{
    unit_circle, unit_cone, unit_cylinder, unit_sphere, unit_triangle, DEFAULT_SEGMENTS,
    DEFAULT_SPHERE_LEVEL,
};
use crate::mesh::solver::{axis_transform, elliptical_axis_transform, frame_transform};
use crate::mesh::MeshData;
use crate::types::{Color, Endcap, Placement};
use glam::Vec3;
use image::ImageEncoder;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::fs;
use std::io::Write;

/// Pixels per side of each face's color block.
const TEXTURE_BLOCK: u32 = 3;

/// A face corner: position and normal index, both 0-based within the group.
type Corner = [u32; 2];

/// The unit meshes, built once per export.
struct Shapes {
    sphere: MeshData,
    cylinder: MeshData,
    cylinder_inside: MeshData,
    cone: MeshData,
    circle: MeshData,
}

impl Shapes {
    fn new() -> Self {
        Self {
            sphere: unit_sphere(DEFAULT_SPHERE_LEVEL),
            cylinder: unit_cylinder(DEFAULT_SEGMENTS, false),
            cylinder_inside: unit_cylinder(DEFAULT_SEGMENTS, true),
            cone: unit_cone(DEFAULT_SEGMENTS),
            circle: unit_circle(DEFAULT_SEGMENTS),
        }
    }
}

/// OBJ writer with MTL and PNG side files.
pub struct ObjWriter {
    shapes: Shapes,
    mtl: String,
    materials: HashSet<Color>,
    counters: HashMap<&'static str, usize>,
    vertex_origin: u32,
    normal_origin: u32,
    texture_origin: u32,
    textures: Vec<SideFile>,
    written: Vec<OutputTarget>,
}

impl Default for ObjWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Material name for a solid color.
pub fn material_name(color: Color) -> String {
    format!("k{}", color.hex())
}

/// Columns and rows of a texture holding one block per face, as close to
/// square as possible.
pub fn texture_grid(faces: usize) -> (u32, u32) {
    let faces = faces.max(1) as u32;
    let width = (faces as f64).sqrt().ceil() as u32;
    let height = faces.div_ceil(width);
    (width, height)
}

/// RGBA pixels for a face-color texture. Faces fill rows from the bottom of
/// the image up, matching texture coordinates with v growing upwards.
pub fn texture_pixels(colors: &[Color], width: u32, height: u32) -> Vec<u8> {
    let stride = (width * TEXTURE_BLOCK) as usize;
    let mut pixels = vec![0u8; stride * (height * TEXTURE_BLOCK) as usize * 4];
    for (i, color) in colors.iter().enumerate() {
        let col = i as u32 % width;
        let row = height - 1 - i as u32 / width;
        for k in 0..TEXTURE_BLOCK {
            for j in 0..TEXTURE_BLOCK {
                let x = (col * TEXTURE_BLOCK + j) as usize;
                let y = (row * TEXTURE_BLOCK + k) as usize;
                let at = (y * stride + x) * 4;
                pixels[at..at + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
            }
        }
    }
    pixels
}

fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png);
    encoder.write_image(pixels, width, height, image::ExtendedColorType::Rgba8)?;
    Ok(png)
}

impl ObjWriter {
    pub fn new() -> Self {
        Self {
            shapes: Shapes::new(),
            mtl: String::new(),
            materials: HashSet::new(),
            counters: HashMap::new(),
            vertex_origin: 1,
            normal_origin: 1,
            texture_origin: 1,
            textures: Vec::new(),
            written: Vec::new(),
        }
    }

    fn next_name(&mut self, kind: &'static str) -> String {
        let n = self.counters.entry(kind).or_insert(0);
        *n += 1;
        format!("{}{}", kind, n)
    }

    fn write_material(&mut self, name: &str, color: Color) -> Result<()> {
        writeln!(self.mtl)?;
        writeln!(self.mtl, "newmtl {}", name)?;
        writeln!(self.mtl, " Ns 163")?;
        writeln!(self.mtl, " Tr {}", round(opacity_fraction(color)))?;
        writeln!(self.mtl, " Ni 0.001")?;
        writeln!(self.mtl, " illum 2")?;
        writeln!(self.mtl, " Ka 0.20 0.20 0.20")?;
        writeln!(self.mtl, " Kd {}", rgb_fractional(color))?;
        writeln!(self.mtl, " Ks 0.25 0.25 0.25")?;
        Ok(())
    }

    /// Name of the shared material for `color`, defining it on first use.
    fn solid_material(&mut self, color: Color) -> Result<String> {
        let name = material_name(color);
        if self.materials.insert(color) {
            self.write_material(&name, color)?;
        }
        Ok(name)
    }

    /// One `g` group. `texture` is the grid size when each face has its own
    /// texture coordinate.
    #[allow(clippy::too_many_arguments)]
    fn write_group(
        &mut self,
        out: &mut Output,
        name: &str,
        material: &str,
        positions: &[Vec3],
        normals: &[Vec3],
        faces: &[[Corner; 3]],
        texture: Option<(u32, u32)>,
    ) -> Result<()> {
        writeln!(out)?;
        writeln!(out, "g {}", name)?;
        writeln!(out, "usemtl {}", material)?;
        writeln!(out, "# Number of vertices: {}", positions.len())?;
        for p in positions {
            writeln!(out, "v {}", triad(*p))?;
        }
        writeln!(out, "# Number of normals: {}", normals.len())?;
        for n in normals {
            writeln!(out, "vn {}", triad(*n))?;
        }
        if let Some((width, height)) = texture {
            writeln!(out, "# Number of texture coordinates: {}", faces.len())?;
            'rows: for row in 0..height {
                let v = (row as f32 + 0.5) / height as f32;
                for col in 0..width {
                    if (row * width + col) as usize == faces.len() {
                        break 'rows;
                    }
                    let u = (col as f32 + 0.5) / width as f32;
                    writeln!(out, "vt {} {}", u, v)?;
                }
            }
        }
        writeln!(out, "# Number of faces: {}", faces.len())?;
        for (i, face) in faces.iter().enumerate() {
            write!(out, "f")?;
            for [p, n] in face {
                let v = p + self.vertex_origin;
                let vn = n + self.normal_origin;
                match texture {
                    Some(_) => write!(out, " {}/{}/{}", v, self.texture_origin + i as u32, vn)?,
                    None => write!(out, " {}//{}", v, vn)?,
                }
            }
            writeln!(out)?;
        }
        self.vertex_origin += positions.len() as u32;
        self.normal_origin += normals.len() as u32;
        if texture.is_some() {
            self.texture_origin += faces.len() as u32;
        }
        Ok(())
    }

    /// Dedup a placed mesh and write it as one group.
    fn write_mesh(&mut self, out: &mut Output, kind: &'static str, mesh: &MeshData, color: Color) -> Result<()> {
        let material = self.solid_material(color)?;
        let name = self.next_name(kind);
        let used = vec![true; mesh.vertex_count()];
        let positions: Vec<Vec3> = mesh.positions().collect();
        let normals: Vec<Vec3> = mesh.normals().collect();
        let coords = coordinate_map(&positions, &used);
        let normal_index = normal_map(&normals, &used);
        let faces: Vec<[Corner; 3]> = mesh
            .faces
            .iter()
            .filter_map(|face| {
                let corner = |v: u32| Some([coords.get(v)?, normal_index.get(v)?]);
                Some([corner(face[0])?, corner(face[1])?, corner(face[2])?])
            })
            .collect();
        self.write_group(out, &name, &material, &coords.values, &normal_index.values, &faces, None)
    }

    fn disk(&mut self, out: &mut Output, kind: &'static str, placement: &Placement, color: Color) -> Result<()> {
        let mesh = self.shapes.circle.placed(placement);
        self.write_mesh(out, kind, &mesh, color)
    }

    fn texture_for(&mut self, out: &Output, name: &str, surface: &PreparedSurface) -> Result<(u32, u32)> {
        let (width, height) = texture_grid(surface.faces.len());
        let colors: Vec<Color> = surface.faces.iter().map(|f| surface.face_color(f)).collect();
        let pixels = texture_pixels(&colors, width, height);
        let png = encode_png(&pixels, width * TEXTURE_BLOCK, height * TEXTURE_BLOCK)?;
        let target = out.target().sibling(&format!("_{}.png", name));
        let side = write_side_file(target.clone(), &png, Some(format!("{}x{}", width, height)))?;
        self.written.push(target);
        self.textures.push(side);
        writeln!(self.mtl, " map_Kd {}", self.texture_file_name(out, name))?;
        writeln!(self.mtl, " map_Ka {}", self.texture_file_name(out, name))?;
        Ok((width, height))
    }

    fn texture_file_name(&self, out: &Output, name: &str) -> String {
        format!("{}_{}.png", out.target().stem(), name)
    }
}

impl SceneWriter for ObjWriter {
    fn driver_name(&self) -> &'static str {
        "OBJ"
    }

    fn begin(&mut self, out: &mut Output) -> Result<()> {
        let banner = format!("# Created by scene-export {}", env!("CARGO_PKG_VERSION"));
        writeln!(self.mtl, "{}", banner)?;
        writeln!(out, "{}", banner)?;
        for line in out.scene.perspective_lines() {
            writeln!(out, "# {}", line)?;
        }
        writeln!(out)?;
        writeln!(out, "mtllib {}.mtl", out.target().stem())?;
        Ok(())
    }

    fn emit_sphere(&mut self, out: &mut Output, center: Vec3, radius: f32, color: Color) -> Result<()> {
        let mesh = self.shapes.sphere.placed(&Placement::uniform(center, radius));
        self.write_mesh(out, "Sphere", &mesh, color)
    }

    fn emit_cylinder(&mut self, out: &mut Output, cylinder: &Cylinder) -> Result<()> {
        let Cylinder {
            a,
            b,
            radius,
            endcap,
            color,
            section,
        } = *cylinder;
        let placement = match section {
            CrossSection::Round => {
                if endcap == Endcap::Flat {
                    let outward = (a - b).normalize_or_zero();
                    self.disk(out, "Circle", &axis_transform(a, a + outward, radius), color)?;
                    self.disk(out, "Circle", &axis_transform(b, b - outward, radius), color)?;
                }
                axis_transform(a, b, radius)
            }
            CrossSection::Elliptical {
                center,
                x_point,
                y_point,
            } => {
                if endcap == Endcap::Flat {
                    let mirrored = center * 2.0 - x_point;
                    let cap_a = frame_transform(center, mirrored, y_point, None, radius).with_translation(a);
                    let cap_b = frame_transform(center, x_point, y_point, None, radius).with_translation(b);
                    self.disk(out, "Ellipse", &cap_a, color)?;
                    self.disk(out, "Ellipse", &cap_b, color)?;
                }
                elliptical_axis_transform(center, a, b, x_point, y_point, radius)
            }
        };
        let mesh = self.shapes.cylinder.placed(&placement);
        self.write_mesh(out, "Cylinder", &mesh, color)?;
        if endcap == Endcap::Open {
            let inside = self.shapes.cylinder_inside.placed(&placement);
            self.write_mesh(out, "Cylinder", &inside, color)?;
        }
        Ok(())
    }

    fn emit_cone(&mut self, out: &mut Output, base: Vec3, tip: Vec3, radius: f32, color: Color) -> Result<()> {
        let mesh = self.shapes.cone.placed(&axis_transform(base, tip, radius));
        self.write_mesh(out, "Cone", &mesh, color)
    }

    fn emit_circle(
        &mut self,
        out: &mut Output,
        center: Vec3,
        normal: Vec3,
        radius: f32,
        fill: bool,
        color: Color,
    ) -> Result<()> {
        if !fill {
            log::debug!("outline circles are not drawn in OBJ");
            return Ok(());
        }
        self.disk(out, "Circle", &axis_transform(center, center + normal, radius), color)
    }

    fn emit_ellipsoid(&mut self, out: &mut Output, center: Vec3, axes: &[Vec3; 3], color: Color) -> Result<()> {
        let placement = frame_transform(center, axes[0], axes[1], Some(axes[2]), 1.0);
        let mesh = self.shapes.sphere.placed(&placement);
        self.write_mesh(out, "Ellipsoid", &mesh, color)
    }

    fn emit_triangle(&mut self, out: &mut Output, corners: [Vec3; 3], color: Color) -> Result<()> {
        match unit_triangle(corners[0], corners[1], corners[2]) {
            Some(mesh) => self.write_mesh(out, "Triangle", &mesh, color),
            None => Ok(()),
        }
    }

    fn emit_surface(&mut self, out: &mut Output, surface: &PreparedSurface) -> Result<()> {
        let name = self.next_name("Surface");
        let faces: Vec<[Corner; 3]> = surface
            .faces
            .iter()
            .map(|f| {
                [
                    [f.position[0], f.normal[0]],
                    [f.position[1], f.normal[1]],
                    [f.position[2], f.normal[2]],
                ]
            })
            .collect();
        if surface.has_colors() {
            self.write_material(&name, surface.color)?;
            let grid = match self.texture_for(out, &name, surface) {
                Ok(grid) => grid,
                Err(e) => {
                    log::warn!("texture for {} could not be written: {}", name, e);
                    return Err(e);
                }
            };
            self.write_group(out, &name, &name, &surface.positions, &surface.normals, &faces, Some(grid))
        } else {
            let material = self.solid_material(surface.color)?;
            self.write_group(out, &name, &material, &surface.positions, &surface.normals, &faces, None)
        }
    }

    fn emit_text_pixel(&mut self, out: &mut Output, point: Vec3, color: Color) -> Result<()> {
        let radius = 0.5 / out.scene.scale;
        self.emit_sphere(out, point, radius, color)
    }

    fn end(&mut self, out: &mut Output) -> Result<Vec<SideFile>> {
        let target = out.target().sibling(".mtl");
        let mtl = write_side_file(target.clone(), self.mtl.as_bytes(), None)?;
        self.written.push(target);
        let mut side_files = vec![mtl];
        side_files.append(&mut self.textures);
        Ok(side_files)
    }

    fn discard(&mut self) {
        for target in self.written.drain(..) {
            if let Some(path) = target.path() {
                if let Err(e) = fs::remove_file(path) {
                    log::warn!("could not remove {}: {}", path.display(), e);
                }
            }
        }
    }
}
