//! IDTF export, the text form converted to U3D for embedding in PDF.
//!
//! Each canonical shape is written once as a mesh resource. Every
//! shape/color pair gets one MODEL node, and each instance adds a
//! `PARENT_TM` placement to that node's parent list. Nodes, resources and
//! modifiers are collected during the pass and written by [`IdtfWriter::end`],
//! followed by a LaTeX companion file that embeds the converted model.

use super::dedup::PreparedSurface;
use super::format::{color_key, opacity_fraction, rgb_fractional, rgba_fractional, round, triad};
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
use glam::{Mat4, Vec3};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::fs;
use std::io::Write;

/// Name of the group node every model hangs from.
const ROOT_NODE: &str = "Scene";
/// The inner wall of an open tube is drawn slightly inside the outer one.
const INSIDE_RADIUS_SCALE: f32 = 0.95;
/// Radius of the sphere drawn for one text pixel.
const TEXT_PIXEL_RADIUS: f32 = 0.02;

/// The canonical shapes, each backing one shared mesh resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Shape {
    Sphere,
    Cylinder,
    CylinderIn,
    Cone,
    Circle,
}

impl Shape {
    fn name(&self) -> &'static str {
        match self {
            Shape::Sphere => "Sphere",
            Shape::Cylinder => "Cylinder",
            Shape::CylinderIn => "CylinderIn",
            Shape::Cone => "Cone",
            Shape::Circle => "Circle",
        }
    }

    fn mesh(&self) -> MeshData {
        match self {
            Shape::Sphere => unit_sphere(DEFAULT_SPHERE_LEVEL),
            Shape::Cylinder => unit_cylinder(DEFAULT_SEGMENTS, false),
            Shape::CylinderIn => unit_cylinder(DEFAULT_SEGMENTS, true),
            Shape::Cone => unit_cone(DEFAULT_SEGMENTS),
            Shape::Circle => unit_circle(DEFAULT_SEGMENTS),
        }
    }
}

/// One MODEL node and the placements of its instances.
#[derive(Debug)]
struct Node {
    name: String,
    resource: String,
    parents: Vec<Mat4>,
}

/// Face and vertex lists of one mesh resource.
struct MeshBlock<'a> {
    positions: &'a [Vec3],
    normals: &'a [Vec3],
    position_faces: Vec<[u32; 3]>,
    normal_faces: Vec<[u32; 3]>,
    /// Per-corner color indices and the colors they index.
    colors: Option<(Vec<[u32; 3]>, &'a [Color])>,
}

/// The placement block shared by the root group and every model instance.
fn parent_item(out: &mut String, parent: &str, m: &Mat4) -> std::fmt::Result {
    writeln!(out, "PARENT_NAME \"{}\"", parent)?;
    writeln!(out, "PARENT_TM {{")?;
    for column in [m.x_axis, m.y_axis, m.z_axis] {
        writeln!(out, "{} {} {} 0", round(column.x), round(column.y), round(column.z))?;
    }
    writeln!(out, "{} {} {} 1", round(m.w_axis.x), round(m.w_axis.y), round(m.w_axis.z))?;
    writeln!(out, "}}")
}

fn index_list(out: &mut String, faces: &[[u32; 3]]) -> std::fmt::Result {
    for [a, b, c] in faces {
        write!(out, "{} {} {} ", a, b, c)?;
    }
    Ok(())
}

fn mesh_resource(out: &mut String, name: &str, block: &MeshBlock<'_>) -> std::fmt::Result {
    let color_count = block.colors.as_ref().map_or(0, |(_, colors)| colors.len());
    writeln!(out, "RESOURCE_LIST \"MODEL\" {{")?;
    writeln!(out, "RESOURCE_COUNT 1")?;
    writeln!(out, "RESOURCE 0 {{")?;
    writeln!(out, "RESOURCE_NAME \"{}\"", name)?;
    writeln!(out, "MODEL_TYPE \"MESH\"")?;
    writeln!(out, "MESH {{")?;
    writeln!(out, "FACE_COUNT {}", block.position_faces.len())?;
    writeln!(out, "MODEL_POSITION_COUNT {}", block.positions.len())?;
    writeln!(out, "MODEL_NORMAL_COUNT {}", block.normals.len())?;
    writeln!(out, "MODEL_DIFFUSE_COLOR_COUNT {}", color_count)?;
    writeln!(out, "MODEL_SPECULAR_COLOR_COUNT 0")?;
    writeln!(out, "MODEL_TEXTURE_COORD_COUNT 0")?;
    writeln!(out, "MODEL_BONE_COUNT 0")?;
    writeln!(out, "MODEL_SHADING_COUNT 1")?;
    writeln!(out, "MODEL_SHADING_DESCRIPTION_LIST {{")?;
    writeln!(out, "SHADING_DESCRIPTION 0 {{")?;
    writeln!(out, "TEXTURE_LAYER_COUNT 0")?;
    writeln!(out, "SHADER_ID 0\n}}}}")?;

    write!(out, "MESH_FACE_POSITION_LIST {{ ")?;
    index_list(out, &block.position_faces)?;
    writeln!(out, "}}")?;
    write!(out, "MESH_FACE_NORMAL_LIST {{ ")?;
    index_list(out, &block.normal_faces)?;
    writeln!(out, "}}")?;
    write!(out, "MESH_FACE_SHADING_LIST {{ ")?;
    for _ in &block.position_faces {
        write!(out, "0 ")?;
    }
    writeln!(out, "}}")?;
    if let Some((faces, _)) = &block.colors {
        write!(out, "MESH_FACE_DIFFUSE_COLOR_LIST {{ ")?;
        index_list(out, faces)?;
        writeln!(out, "}}")?;
    }
    write!(out, "MODEL_POSITION_LIST {{ ")?;
    for p in block.positions {
        write!(out, "{} ", triad(*p))?;
    }
    writeln!(out, "}}")?;
    write!(out, "MODEL_NORMAL_LIST {{ ")?;
    for n in block.normals {
        write!(out, "{} ", triad(*n))?;
    }
    writeln!(out, "}}")?;
    if let Some((_, colors)) = &block.colors {
        write!(out, "MODEL_DIFFUSE_COLOR_LIST {{ ")?;
        for color in colors.iter() {
            write!(out, "{} ", rgba_fractional(*color))?;
        }
        writeln!(out, "}}")?;
    }
    writeln!(out, "}}}}}}")
}

/// IDTF writer with a LaTeX side file.
#[derive(Debug, Default)]
pub struct IdtfWriter {
    shapes: HashSet<Shape>,
    nodes: Vec<Node>,
    node_index: HashMap<String, usize>,
    shaders: HashSet<String>,
    models: String,
    resources: String,
    modifiers: String,
    meshes: usize,
    written: Option<OutputTarget>,
}

impl IdtfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// SHADER and MATERIAL resources, once per name.
    fn shader(&mut self, color: Color, vertex_colors: bool) -> Result<String> {
        let key = if vertex_colors {
            format!("_{}_V", color_key(color))
        } else {
            format!("_{}", color_key(color))
        };
        let name = format!("Shader{}", key);
        if !self.shaders.insert(key.clone()) {
            return Ok(name);
        }
        let diffuse = if vertex_colors {
            "1 1 1".to_string()
        } else {
            rgb_fractional(color)
        };
        let r = &mut self.resources;
        writeln!(r, "RESOURCE_LIST \"SHADER\" {{")?;
        writeln!(r, "RESOURCE_COUNT 1")?;
        writeln!(r, "RESOURCE 0 {{")?;
        writeln!(r, "RESOURCE_NAME \"{}\"", name)?;
        writeln!(r, "ATTRIBUTE_USE_VERTEX_COLOR \"{}\"", if vertex_colors { "TRUE" } else { "FALSE" })?;
        writeln!(r, "SHADER_MATERIAL_NAME \"Mat{}\"", key)?;
        writeln!(r, "SHADER_ACTIVE_TEXTURE_COUNT 0")?;
        writeln!(r, "}}}}")?;
        writeln!(r, "RESOURCE_LIST \"MATERIAL\" {{")?;
        writeln!(r, "RESOURCE_COUNT 1")?;
        writeln!(r, "RESOURCE 0 {{")?;
        writeln!(r, "RESOURCE_NAME \"Mat{}\"", key)?;
        writeln!(r, "MATERIAL_AMBIENT {}", diffuse)?;
        writeln!(r, "MATERIAL_DIFFUSE {}", diffuse)?;
        writeln!(r, "MATERIAL_SPECULAR 0 0 0")?;
        writeln!(r, "MATERIAL_EMISSIVE 0 0 0")?;
        writeln!(r, "MATERIAL_REFLECTIVITY 0")?;
        writeln!(r, "MATERIAL_OPACITY {}", round(opacity_fraction(color)))?;
        writeln!(r, "}}}}")?;
        Ok(name)
    }

    /// Add an instance to the node `name`, creating the node and its SHADING
    /// modifier on first use.
    fn instance(&mut self, name: String, resource: String, shader: &str, placement: Mat4) -> Result<()> {
        if let Some(&i) = self.node_index.get(&name) {
            self.nodes[i].parents.push(placement);
            return Ok(());
        }
        let m = &mut self.modifiers;
        writeln!(m, "MODIFIER \"SHADING\" {{")?;
        writeln!(m, "MODIFIER_NAME \"{}\"", name)?;
        writeln!(m, "PARAMETERS {{")?;
        writeln!(m, "SHADER_LIST_COUNT 1")?;
        writeln!(m, "SHADING_GROUP {{")?;
        writeln!(m, "SHADER_LIST 0 {{")?;
        writeln!(m, "SHADER_COUNT 1")?;
        writeln!(m, "SHADER_NAME_LIST {{")?;
        writeln!(m, "SHADER 0 NAME: \"{}\"", shader)?;
        writeln!(m, "}}}}}}}}}}")?;
        self.node_index.insert(name.clone(), self.nodes.len());
        self.nodes.push(Node {
            name,
            resource,
            parents: vec![placement],
        });
        Ok(())
    }

    /// Place one instance of a canonical shape. `label` names the node when it
    /// differs from the shape (ellipses share the circle mesh).
    fn place(&mut self, shape: Shape, label: &str, placement: &Placement, color: Color) -> Result<()> {
        if self.shapes.insert(shape) {
            let mesh = shape.mesh();
            let positions: Vec<Vec3> = mesh.positions().collect();
            let normals: Vec<Vec3> = mesh.normals().collect();
            let block = MeshBlock {
                positions: &positions,
                normals: &normals,
                position_faces: mesh.faces.clone(),
                normal_faces: mesh.faces.clone(),
                colors: None,
            };
            mesh_resource(&mut self.models, &format!("{}_Mesh", shape.name()), &block)?;
        }
        let shader = self.shader(color, false)?;
        self.instance(
            format!("{}_{}", label, color_key(color)),
            format!("{}_Mesh", shape.name()),
            &shader,
            placement.to_mat4(),
        )
    }

    /// A one-off mesh resource with a single identity-placed node.
    fn one_off(&mut self, kind: &str, block: &MeshBlock<'_>, shader: &str) -> Result<()> {
        self.meshes += 1;
        let name = format!("{}{}", kind, self.meshes);
        let resource = format!("{}_Mesh", name);
        mesh_resource(&mut self.models, &resource, block)?;
        self.instance(name, resource, shader, Mat4::IDENTITY)
    }

    fn write_nodes(&self, out: &mut Output) -> Result<()> {
        let mut text = String::new();
        for node in &self.nodes {
            writeln!(text, "NODE \"MODEL\" {{")?;
            writeln!(text, "NODE_NAME \"{}\"", node.name)?;
            writeln!(text, "PARENT_LIST {{\nPARENT_COUNT {}", node.parents.len())?;
            for (i, m) in node.parents.iter().enumerate() {
                writeln!(text, "PARENT {} {{", i)?;
                parent_item(&mut text, ROOT_NODE, m)?;
                writeln!(text, "}}")?;
            }
            writeln!(text, "}}")?;
            writeln!(text, "RESOURCE_NAME \"{}\"\n}}", node.resource)?;
        }
        out.write_all(text.as_bytes())?;
        Ok(())
    }

    /// LaTeX document embedding `<stem>.u3d` with the exported view.
    fn latex(&self, out: &Output) -> Result<String> {
        let scene = &out.scene;
        let name = out.target().stem();
        let mut tex = String::new();
        writeln!(tex, "% Created by scene-export {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(tex, "% File created: {} ({} bytes)", out.target(), out.bytes_written())?;
        for line in scene.perspective_lines() {
            writeln!(tex, "% {}", line)?;
        }
        writeln!(tex)?;
        writeln!(tex, "\\documentclass[12pt,letter]{{article}}")?;
        writeln!(tex, "\\usepackage{{hyperref}}")?;
        writeln!(tex, "\\usepackage[3D]{{movie15}}")?;
        writeln!(tex, "\\usepackage{{verbatim}}")?;
        writeln!(tex, "\\pagestyle{{empty}}")?;
        writeln!(tex, "\\begin{{document}}")?;
        writeln!(tex, " \\begin{{center}}")?;
        writeln!(tex, "  \\includemovie[")?;
        writeln!(tex, "   label={},", name)?;
        writeln!(tex, "    autoplay,")?;
        writeln!(tex, "    repeat=1,")?;
        writeln!(tex, "    toolbar=false,")?;
        writeln!(tex, "3Droo={},", round(scene.camera_distance))?;
        writeln!(tex, "3Dcoo= 0.0 0.0 0.0,")?;
        writeln!(tex, "3Dc2c=0.0 0.0 1.0,")?;
        writeln!(tex, "3Daac={},", round(scene.aperture_angle()))?;
        writeln!(tex, "3Dbg={},", rgb_fractional(scene.background))?;
        writeln!(tex, "3Dlights=Headlamp,")?;
        writeln!(tex, "inline=true,")?;
        writeln!(tex, "  ]{{0.9\\textwidth}}{{0.9\\textwidth}}{{{}.u3d}}", name)?;
        writeln!(tex, "\\end{{center}}")?;
        writeln!(tex, "\\end{{document}}")?;
        Ok(tex)
    }
}

impl SceneWriter for IdtfWriter {
    fn driver_name(&self) -> &'static str {
        "IDTF"
    }

    fn begin(&mut self, out: &mut Output) -> Result<()> {
        // The view rotation goes on the root group; models stay in model space.
        let rotation = out.scene.rotation();
        let root = Mat4::from_rotation_translation(rotation, -(rotation * out.scene.center));
        let mut text = String::new();
        writeln!(text, "FILE_FORMAT \"IDTF\"\nFORMAT_VERSION 100\n")?;
        writeln!(text, "NODE \"GROUP\" {{")?;
        writeln!(text, "NODE_NAME \"{}\"", ROOT_NODE)?;
        writeln!(text, "PARENT_LIST {{\nPARENT_COUNT 1")?;
        writeln!(text, "PARENT 0 {{")?;
        parent_item(&mut text, "", &root)?;
        writeln!(text, "}}}}}}")?;
        out.write_all(text.as_bytes())?;
        Ok(())
    }

    fn emit_sphere(&mut self, _out: &mut Output, center: Vec3, radius: f32, color: Color) -> Result<()> {
        self.place(Shape::Sphere, "Sphere", &Placement::uniform(center, radius), color)
    }

    fn emit_cylinder(&mut self, _out: &mut Output, cylinder: &Cylinder) -> Result<()> {
        let Cylinder {
            a,
            b,
            radius,
            endcap,
            color,
            section,
        } = *cylinder;
        let (placement, inside) = match section {
            CrossSection::Round => {
                if endcap == Endcap::Flat {
                    let outward = (a - b).normalize_or_zero();
                    self.place(Shape::Circle, "Circle", &axis_transform(a, a + outward, radius), color)?;
                    self.place(Shape::Circle, "Circle", &axis_transform(b, b - outward, radius), color)?;
                }
                let inside = axis_transform(a, b, radius * INSIDE_RADIUS_SCALE);
                (axis_transform(a, b, radius), inside)
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
                    self.place(Shape::Circle, "Ellipse", &cap_a, color)?;
                    self.place(Shape::Circle, "Ellipse", &cap_b, color)?;
                }
                let inside = elliptical_axis_transform(center, a, b, x_point, y_point, radius * INSIDE_RADIUS_SCALE);
                (elliptical_axis_transform(center, a, b, x_point, y_point, radius), inside)
            }
        };
        self.place(Shape::Cylinder, "Cylinder", &placement, color)?;
        let outline = matches!(section, CrossSection::Elliptical { .. }) && endcap == Endcap::None;
        if endcap == Endcap::Open || outline {
            self.place(Shape::CylinderIn, "CylinderIn", &inside, color)?;
        }
        Ok(())
    }

    fn emit_cone(&mut self, _out: &mut Output, base: Vec3, tip: Vec3, radius: f32, color: Color) -> Result<()> {
        self.place(Shape::Cone, "Cone", &axis_transform(base, tip, radius), color)
    }

    fn emit_circle(
        &mut self,
        _out: &mut Output,
        center: Vec3,
        normal: Vec3,
        radius: f32,
        fill: bool,
        color: Color,
    ) -> Result<()> {
        if !fill {
            log::debug!("outline circles are not drawn in IDTF");
            return Ok(());
        }
        self.place(Shape::Circle, "Circle", &axis_transform(center, center + normal, radius), color)
    }

    fn emit_ellipsoid(&mut self, _out: &mut Output, center: Vec3, axes: &[Vec3; 3], color: Color) -> Result<()> {
        let placement = frame_transform(center, axes[0], axes[1], Some(axes[2]), 1.0);
        self.place(Shape::Sphere, "Sphere", &placement, color)
    }

    fn emit_triangle(&mut self, _out: &mut Output, corners: [Vec3; 3], color: Color) -> Result<()> {
        let Some(mesh) = unit_triangle(corners[0], corners[1], corners[2]) else {
            return Ok(());
        };
        let positions: Vec<Vec3> = mesh.positions().collect();
        let normals: Vec<Vec3> = mesh.normals().take(1).collect();
        let block = MeshBlock {
            positions: &positions,
            normals: &normals,
            position_faces: vec![[0, 1, 2]],
            normal_faces: vec![[0, 0, 0]],
            colors: None,
        };
        let shader = self.shader(color, false)?;
        self.one_off("Triangle", &block, &shader)
    }

    fn emit_surface(&mut self, _out: &mut Output, surface: &PreparedSurface) -> Result<()> {
        let colors = surface.has_colors().then(|| {
            let faces: Vec<[u32; 3]> = surface.faces.iter().filter_map(|f| f.color).collect();
            (faces, surface.colors.colors.as_slice())
        });
        let block = MeshBlock {
            positions: &surface.positions,
            normals: &surface.normals,
            position_faces: surface.faces.iter().map(|f| f.position).collect(),
            normal_faces: surface.faces.iter().map(|f| f.normal).collect(),
            colors,
        };
        let shader = self.shader(surface.color, surface.has_colors())?;
        self.one_off("Mesh", &block, &shader)
    }

    fn emit_text_pixel(&mut self, out: &mut Output, point: Vec3, color: Color) -> Result<()> {
        self.emit_sphere(out, point, TEXT_PIXEL_RADIUS, color)
    }

    fn end(&mut self, out: &mut Output) -> Result<Vec<SideFile>> {
        self.write_nodes(out)?;
        out.write_all(self.models.as_bytes())?;
        out.write_all(self.resources.as_bytes())?;
        writeln!(out, "RESOURCE_LIST \"VIEW\" {{")?;
        writeln!(out, "\tRESOURCE_COUNT 1")?;
        writeln!(out, "\tRESOURCE 0 {{")?;
        writeln!(out, "\t\tRESOURCE_NAME \"View0\"")?;
        writeln!(out, "\t\tVIEW_PASS_COUNT 1")?;
        writeln!(out, "\t\tVIEW_ROOT_NODE_LIST {{")?;
        writeln!(out, "\t\t\tROOT_NODE 0 {{")?;
        writeln!(out, "\t\t\t\tROOT_NODE_NAME \"\"")?;
        writeln!(out, "\t\t\t}}")?;
        writeln!(out, "\t\t}}")?;
        writeln!(out, "\t}}")?;
        writeln!(out, "}}\n")?;
        out.write_all(self.modifiers.as_bytes())?;

        let tex = self.latex(out)?;
        let target = out.target().sibling(".tex");
        let side = write_side_file(target.clone(), tex.as_bytes(), None)?;
        self.written = Some(target);
        Ok(vec![side])
    }

    fn discard(&mut self) {
        if let Some(path) = self.written.take().as_ref().and_then(OutputTarget::path) {
            if let Err(e) = fs::remove_file(path) {
                log::warn!("could not remove {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{export_document, ExportFormat};
    use crate::scene::{DrawCommand, SceneContext, SceneDocument, SurfaceMesh};

    const RED: Color = Color::rgb(255, 0, 0);

    fn export(commands: Vec<DrawCommand>) -> (String, String) {
        let doc = SceneDocument {
            context: SceneContext::default(),
            commands,
        };
        let status = export_document(ExportFormat::Idtf, OutputTarget::Buffer, &doc).unwrap();
        let tex = String::from_utf8(status.side_files[0].contents.clone().unwrap()).unwrap();
        (status.contents.unwrap(), tex)
    }

    fn atom(center: Vec3, color: Color) -> DrawCommand {
        DrawCommand::Atom {
            center,
            radius: 1.0,
            color,
        }
    }

    fn bond(endcap: Endcap) -> DrawCommand {
        DrawCommand::Bond {
            a: Vec3::ZERO,
            b: Vec3::new(0.0, 0.0, 2.0),
            radius: 0.2,
            endcap,
            color_a: RED,
            color_b: RED,
        }
    }

    #[test]
    fn test_header_and_root_group() {
        let (idtf, _) = export(vec![]);
        assert!(idtf.starts_with("FILE_FORMAT \"IDTF\"\nFORMAT_VERSION 100\n\nNODE \"GROUP\" {\nNODE_NAME \"Scene\"\n"));
        assert!(idtf.contains("PARENT_NAME \"\"\nPARENT_TM {\n1 0 0 0\n0 1 0 0\n0 0 1 0\n0 0 0 1\n}\n"));
    }

    #[test]
    fn test_same_color_spheres_share_one_node() {
        let (idtf, _) = export(vec![
            atom(Vec3::ZERO, RED),
            atom(Vec3::new(2.0, 0.0, 0.0), RED),
            atom(Vec3::new(4.0, 0.0, 0.0), Color::WHITE),
        ]);
        let red = idtf.split("NODE_NAME \"Sphere_FFFF0000\"").nth(1).unwrap();
        assert!(red.starts_with("\nPARENT_LIST {\nPARENT_COUNT 2\n"));
        assert!(red.contains("PARENT_TM {\n1 0 0 0\n0 1 0 0\n0 0 1 0\n2 0 0 1\n}"));
        assert!(idtf.contains("NODE_NAME \"Sphere_FFFFFFFF\"\nPARENT_LIST {\nPARENT_COUNT 1\n"));
        assert_eq!(idtf.matches("RESOURCE_NAME \"Sphere_Mesh\"").count(), 3);
        assert_eq!(idtf.matches("MODEL_TYPE \"MESH\"").count(), 1);
        assert_eq!(idtf.matches("RESOURCE_NAME \"Shader_FFFF0000\"").count(), 1);
        assert_eq!(idtf.matches("MODIFIER_NAME \"Sphere_FFFF0000\"").count(), 1);
    }

    #[test]
    fn test_sections_in_order() {
        let (idtf, _) = export(vec![atom(Vec3::ZERO, RED)]);
        let at = |needle: &str| idtf.find(needle).unwrap();
        assert!(at("NODE \"MODEL\"") < at("RESOURCE_LIST \"MODEL\""));
        assert!(at("RESOURCE_LIST \"MODEL\"") < at("RESOURCE_LIST \"SHADER\""));
        assert!(at("RESOURCE_LIST \"MATERIAL\"") < at("RESOURCE_LIST \"VIEW\""));
        assert!(at("RESOURCE_LIST \"VIEW\"") < at("MODIFIER \"SHADING\""));
    }

    #[test]
    fn test_flat_bond_adds_cap_circles() {
        let (idtf, _) = export(vec![bond(Endcap::Flat)]);
        assert!(idtf.contains("NODE_NAME \"Circle_FFFF0000\"\nPARENT_LIST {\nPARENT_COUNT 2\n"));
        assert!(idtf.contains("RESOURCE_NAME \"Circle_Mesh\"\nMODEL_TYPE"));
        assert!(idtf.contains("RESOURCE_NAME \"Cylinder_Mesh\"\nMODEL_TYPE"));
        assert!(!idtf.contains("CylinderIn"));
        // Axis along +z: radius on x and y, length on z, placed at the start.
        assert!(idtf.contains("PARENT_TM {\n.2 0 0 0\n0 .2 0 0\n0 0 2 0\n0 0 0 1\n}"));
    }

    #[test]
    fn test_open_bond_adds_inner_wall() {
        let (idtf, _) = export(vec![bond(Endcap::Open)]);
        assert!(idtf.contains("NODE_NAME \"CylinderIn_FFFF0000\""));
        assert!(idtf.contains("RESOURCE_NAME \"CylinderIn_Mesh\"\nMODEL_TYPE"));
        assert!(idtf.contains("PARENT_TM {\n.19 0 0 0\n0 .19 0 0\n0 0 2 0\n0 0 0 1\n}"));
    }

    #[test]
    fn test_surface_with_colors() {
        let surface = SurfaceMesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![vec![0, 1, 2]], Color::WHITE)
            .with_vertex_colors(vec![RED, Color::WHITE, RED]);
        let (idtf, _) = export(vec![DrawCommand::Surface(surface)]);
        assert!(idtf.contains("NODE_NAME \"Mesh1\""));
        assert!(idtf.contains("RESOURCE_NAME \"Mesh1_Mesh\""));
        assert!(idtf.contains("MODEL_DIFFUSE_COLOR_COUNT 2\n"));
        assert!(idtf.contains("MESH_FACE_DIFFUSE_COLOR_LIST { 0 1 0 }\n"));
        assert!(idtf.contains("MODEL_DIFFUSE_COLOR_LIST { 1 0 0 1 1 1 1 1 }\n"));
        assert!(idtf.contains("ATTRIBUTE_USE_VERTEX_COLOR \"TRUE\""));
    }

    #[test]
    fn test_triangle_is_its_own_mesh() {
        let scene = SceneContext::default();
        let (idtf, _) = export(vec![DrawCommand::Triangle {
            a: scene.to_screen(Vec3::ZERO),
            b: scene.to_screen(Vec3::X),
            c: scene.to_screen(Vec3::Y),
            color: RED,
            two_sided: true,
        }]);
        assert!(idtf.contains("NODE_NAME \"Triangle1\""));
        assert!(idtf.contains("NODE_NAME \"Triangle2\""));
        assert!(idtf.contains("MESH_FACE_NORMAL_LIST { 0 0 0 }"));
    }

    #[test]
    fn test_latex_side_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.idtf");
        let doc = SceneDocument {
            context: SceneContext::default(),
            commands: vec![atom(Vec3::ZERO, RED)],
        };
        let status = export_document(ExportFormat::Idtf, OutputTarget::file(&path), &doc).unwrap();
        let tex_path = dir.path().join("scene.tex");
        assert_eq!(status.side_files[0].target, OutputTarget::file(&tex_path));
        let tex = fs::read_to_string(&tex_path).unwrap();
        assert!(tex.contains("   label=scene,\n"));
        assert!(tex.contains("{scene.u3d}"));
        assert!(tex.contains("3Droo=30,\n"));
        assert!(tex.contains(&format!("% File created: {} ({} bytes)", path.display(), status.bytes)));
    }
}
