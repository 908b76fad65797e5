//! Tachyon ray-tracer scene export.
//!
//! Works in screen space: positions are window pixels written as integers
//! with y negated (Tachyon's y axis points up), radii are pixels. Textures
//! are declared once per color with `TexDef` and referenced by id.

use super::dedup::{PreparedSurface, UseRef, UseTable};
use super::format::{opacity_fraction, rgb_fractional, round, triad};
use super::sink::SideFile;
use super::space::Cylinder;
use super::{Output, SceneWriter};
use crate::error::Result;
use crate::mesh::canonical::{unit_cone, DEFAULT_SEGMENTS};
use crate::mesh::solver::axis_transform;
use crate::mesh::MeshData;
use crate::scene::SceneContext;
use crate::types::{Color, Endcap};
use glam::Vec3;
use std::io::Write;

/// Inner radius of an outline ring, relative to its outer radius.
const RING_INNER_SCALE: f32 = 0.95;

/// Integer pixel triad with y negated. NaN components print as 0.
pub fn screen_triad(p: Vec3) -> String {
    format!("{} {} {}", p.x as i32, (-p.y) as i32, p.z as i32)
}

/// A direction in Tachyon's frame (y negated), unit length.
fn direction(v: Vec3) -> String {
    let n = v.normalize_or_zero();
    triad(Vec3::new(n.x, -n.y, n.z))
}

/// Texture parameters shared by every primitive of one color.
fn texture_body(scene: &SceneContext, color: Color) -> String {
    format!(
        " AMBIENT {} DIFFUSE {} SPECULAR {} Opacity {} Phong Plastic 0.5 Phong_size {} Color {} TexFunc 0\n",
        round(scene.ambient_percent / 100.0),
        round(scene.diffuse_percent / 100.0),
        round(scene.specular_percent / 100.0),
        round(opacity_fraction(color)),
        round(scene.specular_exponent),
        rgb_fractional(color)
    )
}

/// Tachyon writer.
#[derive(Debug, Default)]
pub struct TachyonWriter {
    textures: UseTable,
}

impl TachyonWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference to the shared texture for `color`, declaring it first when
    /// it is new. The returned code goes after the primitive's parameters.
    fn texture(&mut self, out: &mut Output, color: Color) -> Result<String> {
        let key = format!("t{}{}", rgb_fractional(color), round(opacity_fraction(color)));
        match self.textures.get(&key) {
            UseRef::Define(id) => {
                let body = texture_body(&out.scene, color);
                write!(out, "TexDef {}{}", id, body)?;
                Ok(format!(" {}", id))
            }
            UseRef::Reuse(id) => Ok(format!(" {}", id)),
        }
    }

    fn ring(&mut self, out: &mut Output, center: Vec3, normal: Vec3, radius: f32, fill: bool, color: Color) -> Result<()> {
        let code = self.texture(out, color)?;
        let inner = if fill { 0.0 } else { radius * RING_INNER_SCALE };
        writeln!(
            out,
            "Ring Center {} Normal {} Inner {} Outer {}{}",
            screen_triad(center),
            direction(normal),
            round(inner),
            round(radius),
            code
        )?;
        Ok(())
    }

    /// A triangle mesh with per-vertex normals and colors.
    fn vertex_array(
        &mut self,
        out: &mut Output,
        positions: &[Vec3],
        normals: &[Vec3],
        colors: &[Color],
        faces: &[[u32; 3]],
        color: Color,
    ) -> Result<()> {
        let body = texture_body(&out.scene, color);
        writeln!(out, "VertexArray  Numverts {}\nCoords", positions.len())?;
        for p in positions {
            writeln!(out, "{}", screen_triad(*p))?;
        }
        writeln!(out, "\nNormals")?;
        for n in normals {
            writeln!(out, "{}", direction(*n))?;
        }
        writeln!(out, "\nColors")?;
        for c in colors {
            writeln!(out, "{}", rgb_fractional(*c))?;
        }
        writeln!(out, "Texture{}", body)?;
        writeln!(out, "TriMesh {}", faces.len())?;
        for [a, b, c] in faces {
            writeln!(out, "{} {} {}", a, b, c)?;
        }
        writeln!(out, "\nEnd_VertexArray")?;
        Ok(())
    }

    fn mesh(&mut self, out: &mut Output, mesh: &MeshData, color: Color) -> Result<()> {
        let positions: Vec<Vec3> = mesh.positions().collect();
        let normals: Vec<Vec3> = mesh.normals().collect();
        let colors = vec![color; positions.len()];
        self.vertex_array(out, &positions, &normals, &colors, &mesh.faces, color)
    }
}

impl SceneWriter for TachyonWriter {
    fn driver_name(&self) -> &'static str {
        "Tachyon"
    }

    fn begin(&mut self, out: &mut Output) -> Result<()> {
        let name = out.target().file_name();
        let stem = out.target().stem();
        writeln!(out, "# ******************************************************")?;
        writeln!(out, "# Created by scene-export {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(out, "#")?;
        writeln!(out, "# Requires Tachyon version 0.98.7 or newer")?;
        writeln!(out, "#")?;
        writeln!(out, "# Default tachyon rendering command for this scene:")?;
        writeln!(out, "#   tachyon  -aasamples 12 {} -format TARGA -o {}.tga", name, stem)?;
        writeln!(out, "#")?;
        writeln!(out, "# ******************************************************")?;
        writeln!(out)?;
        for line in out.scene.perspective_lines() {
            writeln!(out, "# {}", line)?;
        }
        writeln!(out)?;

        let scene = out.scene.clone();
        let (width, height) = (scene.screen_width, scene.screen_height);
        writeln!(out, "Begin_Scene")?;
        writeln!(out, "Resolution {} {}", width, height)?;
        writeln!(out, "Shader_Mode Medium")?;
        writeln!(out, "  Trans_VMD")?;
        writeln!(out, "  Fog_VMD")?;
        writeln!(out, "End_Shader_Mode")?;
        writeln!(out, "Camera")?;
        writeln!(out, "  Zoom 3.0")?;
        writeln!(out, "  Aspectratio 1")?;
        writeln!(out, "  Antialiasing 12")?;
        writeln!(out, "  Raydepth 8")?;
        let center = Vec3::new((width / 2) as f32, (height / 2) as f32, 0.0);
        writeln!(out, "  Center {}", screen_triad(center))?;
        writeln!(out, "  Viewdir 0 0 1")?;
        writeln!(out, "  Updir   0 1 0")?;
        writeln!(out, "End_Camera")?;
        writeln!(out, "Directional_Light Direction {} Color 1 1 1", triad(scene.light()))?;
        writeln!(out)?;
        writeln!(out, "Background {}", rgb_fractional(scene.background))?;
        writeln!(out)?;
        Ok(())
    }

    fn emit_sphere(&mut self, out: &mut Output, center: Vec3, radius: f32, color: Color) -> Result<()> {
        let code = self.texture(out, color)?;
        writeln!(out, "Sphere Center {} Rad {}{}", screen_triad(center), round(radius), code)?;
        Ok(())
    }

    fn emit_cylinder(&mut self, out: &mut Output, cylinder: &Cylinder) -> Result<()> {
        let Cylinder {
            a,
            b,
            radius,
            endcap,
            color,
            ..
        } = *cylinder;
        let code = self.texture(out, color)?;
        writeln!(
            out,
            "FCylinder Base {} Apex {} Rad {}{}",
            screen_triad(a),
            screen_triad(b),
            round(radius),
            code
        )?;
        if endcap == Endcap::Flat && radius > 1.0 {
            self.ring(out, a, a - b, radius, true, color)?;
            self.ring(out, b, b - a, radius, true, color)?;
        }
        Ok(())
    }

    fn emit_cone(&mut self, out: &mut Output, base: Vec3, tip: Vec3, radius: f32, color: Color) -> Result<()> {
        let mesh = unit_cone(DEFAULT_SEGMENTS).placed(&axis_transform(base, tip, radius));
        self.mesh(out, &mesh, color)
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
        self.ring(out, center, normal, radius, fill, color)
    }

    /// No ellipsoid primitive; drawn as a sphere of the largest semi-axis.
    fn emit_ellipsoid(&mut self, out: &mut Output, center: Vec3, axes: &[Vec3; 3], color: Color) -> Result<()> {
        let radius = axes.iter().map(|p| p.distance(center)).fold(0.0f32, f32::max);
        self.emit_sphere(out, center, radius, color)
    }

    fn emit_triangle(&mut self, out: &mut Output, corners: [Vec3; 3], color: Color) -> Result<()> {
        let code = self.texture(out, color)?;
        writeln!(
            out,
            "TRI V0 {} V1 {} V2 {}{}",
            screen_triad(corners[0]),
            screen_triad(corners[1]),
            screen_triad(corners[2]),
            code
        )?;
        Ok(())
    }

    fn emit_surface(&mut self, out: &mut Output, surface: &PreparedSurface) -> Result<()> {
        if surface.has_colors() && surface.per_polygon_colors {
            for face in &surface.faces {
                let corners = face.position.map(|i| surface.positions[i as usize]);
                self.emit_triangle(out, corners, surface.face_color(face))?;
            }
            return Ok(());
        }
        let count = surface.positions.len();
        let normals: Vec<Vec3> = (0..count).map(|i| surface.vertex_normal(i)).collect();
        let colors: Vec<Color> = (0..count).map(|i| surface.vertex_color(i)).collect();
        let faces: Vec<[u32; 3]> = surface.faces.iter().map(|f| f.position).collect();
        self.vertex_array(out, &surface.positions, &normals, &colors, &faces, surface.color)
    }

    fn emit_text_pixel(&mut self, out: &mut Output, point: Vec3, color: Color) -> Result<()> {
        let code = self.texture(out, color)?;
        writeln!(out, "Sphere Center {} Rad 1{}", screen_triad(point), code)?;
        Ok(())
    }

    fn end(&mut self, out: &mut Output) -> Result<Vec<SideFile>> {
        writeln!(out, "End_Scene")?;
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{export_document, ExportFormat, OutputTarget};
    use crate::scene::{DrawCommand, SceneDocument, SurfaceMesh};

    const RED: Color = Color::rgb(255, 0, 0);

    fn export(commands: Vec<DrawCommand>) -> String {
        let doc = SceneDocument {
            context: SceneContext::default(),
            commands,
        };
        export_document(ExportFormat::Tachyon, OutputTarget::Buffer, &doc)
            .unwrap()
            .contents
            .unwrap()
    }

    fn atom(center: Vec3) -> DrawCommand {
        DrawCommand::Atom {
            center,
            radius: 1.0,
            color: RED,
        }
    }

    #[test]
    fn test_screen_triad() {
        assert_eq!(screen_triad(Vec3::new(10.7, 20.2, 3.9)), "10 -20 3");
        assert_eq!(screen_triad(Vec3::new(-1.5, -2.5, 0.0)), "-1 2 0");
        assert_eq!(screen_triad(Vec3::new(f32::NAN, 1.0, 2.0)), "0 -1 2");
    }

    #[test]
    fn test_header_and_footer() {
        let tachyon = export(vec![]);
        assert!(tachyon.starts_with("# ******"));
        assert!(tachyon.contains("#   tachyon  -aasamples 12 buffer -format TARGA -o buffer.tga\n"));
        assert!(tachyon.contains(
            "Begin_Scene\nResolution 500 500\nShader_Mode Medium\n  Trans_VMD\n  Fog_VMD\nEnd_Shader_Mode\n"
        ));
        assert!(tachyon.contains(
            "Camera\n  Zoom 3.0\n  Aspectratio 1\n  Antialiasing 12\n  Raydepth 8\n  Center 250 -250 0\n  \
             Viewdir 0 0 1\n  Updir   0 1 0\nEnd_Camera\n"
        ));
        assert!(tachyon.contains("\nBackground 0 0 0\n"));
        assert!(tachyon.ends_with("End_Scene\n"));
    }

    #[test]
    fn test_texture_declared_once() {
        let tachyon = export(vec![atom(Vec3::ZERO), atom(Vec3::new(1.0, 0.0, 0.0))]);
        assert!(tachyon.contains(
            "TexDef _0 AMBIENT .45 DIFFUSE .84 SPECULAR .22 Opacity 1 Phong Plastic 0.5 Phong_size 6 \
             Color 1 0 0 TexFunc 0\nSphere Center 250 -250 750 Rad 25 _0\n"
        ));
        assert!(tachyon.contains("Sphere Center 275 -250 750 Rad 25 _0\n"));
        assert_eq!(tachyon.matches("TexDef").count(), 1);
    }

    #[test]
    fn test_flat_cylinder_gets_rings() {
        let tachyon = export(vec![DrawCommand::Bond {
            a: Vec3::ZERO,
            b: Vec3::new(2.0, 0.0, 0.0),
            radius: 0.2,
            endcap: Endcap::Flat,
            color_a: RED,
            color_b: RED,
        }]);
        assert!(tachyon.contains("FCylinder Base 250 -250 750 Apex 300 -250 750 Rad 5 _0\n"));
        assert!(tachyon.contains("Ring Center 250 -250 750 Normal -1 0 0 Inner 0 Outer 5 _0\n"));
        assert!(tachyon.contains("Ring Center 300 -250 750 Normal 1 0 0 Inner 0 Outer 5 _0\n"));
    }

    #[test]
    fn test_outline_circle_is_a_ring() {
        let tachyon = export(vec![DrawCommand::Circle {
            center: Vec3::new(100.0, 100.0, 500.0),
            diameter: 20.0,
            fill: false,
            color: RED,
        }]);
        assert!(tachyon.contains("Ring Center 100 -100 500 Normal 0 0 -1 Inner 9.5 Outer 10 _0\n"));
    }

    #[test]
    fn test_vertex_colored_surface() {
        let surface = SurfaceMesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
            vec![vec![0, 1, 2, 3]],
            Color::WHITE,
        )
        .with_vertex_colors(vec![RED; 4]);
        let tachyon = export(vec![DrawCommand::Surface(surface)]);
        assert!(tachyon.contains("VertexArray  Numverts 4\nCoords\n250 -250 750\n275 -250 750\n"));
        assert!(tachyon.contains("\nColors\n1 0 0\n1 0 0\n1 0 0\n1 0 0\nTexture AMBIENT"));
        assert!(tachyon.contains("TriMesh 2\n0 1 2\n0 2 3\n\nEnd_VertexArray\n"));
    }

    #[test]
    fn test_polygon_colored_surface_becomes_triangles() {
        let blue = Color::rgb(0, 0, 255);
        let surface = SurfaceMesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
            vec![vec![0, 1, 2], vec![0, 2, 3]],
            Color::WHITE,
        )
        .with_polygon_colors(vec![RED, blue]);
        let tachyon = export(vec![DrawCommand::Surface(surface)]);
        assert_eq!(tachyon.matches("TRI V0").count(), 2);
        assert!(tachyon.contains("TRI V0 250 -250 750 V1 275 -250 750 V2 275 -225 750 _0\n"));
        assert!(tachyon.contains(" _1\n"));
        assert!(!tachyon.contains("VertexArray"));
    }

    #[test]
    fn test_cone_is_a_vertex_array() {
        let tachyon = export(vec![DrawCommand::Cone {
            base: Vec3::new(100.0, 100.0, 500.0),
            tip: Vec3::new(100.0, 60.0, 500.0),
            diameter: 10.0,
            color: RED,
        }]);
        assert!(tachyon.contains("VertexArray  Numverts 37\n"));
        assert!(tachyon.contains("TriMesh 36\n"));
    }
}
