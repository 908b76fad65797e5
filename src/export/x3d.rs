//! X3D export.
//!
//! Spheres, cylinders and cones map onto X3D's own primitives, placed with
//! `Transform` nodes. Shapes, geometry and appearances that repeat are
//! written once with `DEF` and referenced with `USE` afterwards.

use super::dedup::{PreparedSurface, UseRef, UseTable};
use super::format::{color_key, rgb_fractional, round, translucency_fraction, triad};
use super::sink::SideFile;
use super::space::{CrossSection, Cylinder};
use super::{Output, SceneWriter};
use crate::error::Result;
use crate::mesh::solver::{axis_angle_to, frame_transform, rotation_axis_angle};
use crate::types::{Color, Endcap, Placement};
use glam::{Mat3, Vec3};
use std::io::Write;

/// Height of the cylinder standing in for a filled circle.
const DISK_HEIGHT: f32 = 0.004;
/// Height of the open cylinder standing in for a circle outline.
const RING_HEIGHT: f32 = 0.01;
/// Radius of the sphere drawn for one text pixel.
const TEXT_PIXEL_RADIUS: f32 = 0.01;

/// Escape text for a single-quoted XML attribute.
pub fn escape_attr(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn axis_angle(axis: Vec3, angle: f32) -> String {
    format!("{} {}", triad(axis), round(angle))
}

/// X3D writer.
#[derive(Debug, Default)]
pub struct X3dWriter {
    uses: UseTable,
}

impl X3dWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn appearance(&mut self, out: &mut Output, color: Color) -> Result<()> {
        match self.uses.get(&format!("A{}", color_key(color))) {
            UseRef::Define(id) => write!(
                out,
                "<Appearance DEF='{}'><Material diffuseColor='{}' transparency='{}'/></Appearance>",
                id,
                rgb_fractional(color),
                round(translucency_fraction(color))
            )?,
            UseRef::Reuse(id) => write!(out, "<Appearance USE='{}'></Appearance>", id)?,
        }
        Ok(())
    }

    fn sphere_shape(&mut self, out: &mut Output, center: Vec3, radius: f32, color: Color) -> Result<()> {
        writeln!(out, "<Transform translation='{}'>", triad(center))?;
        let key = format!("S{}_{}", color_key(color), (radius * 100.0) as i32);
        match self.uses.get(&key) {
            UseRef::Define(id) => {
                write!(out, "<Shape DEF='{}'><Sphere radius='{}'/>", id, round(radius))?;
                self.appearance(out, color)?;
                writeln!(out, "</Shape>")?;
            }
            UseRef::Reuse(id) => writeln!(out, "<Shape USE='{}'></Shape>", id)?,
        }
        writeln!(out, "</Transform>")?;
        Ok(())
    }

    /// A `Cylinder` shape along local y, centred on the origin.
    fn cylinder_shape(
        &mut self,
        out: &mut Output,
        height: f32,
        radius: f32,
        endcap: Endcap,
        color: Color,
    ) -> Result<()> {
        let key = format!(
            "C{}_{}_{}_{}",
            color_key(color),
            (height * 100.0) as i32,
            round(radius),
            endcap.code()
        );
        match self.uses.get(&key) {
            UseRef::Define(id) => {
                write!(out, "<Shape DEF='{}'><Cylinder ", id)?;
                let geometry = format!("c{}_{}_{}", round(height), endcap.code(), round(radius));
                match self.uses.get(&geometry) {
                    UseRef::Define(cylinder) => {
                        write!(
                            out,
                            "DEF='{}' height='{}' radius='{}'",
                            cylinder,
                            round(height),
                            round(radius)
                        )?;
                        if endcap != Endcap::Flat {
                            write!(out, " top='false' bottom='false'")?;
                        }
                        write!(out, "/>")?;
                    }
                    UseRef::Reuse(cylinder) => write!(out, "USE='{}'/>", cylinder)?,
                }
                self.appearance(out, color)?;
                write!(out, "</Shape>")?;
            }
            UseRef::Reuse(id) => write!(out, "<Shape USE='{}'></Shape>", id)?,
        }
        Ok(())
    }

    /// A y-axis shape of the given height, stood up along `a -> b`.
    fn axial(
        &mut self,
        out: &mut Output,
        a: Vec3,
        b: Vec3,
        radius: f32,
        endcap: Endcap,
        color: Color,
    ) -> Result<()> {
        let (axis, angle) = axis_angle_to(Vec3::Y, b - a);
        writeln!(
            out,
            "<Transform translation='{}' rotation='{}'>",
            triad((a + b) * 0.5),
            axis_angle(axis, angle)
        )?;
        self.cylinder_shape(out, a.distance(b), radius, endcap, color)?;
        writeln!(out, "\n</Transform>")?;
        Ok(())
    }

    fn elliptical(
        &mut self,
        out: &mut Output,
        cylinder: &Cylinder,
        center: Vec3,
        x_point: Vec3,
        y_point: Vec3,
    ) -> Result<()> {
        let axis = cylinder.b - cylinder.a;
        let x = x_point - center;
        let y = y_point - center;
        let x_dir = x.normalize_or_zero();
        let y_dir = axis.normalize_or_zero();
        let z_dir = x_dir.cross(y_dir);
        let depth = (y - x_dir * y.dot(x_dir)).length();
        let frame = Mat3::from_cols(x_dir, y_dir, z_dir);
        let placement = Placement::new(frame, center);
        let (rotation_axis, angle) = rotation_axis_angle(&placement);
        let scale = Vec3::new(x.length() * cylinder.radius, axis.length(), depth * cylinder.radius);
        writeln!(
            out,
            "<Transform translation='{}' rotation='{}' scale='{}'>",
            triad((cylinder.a + cylinder.b) * 0.5),
            axis_angle(rotation_axis, angle),
            triad(scale)
        )?;
        self.cylinder_shape(out, 1.0, 1.0, cylinder.endcap, cylinder.color)?;
        writeln!(out, "\n</Transform>")?;
        Ok(())
    }
}

impl SceneWriter for X3dWriter {
    fn driver_name(&self) -> &'static str {
        "X3D"
    }

    fn begin(&mut self, out: &mut Output) -> Result<()> {
        writeln!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(
            out,
            "<!DOCTYPE X3D PUBLIC \"ISO//Web3D//DTD X3D 3.1//EN\" \"http://www.web3d.org/specifications/x3d-3.1.dtd\">"
        )?;
        writeln!(
            out,
            "<X3D profile='Immersive' version='3.1' xmlns:xsd='http://www.w3.org/2001/XMLSchema-instance' \
             xsd:noNamespaceSchemaLocation=' http://www.web3d.org/specifications/x3d-3.1.xsd '>"
        )?;
        writeln!(out, "<head>")?;
        writeln!(out, "<meta name='title' content='{}'/>", escape_attr(&out.scene.title))?;
        writeln!(out, "<meta name='description' content='molecular scene'/>")?;
        writeln!(out, "<meta name='generator' content='scene-export {}'/>", env!("CARGO_PKG_VERSION"))?;
        writeln!(out, "</head>")?;
        writeln!(out, "<Scene>")?;
        writeln!(out, "<NavigationInfo type='EXAMINE'/>")?;
        writeln!(out, "<Background skyColor='{}'/>", rgb_fractional(out.scene.background))?;

        // Content is shifted by -center below, so the camera sits at its
        // offset from the center; it looks along the inverse view rotation.
        let scene = &out.scene;
        let fov = scene.aperture_angle().to_radians();
        let position = scene.camera_position() - scene.center;
        let (axis, angle) = scene.rotation().to_axis_angle();
        let orientation = if angle.abs() < f32::EPSILON || !axis.is_finite() {
            "0 0 1 0".to_string()
        } else {
            axis_angle(axis, -angle)
        };
        let viewpoint = format!(
            "<Viewpoint fieldOfView='{}' position='{}' orientation='{}'\n jump='true' description='v1'/>",
            round(fov),
            triad(position),
            orientation
        );
        writeln!(out, "{}", viewpoint)?;
        writeln!(out, "\n  <!-- ")?;
        for line in out.scene.perspective_lines() {
            writeln!(out, "  {}", line)?;
        }
        writeln!(out, "  -->\n")?;
        writeln!(out, "<Transform translation='{}'>", triad(-out.scene.center))?;
        Ok(())
    }

    fn emit_sphere(&mut self, out: &mut Output, center: Vec3, radius: f32, color: Color) -> Result<()> {
        self.sphere_shape(out, center, radius, color)
    }

    fn emit_cylinder(&mut self, out: &mut Output, cylinder: &Cylinder) -> Result<()> {
        match cylinder.section {
            CrossSection::Round => self.axial(
                out,
                cylinder.a,
                cylinder.b,
                cylinder.radius,
                cylinder.endcap,
                cylinder.color,
            ),
            CrossSection::Elliptical {
                center,
                x_point,
                y_point,
            } => self.elliptical(out, cylinder, center, x_point, y_point),
        }
    }

    fn emit_cone(&mut self, out: &mut Output, base: Vec3, tip: Vec3, radius: f32, color: Color) -> Result<()> {
        let height = base.distance(tip);
        let (axis, angle) = axis_angle_to(Vec3::Y, tip - base);
        writeln!(
            out,
            "<Transform translation='{}' rotation='{}'>",
            triad((base + tip) * 0.5),
            axis_angle(axis, angle)
        )?;
        let cone = format!("o{}_{}", (height * 100.0) as i32, (radius * 100.0) as i32);
        match self.uses.get(&format!("c{}_{}", cone, color_key(color))) {
            UseRef::Define(id) => {
                write!(out, "<Shape DEF='{}'><Cone ", id)?;
                match self.uses.get(&cone) {
                    UseRef::Define(geometry) => write!(
                        out,
                        "DEF='{}' height='{}' bottomRadius='{}'/>",
                        geometry,
                        round(height),
                        round(radius)
                    )?,
                    UseRef::Reuse(geometry) => write!(out, "USE='{}'/>", geometry)?,
                }
                self.appearance(out, color)?;
                writeln!(out, "</Shape>")?;
            }
            UseRef::Reuse(id) => writeln!(out, "<Shape USE='{}'></Shape>", id)?,
        }
        writeln!(out, "</Transform>")?;
        Ok(())
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
        let (endcap, height) = if fill {
            (Endcap::Flat, DISK_HEIGHT)
        } else {
            (Endcap::Open, RING_HEIGHT)
        };
        let half = normal.normalize_or_zero() * (height / 2.0);
        if half == Vec3::ZERO {
            log::debug!("skipping circle without a facing direction");
            return Ok(());
        }
        self.axial(out, center - half, center + half, radius, endcap, color)
    }

    fn emit_ellipsoid(&mut self, out: &mut Output, center: Vec3, axes: &[Vec3; 3], color: Color) -> Result<()> {
        let placement = frame_transform(center, axes[0], axes[1], Some(axes[2]), 1.0);
        let (axis, angle) = rotation_axis_angle(&placement);
        writeln!(
            out,
            "<Transform translation='{}' rotation='{}' scale='{}'>",
            triad(center),
            axis_angle(axis, angle),
            triad(placement.scale())
        )?;
        self.sphere_shape(out, Vec3::ZERO, 1.0, color)?;
        writeln!(out, "</Transform>")?;
        Ok(())
    }

    fn emit_triangle(&mut self, out: &mut Output, corners: [Vec3; 3], color: Color) -> Result<()> {
        writeln!(out, "<Shape>")?;
        writeln!(
            out,
            "<IndexedFaceSet solid='false' coordIndex='0 1 2 -1'><Coordinate point='{} {} {}'/></IndexedFaceSet>",
            triad(corners[0]),
            triad(corners[1]),
            triad(corners[2])
        )?;
        self.appearance(out, color)?;
        writeln!(out, "\n</Shape>")?;
        Ok(())
    }

    fn emit_surface(&mut self, out: &mut Output, surface: &PreparedSurface) -> Result<()> {
        writeln!(out, "<Shape>")?;
        self.appearance(out, surface.color)?;
        writeln!(out, "<IndexedFaceSet ")?;
        let per_face = surface.has_colors() && surface.per_polygon_colors;
        if per_face {
            writeln!(out, " colorPerVertex='false'")?;
        }

        writeln!(out, "coordIndex='")?;
        for face in &surface.faces {
            let [a, b, c] = face.position;
            writeln!(out, "{} {} {} -1", a, b, c)?;
        }
        writeln!(out, "'")?;

        writeln!(out, "  solid='false'\n  normalPerVertex='true'\n  normalIndex='")?;
        for face in &surface.faces {
            let [a, b, c] = face.normal;
            writeln!(out, "{} {} {} -1", a, b, c)?;
        }
        writeln!(out, "'")?;

        if surface.has_colors() {
            writeln!(out, "  colorIndex='")?;
            for face in &surface.faces {
                match face.color {
                    Some([a, _, _]) if per_face => writeln!(out, "{}", a)?,
                    Some([a, b, c]) => writeln!(out, "{} {} {} -1", a, b, c)?,
                    None => {}
                }
            }
            writeln!(out, "'")?;
        }
        writeln!(out, ">")?;

        writeln!(out, "<Coordinate point='")?;
        for p in &surface.positions {
            writeln!(out, "{}", triad(*p))?;
        }
        writeln!(out, "'/>")?;
        writeln!(out, "<Normal vector='")?;
        for n in &surface.normals {
            writeln!(out, "{}", triad(*n))?;
        }
        writeln!(out, "'/>")?;
        if surface.has_colors() {
            writeln!(out, "<Color color='")?;
            for color in &surface.colors.colors {
                writeln!(out, "{}", rgb_fractional(*color))?;
            }
            writeln!(out, "'/>")?;
        }
        writeln!(out, "</IndexedFaceSet>")?;
        writeln!(out, "</Shape>")?;
        Ok(())
    }

    fn emit_text_pixel(&mut self, out: &mut Output, point: Vec3, color: Color) -> Result<()> {
        writeln!(out, "<Transform translation='{}'>", triad(point))?;
        match self.uses.get(&format!("p{}", color_key(color))) {
            UseRef::Define(id) => writeln!(
                out,
                "<Shape DEF='{}'><Sphere radius='{}'/><Appearance><Material diffuseColor='0 0 0' \
                 specularColor='0 0 0' ambientIntensity='0.0' shininess='0.0' emissiveColor='{}'/></Appearance></Shape>",
                id,
                round(TEXT_PIXEL_RADIUS),
                rgb_fractional(color)
            )?,
            UseRef::Reuse(id) => writeln!(out, "<Shape USE='{}'></Shape>", id)?,
        }
        writeln!(out, "</Transform>")?;
        Ok(())
    }

    fn end(&mut self, out: &mut Output) -> Result<Vec<SideFile>> {
        writeln!(out, "</Transform>")?;
        writeln!(out, "</Scene>")?;
        writeln!(out, "</X3D>")?;
        log::debug!("{} X3D definitions", self.uses.len());
        Ok(Vec::new())
    }
}
