//! Coordinate-space policies.
//!
//! A [`Space`] turns each [`DrawCommand`] into the [`Primitive`]s a writer
//! sees, already converted to the writer's native coordinates. Model space
//! undoes the camera and measures in model units; screen space keeps raster
//! coordinates and pixel radii and clips against the window.

use crate::mesh::canonical::is_degenerate;
use crate::scene::{DrawCommand, SceneContext, SurfaceMesh};
use crate::types::{Color, Endcap};
use glam::Vec3;
use std::borrow::Cow;

/// Spherical end caps are drawn as spheres this much larger than the tube.
const END_SPHERE_SCALE: f32 = 1.01;

/// Model-space ellipses are drawn this much wider than their semi-axes.
const ELLIPSE_RADIUS_SCALE: f32 = 1.01;

/// Smallest model-space cone radius.
const MIN_CONE_RADIUS: f32 = 0.05;

/// Cross-section of a cylinder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrossSection {
    Round,
    /// Semi-axes from `center` to `x_point` and `y_point`; the cylinder's
    /// `radius` then scales both.
    Elliptical {
        center: Vec3,
        x_point: Vec3,
        y_point: Vec3,
    },
}

/// A cylinder from `a` to `b`. Spherical end caps never reach a writer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    pub a: Vec3,
    pub b: Vec3,
    pub radius: f32,
    pub endcap: Endcap,
    pub color: Color,
    pub section: CrossSection,
}

impl Cylinder {
    pub fn round(a: Vec3, b: Vec3, radius: f32, endcap: Endcap, color: Color) -> Self {
        Self {
            a,
            b,
            radius,
            endcap: endcap.body(),
            color,
            section: CrossSection::Round,
        }
    }

    pub fn length(&self) -> f32 {
        self.a.distance(self.b)
    }
}

/// Geometry in a writer's native coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive<'a> {
    Sphere {
        center: Vec3,
        radius: f32,
        color: Color,
    },
    Cylinder(Cylinder),
    Cone {
        base: Vec3,
        tip: Vec3,
        radius: f32,
        color: Color,
    },
    /// Disk (filled) or thin ring facing along `normal`.
    Circle {
        center: Vec3,
        normal: Vec3,
        radius: f32,
        fill: bool,
        color: Color,
    },
    /// Center plus the end points of three semi-axes.
    Ellipsoid {
        center: Vec3,
        axes: [Vec3; 3],
        color: Color,
    },
    Triangle {
        corners: [Vec3; 3],
        color: Color,
    },
    Surface(Cow<'a, SurfaceMesh>),
    TextPixel {
        point: Vec3,
        color: Color,
    },
}

/// Native coordinate space of a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    Model,
    Screen,
}

impl std::fmt::Display for Space {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Space::Model => f.write_str("model"),
            Space::Screen => f.write_str("screen"),
        }
    }
}

impl Space {
    /// Primitives for one command, in emission order. Empty when the command
    /// has nothing to draw in this space.
    pub fn resolve<'a>(&self, scene: &SceneContext, command: &'a DrawCommand) -> Vec<Primitive<'a>> {
        let mut out = Vec::new();
        match self {
            Space::Model => model(scene, command, &mut out),
            Space::Screen => screen(scene, command, &mut out),
        }
        if out.is_empty() {
            log::debug!("{} command produced nothing in {} space", command.kind(), self);
        }
        out
    }
}

fn usable(points: &[Vec3]) -> bool {
    points.iter().all(|p| p.is_finite())
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

/// Cylinder halves for a two-color stick, plus end spheres for spherical caps.
fn split_cylinder(
    out: &mut Vec<Primitive<'_>>,
    a: Vec3,
    b: Vec3,
    radius: f32,
    endcap: Endcap,
    colors: (Color, Color),
    end_radius: Option<f32>,
) {
    if colors.0 == colors.1 {
        out.push(Primitive::Cylinder(Cylinder::round(a, b, radius, endcap, colors.0)));
    } else {
        let mid = (a + b) * 0.5;
        out.push(Primitive::Cylinder(Cylinder::round(a, mid, radius, endcap, colors.0)));
        out.push(Primitive::Cylinder(Cylinder::round(mid, b, radius, endcap, colors.1)));
    }
    if endcap == Endcap::Spherical {
        if let Some(r) = end_radius {
            out.push(Primitive::Sphere {
                center: a,
                radius: r,
                color: colors.0,
            });
            out.push(Primitive::Sphere {
                center: b,
                radius: r,
                color: colors.1,
            });
        }
    }
}

fn push_triangle<'a>(out: &mut Vec<Primitive<'a>>, corners: [Vec3; 3], color: Color) {
    if !usable(&corners) || is_degenerate(corners[0], corners[1], corners[2]) {
        log::debug!("skipping degenerate triangle");
        return;
    }
    out.push(Primitive::Triangle { corners, color });
}

fn model<'a>(scene: &SceneContext, command: &'a DrawCommand, out: &mut Vec<Primitive<'a>>) {
    let m = |p: Vec3| scene.to_model(p);
    match command {
        DrawCommand::Atom { center, radius, color } => {
            if positive(*radius) && usable(&[*center]) {
                out.push(Primitive::Sphere {
                    center: *center,
                    radius: *radius,
                    color: *color,
                });
            }
        }
        DrawCommand::Bond {
            a,
            b,
            radius,
            endcap,
            color_a,
            color_b,
        } => {
            if positive(*radius) && usable(&[*a, *b]) && a != b {
                let end = *radius * END_SPHERE_SCALE;
                split_cylinder(out, *a, *b, *radius, *endcap, (*color_a, *color_b), Some(end));
            }
        }
        DrawCommand::Ellipsoid { center, axes, color } => {
            if usable(&[*center]) && usable(axes) {
                out.push(Primitive::Ellipsoid {
                    center: *center,
                    axes: *axes,
                    color: *color,
                });
            }
        }
        DrawCommand::Surface(surface) => out.push(Primitive::Surface(Cow::Borrowed(surface))),
        DrawCommand::Sphere { center, diameter, color } => {
            let radius = scene.unscale(center.z, *diameter) / 2.0;
            if positive(radius) && usable(&[*center]) {
                out.push(Primitive::Sphere {
                    center: m(*center),
                    radius,
                    color: *color,
                });
            }
        }
        DrawCommand::Cylinder {
            a,
            b,
            diameter,
            endcap,
            color_a,
            color_b,
        } => {
            let radius = scene.unscale((a.z + b.z) / 2.0, *diameter) / 2.0;
            let (pa, pb) = (m(*a), m(*b));
            if positive(radius) && usable(&[pa, pb]) && pa != pb {
                let end = radius * END_SPHERE_SCALE;
                split_cylinder(out, pa, pb, radius, *endcap, (*color_a, *color_b), Some(end));
            }
        }
        DrawCommand::Cone {
            base,
            tip,
            diameter,
            color,
        } => {
            if positive(*diameter) && usable(&[*base, *tip]) {
                let radius = (scene.unscale(base.z, *diameter) / 2.0).max(MIN_CONE_RADIUS);
                out.push(Primitive::Cone {
                    base: m(*base),
                    tip: m(*tip),
                    radius,
                    color: *color,
                });
            }
        }
        DrawCommand::Circle {
            center,
            diameter,
            fill,
            color,
        } => {
            let radius = scene.unscale(center.z, *diameter) / 2.0;
            if positive(radius) && usable(&[*center]) {
                let c = m(*center);
                let behind = m(*center + Vec3::Z);
                out.push(Primitive::Circle {
                    center: c,
                    normal: (behind - c).normalize_or_zero(),
                    radius,
                    fill: *fill,
                    color: *color,
                });
            }
        }
        DrawCommand::Ellipse {
            center,
            x_point,
            y_point,
            fill,
            color,
        } => {
            if !usable(&[*center, *x_point, *y_point]) {
                return;
            }
            let (c, x, y) = (m(*center), m(*x_point), m(*y_point));
            let Some(n) = (x - c).cross(y - c).try_normalize() else {
                log::debug!("skipping flat ellipse");
                return;
            };
            let n = n * if *fill { 0.002 } else { 0.005 };
            let endcap = if *fill { Endcap::Flat } else { Endcap::None };
            out.push(Primitive::Cylinder(Cylinder {
                a: c - n,
                b: c + n,
                radius: ELLIPSE_RADIUS_SCALE,
                endcap,
                color: *color,
                section: CrossSection::Elliptical {
                    center: c,
                    x_point: x,
                    y_point: y,
                },
            }));
        }
        DrawCommand::Triangle {
            a,
            b,
            c,
            color,
            two_sided,
        } => {
            let (pa, pb, pc) = (m(*a), m(*b), m(*c));
            push_triangle(out, [pa, pb, pc], *color);
            if *two_sided {
                push_triangle(out, [pa, pc, pb], *color);
            }
        }
        DrawCommand::Quad { a, b, c, d, color } => {
            let (pa, pb, pc, pd) = (m(*a), m(*b), m(*c), m(*d));
            push_triangle(out, [pa, pb, pc], *color);
            push_triangle(out, [pa, pc, pd], *color);
        }
        DrawCommand::Line { a, b, color } => {
            let (pa, pb) = (m(*a), m(*b));
            if positive(scene.line_width) && usable(&[pa, pb]) && pa != pb {
                out.push(Primitive::Cylinder(Cylinder::round(
                    pa,
                    pb,
                    scene.line_width / 2.0,
                    Endcap::Flat,
                    *color,
                )));
            }
        }
        DrawCommand::Dot { point, color } => {
            if usable(&[*point]) {
                out.push(Primitive::Sphere {
                    center: m(*point),
                    radius: scene.unscale(point.z, 1.0) / 2.0,
                    color: *color,
                });
            }
        }
        DrawCommand::TextPixel { point, color } => {
            if usable(&[*point]) {
                out.push(Primitive::TextPixel {
                    point: m(*point),
                    color: *color,
                });
            }
        }
        // No meaning once perspective is gone.
        DrawCommand::LabelBackground { .. } | DrawCommand::BackgroundImage => {}
    }
}

/// Inside the window, allowing `margin` pixels past each edge.
fn on_screen(scene: &SceneContext, p: Vec3, margin: f32) -> bool {
    let (w, h) = (scene.screen_width as f32, scene.screen_height as f32);
    p.x + margin >= 0.0 && p.x - margin < w && p.y + margin >= 0.0 && p.y - margin < h
}

/// Pixel radius from a pixel diameter: zero stays zero (skipped), anything
/// smaller than a pixel is drawn as one.
fn pixel_radius(diameter: f32) -> Option<f32> {
    if !positive(diameter) {
        return None;
    }
    Some((diameter / 2.0).max(1.0))
}

fn screen_sphere(out: &mut Vec<Primitive<'_>>, scene: &SceneContext, center: Vec3, radius: f32, color: Color) {
    if on_screen(scene, center, radius) {
        out.push(Primitive::Sphere { center, radius, color });
    }
}

fn screen_cylinder(
    out: &mut Vec<Primitive<'_>>,
    scene: &SceneContext,
    a: Vec3,
    b: Vec3,
    radius: f32,
    endcap: Endcap,
    colors: (Color, Color),
) {
    if !on_screen(scene, a, radius) && !on_screen(scene, b, radius) {
        return;
    }
    if a.distance(b) == 0.0 {
        screen_sphere(out, scene, a, radius, colors.0);
        return;
    }
    let end = (radius > 1.0).then_some(radius);
    split_cylinder(out, a, b, radius, endcap, colors, end);
}

/// Two triangles `abc` and `acd`, dropped when no corner is in the window.
fn screen_quad(out: &mut Vec<Primitive<'_>>, scene: &SceneContext, corners: [Vec3; 4], color: Color) {
    if !corners.iter().any(|p| on_screen(scene, *p, 0.0)) {
        return;
    }
    let [a, b, c, d] = corners;
    push_triangle(out, [a, b, c], color);
    push_triangle(out, [a, c, d], color);
}

fn screen<'a>(scene: &SceneContext, command: &'a DrawCommand, out: &mut Vec<Primitive<'a>>) {
    let s = |p: Vec3| scene.to_screen(p);
    match command {
        DrawCommand::Atom { center, radius, color } => {
            if positive(*radius) && usable(&[*center]) {
                let c = s(*center);
                let r = scene.scale_to_screen(c.z, *radius);
                screen_sphere(out, scene, c, r, *color);
            }
        }
        DrawCommand::Bond {
            a,
            b,
            radius,
            endcap,
            color_a,
            color_b,
        } => {
            if positive(*radius) && usable(&[*a, *b]) {
                let (pa, pb) = (s(*a), s(*b));
                let px = scene.scale_to_screen((pa.z + pb.z) / 2.0, *radius);
                if let Some(r) = pixel_radius(2.0 * px) {
                    screen_cylinder(out, scene, pa, pb, r, *endcap, (*color_a, *color_b));
                }
            }
        }
        DrawCommand::Ellipsoid { center, axes, color } => {
            if usable(&[*center]) && usable(axes) {
                let c = s(*center);
                let largest = axes.iter().map(|p| s(*p).distance(c)).fold(0.0f32, f32::max);
                log::debug!("ellipsoid drawn as a sphere in screen space");
                if let Some(r) = pixel_radius(2.0 * largest) {
                    screen_sphere(out, scene, c, r, *color);
                }
            }
        }
        DrawCommand::Surface(surface) => {
            let vertices: Vec<Vec3> = surface.vertices.iter().map(|v| s(*v + surface.offset)).collect();
            let normals = surface.normals.as_ref().map(|normals| {
                surface
                    .vertices
                    .iter()
                    .zip(normals)
                    .map(|(v, n)| {
                        if n.is_finite() {
                            scene.to_screen_normal(*v + surface.offset, *n)
                        } else {
                            Vec3::ZERO
                        }
                    })
                    .collect()
            });
            out.push(Primitive::Surface(Cow::Owned(SurfaceMesh {
                vertices,
                normals,
                polygons: surface.polygons.clone(),
                color: surface.color,
                vertex_colors: surface.vertex_colors.clone(),
                polygon_colors: surface.polygon_colors.clone(),
                selection: surface.selection.clone(),
                offset: Vec3::ZERO,
            })));
        }
        DrawCommand::Sphere { center, diameter, color } => {
            if let Some(r) = pixel_radius(*diameter).filter(|_| usable(&[*center])) {
                screen_sphere(out, scene, *center, r, *color);
            }
        }
        DrawCommand::Cylinder {
            a,
            b,
            diameter,
            endcap,
            color_a,
            color_b,
        } => {
            if let Some(r) = pixel_radius(*diameter).filter(|_| usable(&[*a, *b])) {
                screen_cylinder(out, scene, *a, *b, r, *endcap, (*color_a, *color_b));
            }
        }
        DrawCommand::Cone {
            base,
            tip,
            diameter,
            color,
        } => {
            if let Some(r) = pixel_radius(*diameter).filter(|_| usable(&[*base, *tip])) {
                if on_screen(scene, *base, r) || on_screen(scene, *tip, r) {
                    out.push(Primitive::Cone {
                        base: *base,
                        tip: *tip,
                        radius: r,
                        color: *color,
                    });
                }
            }
        }
        DrawCommand::Circle {
            center,
            diameter,
            fill,
            color,
        } => {
            if let Some(r) = pixel_radius(*diameter).filter(|_| usable(&[*center])) {
                if on_screen(scene, *center, r) {
                    out.push(Primitive::Circle {
                        center: *center,
                        normal: -Vec3::Z,
                        radius: r,
                        fill: *fill,
                        color: *color,
                    });
                }
            }
        }
        DrawCommand::Ellipse {
            center,
            x_point,
            y_point,
            fill,
            color,
        } => {
            if !usable(&[*center, *x_point, *y_point]) {
                return;
            }
            let largest = center.distance(*x_point).max(center.distance(*y_point));
            log::debug!("ellipse drawn as a circle in screen space");
            if let Some(r) = pixel_radius(2.0 * largest) {
                if on_screen(scene, *center, r) {
                    out.push(Primitive::Circle {
                        center: *center,
                        normal: -Vec3::Z,
                        radius: r,
                        fill: *fill,
                        color: *color,
                    });
                }
            }
        }
        DrawCommand::Triangle { a, b, c, color, .. } => {
            if [a, b, c].iter().any(|p| on_screen(scene, **p, 0.0)) {
                push_triangle(out, [*a, *b, *c], *color);
            }
        }
        DrawCommand::Quad { a, b, c, d, color } => screen_quad(out, scene, [*a, *b, *c, *d], *color),
        DrawCommand::Line { a, b, color } => {
            let px = scene.scale_to_screen((a.z + b.z) / 2.0, scene.line_width);
            if let Some(r) = pixel_radius(px).filter(|_| usable(&[*a, *b])) {
                screen_cylinder(out, scene, *a, *b, r, Endcap::Flat, (*color, *color));
            }
        }
        DrawCommand::Dot { point, color } => {
            if usable(&[*point]) {
                screen_sphere(out, scene, *point, 0.75, *color);
            }
        }
        DrawCommand::TextPixel { point, color } => {
            if usable(&[*point]) && on_screen(scene, *point, 0.0) {
                out.push(Primitive::TextPixel {
                    point: *point,
                    color: *color,
                });
            }
        }
        DrawCommand::LabelBackground { corners, color } => screen_quad(out, scene, *corners, *color),
        DrawCommand::BackgroundImage => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(255, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);

    fn close(a: Vec3, b: Vec3, tolerance: f32) -> bool {
        (a - b).abs().max_element() <= tolerance
    }

    #[test]
    fn test_zero_radius_atom_is_skipped() {
        let scene = SceneContext::default();
        let atom = DrawCommand::Atom {
            center: Vec3::ZERO,
            radius: 0.0,
            color: RED,
        };
        assert!(Space::Model.resolve(&scene, &atom).is_empty());
        assert!(Space::Screen.resolve(&scene, &atom).is_empty());
    }

    #[test]
    fn test_bond_split_in_model_space() {
        let scene = SceneContext::default();
        let bond = DrawCommand::Bond {
            a: Vec3::ZERO,
            b: Vec3::new(2.0, 0.0, 0.0),
            radius: 0.2,
            endcap: Endcap::Spherical,
            color_a: RED,
            color_b: BLUE,
        };
        let prims = Space::Model.resolve(&scene, &bond);
        assert_eq!(prims.len(), 4);
        match (&prims[0], &prims[1]) {
            (Primitive::Cylinder(first), Primitive::Cylinder(second)) => {
                assert_eq!(first.b, Vec3::X);
                assert_eq!(second.a, Vec3::X);
                assert_eq!(first.color, RED);
                assert_eq!(second.color, BLUE);
                assert_eq!(first.endcap, Endcap::None);
            }
            other => panic!("unexpected {:?}", other),
        }
        match &prims[3] {
            Primitive::Sphere { center, radius, color } => {
                assert_eq!(*center, Vec3::new(2.0, 0.0, 0.0));
                assert!((radius - 0.202).abs() < 1e-6);
                assert_eq!(*color, BLUE);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_single_color_bond_keeps_flat_caps() {
        let scene = SceneContext::default();
        let bond = DrawCommand::Bond {
            a: Vec3::ZERO,
            b: Vec3::Y,
            radius: 0.2,
            endcap: Endcap::Flat,
            color_a: RED,
            color_b: RED,
        };
        let prims = Space::Model.resolve(&scene, &bond);
        assert_eq!(prims.len(), 1);
        assert!(matches!(&prims[0], Primitive::Cylinder(c) if c.endcap == Endcap::Flat));
    }

    #[test]
    fn test_screen_sphere_back_to_model() {
        let scene = SceneContext::default();
        let center = scene.to_screen(Vec3::new(1.0, -1.0, 0.0));
        let diameter = 2.0 * scene.scale_to_screen(center.z, 1.5);
        let sphere = DrawCommand::Sphere {
            center,
            diameter,
            color: RED,
        };
        match Space::Model.resolve(&scene, &sphere).as_slice() {
            [Primitive::Sphere { center, radius, .. }] => {
                assert!(close(*center, Vec3::new(1.0, -1.0, 0.0), 1e-3));
                assert!((radius - 1.5).abs() < 1e-3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_label_background_only_in_screen_space() {
        let scene = SceneContext::default();
        let label = DrawCommand::LabelBackground {
            corners: [
                Vec3::new(10.0, 10.0, 5.0),
                Vec3::new(20.0, 10.0, 5.0),
                Vec3::new(20.0, 20.0, 5.0),
                Vec3::new(10.0, 20.0, 5.0),
            ],
            color: RED,
        };
        assert!(Space::Model.resolve(&scene, &label).is_empty());
        assert_eq!(Space::Screen.resolve(&scene, &label).len(), 2);
        assert!(Space::Screen.resolve(&scene, &DrawCommand::BackgroundImage).is_empty());
    }

    #[test]
    fn test_screen_clipping() {
        let scene = SceneContext::default();
        let inside = DrawCommand::Sphere {
            center: Vec3::new(-3.0, 100.0, 10.0),
            diameter: 10.0,
            color: RED,
        };
        let outside = DrawCommand::Sphere {
            center: Vec3::new(-30.0, 100.0, 10.0),
            diameter: 10.0,
            color: RED,
        };
        assert_eq!(Space::Screen.resolve(&scene, &inside).len(), 1);
        assert!(Space::Screen.resolve(&scene, &outside).is_empty());
        // Model space never clips.
        assert_eq!(Space::Model.resolve(&scene, &outside).len(), 1);
    }

    #[test]
    fn test_screen_quads_are_clipped() {
        let scene = SceneContext::default();
        let corners = |x: f32| {
            [
                Vec3::new(x, 10.0, 5.0),
                Vec3::new(x + 10.0, 10.0, 5.0),
                Vec3::new(x + 10.0, 20.0, 5.0),
                Vec3::new(x, 20.0, 5.0),
            ]
        };
        let [a, b, c, d] = corners(-100.0);
        let quad = DrawCommand::Quad { a, b, c, d, color: RED };
        let label = DrawCommand::LabelBackground {
            corners: corners(600.0),
            color: RED,
        };
        assert!(Space::Screen.resolve(&scene, &quad).is_empty());
        assert!(Space::Screen.resolve(&scene, &label).is_empty());
        let [a, b, c, d] = corners(-5.0);
        let straddling = DrawCommand::Quad { a, b, c, d, color: RED };
        assert_eq!(Space::Screen.resolve(&scene, &straddling).len(), 2);
    }

    #[test]
    fn test_screen_small_and_zero_diameters() {
        let scene = SceneContext::default();
        let tiny = DrawCommand::Cylinder {
            a: Vec3::new(10.0, 10.0, 10.0),
            b: Vec3::new(20.0, 10.0, 10.0),
            diameter: 0.5,
            endcap: Endcap::None,
            color_a: RED,
            color_b: RED,
        };
        match Space::Screen.resolve(&scene, &tiny).as_slice() {
            [Primitive::Cylinder(c)] => assert_eq!(c.radius, 1.0),
            other => panic!("unexpected {:?}", other),
        }
        let zero = DrawCommand::Sphere {
            center: Vec3::new(10.0, 10.0, 10.0),
            diameter: 0.0,
            color: RED,
        };
        assert!(Space::Screen.resolve(&scene, &zero).is_empty());
    }

    #[test]
    fn test_screen_zero_length_cylinder_is_sphere() {
        let scene = SceneContext::default();
        let p = Vec3::new(40.0, 40.0, 10.0);
        let cylinder = DrawCommand::Cylinder {
            a: p,
            b: p,
            diameter: 6.0,
            endcap: Endcap::Flat,
            color_a: RED,
            color_b: BLUE,
        };
        match Space::Screen.resolve(&scene, &cylinder).as_slice() {
            [Primitive::Sphere { radius, color, .. }] => {
                assert_eq!(*radius, 3.0);
                assert_eq!(*color, RED);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_screen_ellipse_becomes_circle() {
        let scene = SceneContext::default();
        let ellipse = DrawCommand::Ellipse {
            center: Vec3::new(50.0, 50.0, 10.0),
            x_point: Vec3::new(58.0, 50.0, 10.0),
            y_point: Vec3::new(50.0, 54.0, 10.0),
            fill: true,
            color: RED,
        };
        match Space::Screen.resolve(&scene, &ellipse).as_slice() {
            [Primitive::Circle { radius, fill, .. }] => {
                assert_eq!(*radius, 8.0);
                assert!(*fill);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_model_ellipse_is_thin_elliptical_cylinder() {
        let scene = SceneContext::default();
        let center = scene.to_screen(Vec3::ZERO);
        let ellipse = DrawCommand::Ellipse {
            center,
            x_point: center + Vec3::new(20.0, 0.0, 0.0),
            y_point: center + Vec3::new(0.0, 10.0, 0.0),
            fill: true,
            color: RED,
        };
        match Space::Model.resolve(&scene, &ellipse).as_slice() {
            [Primitive::Cylinder(c)] => {
                assert_eq!(c.endcap, Endcap::Flat);
                assert!((c.length() - 0.004).abs() < 1e-4);
                assert!(matches!(c.section, CrossSection::Elliptical { .. }));
                assert_eq!(c.radius, ELLIPSE_RADIUS_SCALE);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_two_sided_triangle_in_model_space() {
        let scene = SceneContext::default();
        let triangle = DrawCommand::Triangle {
            a: Vec3::new(100.0, 100.0, 700.0),
            b: Vec3::new(200.0, 100.0, 700.0),
            c: Vec3::new(100.0, 200.0, 700.0),
            color: RED,
            two_sided: true,
        };
        let prims = Space::Model.resolve(&scene, &triangle);
        assert_eq!(prims.len(), 2);
        match (&prims[0], &prims[1]) {
            (Primitive::Triangle { corners: front, .. }, Primitive::Triangle { corners: back, .. }) => {
                assert_eq!(front[1], back[2]);
                assert_eq!(front[2], back[1]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_quad_half_is_skipped() {
        let scene = SceneContext::default();
        let p = Vec3::new(100.0, 100.0, 700.0);
        let quad = DrawCommand::Quad {
            a: p,
            b: p + Vec3::X * 10.0,
            c: p + Vec3::Y * 10.0,
            d: p + Vec3::Y * 10.0,
            color: RED,
        };
        assert_eq!(Space::Model.resolve(&scene, &quad).len(), 1);
    }

    #[test]
    fn test_screen_surface_is_projected() {
        let scene = SceneContext::default();
        let surface = SurfaceMesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![vec![0, 1, 2]], RED)
            .with_normals(vec![Vec3::Z; 3]);
        let command = DrawCommand::Surface(surface);
        match Space::Screen.resolve(&scene, &command).as_slice() {
            [Primitive::Surface(mesh)] => {
                assert!(close(mesh.vertices[0], scene.to_screen(Vec3::ZERO), 1e-3));
                let n = mesh.normals.as_ref().unwrap()[0];
                // Toward the viewer is -z on screen.
                assert!(n.z < -0.99);
                assert_eq!(mesh.polygons, vec![vec![0, 1, 2]]);
                assert_eq!(mesh.color, RED);
                assert_eq!(mesh.offset, Vec3::ZERO);
            }
            other => panic!("unexpected {:?}", other),
        }
        match Space::Model.resolve(&scene, &command).as_slice() {
            [Primitive::Surface(Cow::Borrowed(_))] => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
