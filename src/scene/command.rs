//! The primitive stream a renderer replays into an exporter.
//!
//! Commands carry everything they need; the only state shared between them
//! is the definition and material caches inside a writer.

use super::SceneContext;
use crate::types::{Color, Endcap};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// One draw call.
///
/// Variants documented as model-space take world coordinates; the others
/// take screen coordinates (pixels, z away from the viewer) exactly as the
/// interactive renderer would rasterize them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawCommand {
    /// Model-space sphere.
    Atom { center: Vec3, radius: f32, color: Color },
    /// Model-space cylinder, one color per half.
    Bond {
        a: Vec3,
        b: Vec3,
        radius: f32,
        #[serde(default)]
        endcap: Endcap,
        color_a: Color,
        color_b: Color,
    },
    /// Model-space ellipsoid given by its center and three semi-axis end points.
    Ellipsoid { center: Vec3, axes: [Vec3; 3], color: Color },
    /// Model-space polygon surface.
    Surface(SurfaceMesh),

    Sphere { center: Vec3, diameter: f32, color: Color },
    Cylinder {
        a: Vec3,
        b: Vec3,
        diameter: f32,
        #[serde(default)]
        endcap: Endcap,
        color_a: Color,
        color_b: Color,
    },
    Cone { base: Vec3, tip: Vec3, diameter: f32, color: Color },
    Circle {
        center: Vec3,
        diameter: f32,
        #[serde(default)]
        fill: bool,
        color: Color,
    },
    /// Ellipse whose semi-axes end at `x_point` and `y_point`.
    Ellipse {
        center: Vec3,
        x_point: Vec3,
        y_point: Vec3,
        #[serde(default)]
        fill: bool,
        color: Color,
    },
    Triangle {
        a: Vec3,
        b: Vec3,
        c: Vec3,
        color: Color,
        #[serde(default)]
        two_sided: bool,
    },
    /// Split into the triangles `abc` and `acd`.
    Quad { a: Vec3, b: Vec3, c: Vec3, d: Vec3, color: Color },
    /// Thin flat-capped cylinder of the scene line width.
    Line { a: Vec3, b: Vec3, color: Color },
    Dot { point: Vec3, color: Color },
    /// One pixel of rasterized text.
    TextPixel { point: Vec3, color: Color },
    /// Rectangle behind a label.
    LabelBackground { corners: [Vec3; 4], color: Color },
    /// Raster image behind the scene.
    BackgroundImage,
}

impl DrawCommand {
    /// Short name for log messages.
    pub fn kind(&self) -> &'static str {
        match self {
            DrawCommand::Atom { .. } => "atom",
            DrawCommand::Bond { .. } => "bond",
            DrawCommand::Ellipsoid { .. } => "ellipsoid",
            DrawCommand::Surface(_) => "surface",
            DrawCommand::Sphere { .. } => "sphere",
            DrawCommand::Cylinder { .. } => "cylinder",
            DrawCommand::Cone { .. } => "cone",
            DrawCommand::Circle { .. } => "circle",
            DrawCommand::Ellipse { .. } => "ellipse",
            DrawCommand::Triangle { .. } => "triangle",
            DrawCommand::Quad { .. } => "quad",
            DrawCommand::Line { .. } => "line",
            DrawCommand::Dot { .. } => "dot",
            DrawCommand::TextPixel { .. } => "text_pixel",
            DrawCommand::LabelBackground { .. } => "label_background",
            DrawCommand::BackgroundImage => "background_image",
        }
    }
}

/// An arbitrary polygon surface in model coordinates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceMesh {
    pub vertices: Vec<Vec3>,
    /// Per-vertex normals; computed from the faces when absent.
    pub normals: Option<Vec<Vec3>>,
    /// Triangles or quads as vertex indices.
    pub polygons: Vec<Vec<u32>>,
    /// Solid color, used when neither color array is given.
    pub color: Color,
    pub vertex_colors: Option<Vec<Color>>,
    pub polygon_colors: Option<Vec<Color>>,
    /// Which polygons to draw; all when absent.
    pub selection: Option<Vec<bool>>,
    /// Added to every vertex.
    pub offset: Vec3,
}

impl SurfaceMesh {
    pub fn new(vertices: Vec<Vec3>, polygons: Vec<Vec<u32>>, color: Color) -> Self {
        Self {
            vertices,
            polygons,
            color,
            ..Self::default()
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn with_vertex_colors(mut self, colors: Vec<Color>) -> Self {
        self.vertex_colors = Some(colors);
        self
    }

    pub fn with_polygon_colors(mut self, colors: Vec<Color>) -> Self {
        self.polygon_colors = Some(colors);
        self
    }

    pub fn with_selection(mut self, selection: Vec<bool>) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Whether polygon `index` is drawn.
    pub fn is_selected(&self, index: usize) -> bool {
        self.selection
            .as_ref()
            .map_or(true, |s| s.get(index).copied().unwrap_or(false))
    }
}

/// A captured view plus the commands to replay into it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default)]
    pub context: SceneContext,
    #[serde(default)]
    pub commands: Vec<DrawCommand>,
}
