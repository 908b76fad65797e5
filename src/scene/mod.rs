//! Scene-wide state captured once per export, and the commands replayed into
//! an exporter.

pub mod command;

pub use command::{DrawCommand, SceneDocument, SurfaceMesh};

use crate::error::{ExportError, Result};
use crate::types::Color;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Smallest depth used when undoing perspective, in model units.
const MIN_DEPTH: f32 = 1e-3;

/// Camera, lighting and screen parameters of the view being exported.
///
/// Immutable for the duration of one export pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneContext {
    /// Title written into format headers that carry one.
    pub title: String,
    /// Screen width in pixels.
    pub screen_width: u32,
    /// Screen height in pixels.
    pub screen_height: u32,
    /// Model rotation applied before projection.
    pub rotation: Quat,
    /// Center of rotation, in model units.
    pub center: Vec3,
    /// Pixels per model unit at the center of rotation.
    pub scale: f32,
    /// Distance from the camera to the center of rotation, in model units.
    pub camera_distance: f32,
    /// Whether perspective is applied.
    pub perspective: bool,
    pub background: Color,
    /// Direction towards the light.
    pub light_direction: Vec3,
    /// Ambient intensity, percent.
    pub ambient_percent: f32,
    /// Diffuse intensity, percent.
    pub diffuse_percent: f32,
    /// Specular intensity, percent.
    pub specular_percent: f32,
    pub specular_exponent: f32,
    /// Diameter of plain lines, in model units.
    pub line_width: f32,
}

impl Default for SceneContext {
    fn default() -> Self {
        Self {
            title: String::new(),
            screen_width: 500,
            screen_height: 500,
            rotation: Quat::IDENTITY,
            center: Vec3::ZERO,
            scale: 25.0,
            camera_distance: 30.0,
            perspective: true,
            background: Color::BLACK,
            light_direction: Vec3::new(-1.0, -1.0, 2.5),
            ambient_percent: 45.0,
            diffuse_percent: 84.0,
            specular_percent: 22.0,
            specular_exponent: 6.0,
            line_width: 0.02,
        }
    }
}

impl SceneContext {
    pub fn with_screen(mut self, width: u32, height: u32) -> Self {
        self.screen_width = width;
        self.screen_height = height;
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_perspective(mut self, perspective: bool) -> Self {
        self.perspective = perspective;
        self
    }

    pub fn with_view(mut self, rotation: Quat, center: Vec3) -> Self {
        self.rotation = rotation;
        self.center = center;
        self
    }

    /// Reject parameters that make the camera transform meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.screen_width == 0 || self.screen_height == 0 {
            return Err(ExportError::InvalidScene("screen size must be non-zero".into()));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(ExportError::InvalidScene(format!("scale must be positive, got {}", self.scale)));
        }
        if !(self.camera_distance.is_finite() && self.camera_distance > 0.0) {
            return Err(ExportError::InvalidScene(format!(
                "camera distance must be positive, got {}",
                self.camera_distance
            )));
        }
        if !self.rotation.is_finite() || self.rotation.length_squared() == 0.0 {
            return Err(ExportError::InvalidScene("rotation must be a non-zero quaternion".into()));
        }
        Ok(())
    }

    fn half_screen(&self) -> (f32, f32) {
        (self.screen_width as f32 / 2.0, self.screen_height as f32 / 2.0)
    }

    /// View rotation, normalized.
    pub fn rotation(&self) -> Quat {
        self.rotation.normalize()
    }

    /// Perspective factor for a point at model-space depth `depth` from the camera.
    fn perspective_factor(&self, depth: f32) -> f32 {
        if self.perspective {
            self.camera_distance / depth.max(MIN_DEPTH)
        } else {
            1.0
        }
    }

    /// Model coordinates to screen pixels; z is the distance from the camera
    /// in pixels and grows away from the viewer.
    pub fn to_screen(&self, point: Vec3) -> Vec3 {
        let v = self.rotation() * (point - self.center);
        let depth = self.camera_distance - v.z;
        let f = self.perspective_factor(depth) * self.scale;
        let (cx, cy) = self.half_screen();
        Vec3::new(cx + v.x * f, cy - v.y * f, depth * self.scale)
    }

    /// Screen pixels back to model coordinates.
    pub fn to_model(&self, screen: Vec3) -> Vec3 {
        let depth = (screen.z / self.scale).max(MIN_DEPTH);
        let f = self.perspective_factor(depth) * self.scale;
        let (cx, cy) = self.half_screen();
        let v = Vec3::new((screen.x - cx) / f, -(screen.y - cy) / f, self.camera_distance - depth);
        self.rotation().inverse() * v + self.center
    }

    /// Model length of `pixels` at screen depth `z`.
    pub fn unscale(&self, z: f32, pixels: f32) -> f32 {
        let depth = (z / self.scale).max(MIN_DEPTH);
        pixels / (self.scale * self.perspective_factor(depth))
    }

    /// Pixel length of a model length at screen depth `z`.
    pub fn scale_to_screen(&self, z: f32, length: f32) -> f32 {
        let depth = (z / self.scale).max(MIN_DEPTH);
        length * self.scale * self.perspective_factor(depth)
    }

    /// Screen-space direction of a model-space normal at `point`.
    pub fn to_screen_normal(&self, point: Vec3, normal: Vec3) -> Vec3 {
        (self.to_screen(point + normal) - self.to_screen(point)).normalize_or_zero()
    }

    /// Full field of view, in degrees, across the smaller screen dimension.
    pub fn aperture_angle(&self) -> f32 {
        let half = self.screen_width.min(self.screen_height) as f32 / 2.0;
        2.0 * (half / (self.camera_distance * self.scale)).atan().to_degrees()
    }

    /// Camera location in model coordinates.
    pub fn camera_position(&self) -> Vec3 {
        self.center + self.rotation().inverse() * Vec3::new(0.0, 0.0, self.camera_distance)
    }

    /// Light direction normalized, or straight at the viewer when unset.
    pub fn light(&self) -> Vec3 {
        self.light_direction.try_normalize().unwrap_or(Vec3::Z)
    }

    /// Key/value description of the view, written as a comment block by the
    /// formats that have comments.
    pub fn perspective_lines(&self) -> Vec<String> {
        vec![
            "view perspective:".to_string(),
            format!("screen width height: {} {}", self.screen_width, self.screen_height),
            format!("perspective: {}", self.perspective),
            format!("cameraDistance: {}", self.camera_distance),
            format!("apertureAngle(degrees): {}", self.aperture_angle()),
            format!("scalePixelsPerUnit: {}", self.scale),
            format!("light source: {} {} {}", self.light().x, self.light().y, self.light().z),
            format!(
                "lighting: ambient {} diffuse {} specular {} exponent {}",
                self.ambient_percent, self.diffuse_percent, self.specular_percent, self.specular_exponent
            ),
            format!("center: {} {} {}", self.center.x, self.center.y, self.center.z),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3, tolerance: f32) -> bool {
        (a - b).abs().max_element() <= tolerance
    }

    #[test]
    fn test_center_projects_to_screen_middle() {
        let scene = SceneContext::default();
        let s = scene.to_screen(Vec3::ZERO);
        assert!(close(s, Vec3::new(250.0, 250.0, 30.0 * 25.0), 1e-3));
    }

    #[test]
    fn test_screen_y_points_down() {
        let scene = SceneContext::default().with_perspective(false);
        let s = scene.to_screen(Vec3::Y);
        assert!((s.y - (250.0 - 25.0)).abs() < 1e-3);
    }

    #[test]
    fn test_to_model_inverts_to_screen() {
        let scene = SceneContext::default()
            .with_view(Quat::from_rotation_y(0.7) * Quat::from_rotation_x(-0.3), Vec3::new(1.0, 2.0, -1.0))
            .with_screen(640, 480);
        for p in [Vec3::ZERO, Vec3::new(3.0, -2.0, 5.0), Vec3::new(-4.0, 1.5, 0.25)] {
            let back = scene.to_model(scene.to_screen(p));
            assert!(close(back, p, 1e-3), "{:?} -> {:?}", p, back);
        }
    }

    #[test]
    fn test_unscale_inverts_scale_to_screen() {
        let scene = SceneContext::default();
        let z = scene.to_screen(Vec3::new(0.0, 0.0, 4.0)).z;
        let px = scene.scale_to_screen(z, 1.5);
        assert!((scene.unscale(z, px) - 1.5).abs() < 1e-4);
        // Closer points look bigger.
        assert!(px > 1.5 * scene.scale);
    }

    #[test]
    fn test_camera_position_without_rotation() {
        let scene = SceneContext::default();
        assert!(close(scene.camera_position(), Vec3::new(0.0, 0.0, 30.0), 1e-5));
    }

    #[test]
    fn test_aperture_angle() {
        let scene = SceneContext::default();
        let expected = 2.0 * (250.0f32 / 750.0).atan().to_degrees();
        assert!((scene.aperture_angle() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_validate() {
        assert!(SceneContext::default().validate().is_ok());
        assert!(SceneContext::default().with_scale(0.0).validate().is_err());
        assert!(SceneContext::default().with_screen(0, 10).validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let scene: SceneContext =
            serde_json::from_str(r##"{"screen_width": 800, "background": "#FFFFFF"}"##).unwrap();
        assert_eq!(scene.screen_width, 800);
        assert_eq!(scene.screen_height, 500);
        assert_eq!(scene.background, Color::WHITE);
    }
}
