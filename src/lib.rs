//! # Scene Export
//!
//! Writes a molecular viewer's current scene to files that other programs
//! can render: Wavefront OBJ, X3D, IDTF (for U3D/PDF embedding) and
//! Tachyon ray-tracer scripts.
//!
//! ## Overview
//!
//! A renderer replays its frame as a stream of [`DrawCommand`]s into an
//! [`Exporter`]. Each command is resolved into geometric primitives in the
//! coordinate space the chosen format works in (model space for OBJ, X3D and
//! IDTF; screen space for Tachyon) and written through that format's writer.
//! Finishing the pass reports an [`ExportStatus`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use scene_export::{export_document, load_document, status_line, ExportFormat, OutputTarget};
//!
//! let document = load_document("scene.json")?;
//! let result = export_document(ExportFormat::Obj, OutputTarget::file("caffeine.obj"), &document);
//! println!("{}", status_line(&result));
//! ```
//!
//! ## Streaming
//!
//! ```ignore
//! use scene_export::{Exporter, ExportFormat, OutputTarget, SceneContext};
//!
//! let mut exporter = Exporter::initialize(ExportFormat::X3d, OutputTarget::Buffer, SceneContext::default())?;
//! for command in renderer.commands() {
//!     exporter.draw(&command)?;
//! }
//! let status = exporter.finalize()?;
//! ```

pub mod error;
pub mod export;
pub mod mesh;
pub mod scene;
pub mod types;

// Re-export main types for convenience
pub use error::{ExportError, Result};
pub use export::{export_document, status_line, ExportFormat, ExportStatus, Exporter, OutputTarget};
pub use scene::{DrawCommand, SceneContext, SceneDocument, SurfaceMesh};
pub use types::{Color, Endcap, Placement};

/// Load a scene document (view plus commands) from a JSON file.
pub fn load_document<P: AsRef<std::path::Path>>(path: P) -> Result<SceneDocument> {
    let text = std::fs::read_to_string(path)?;
    load_document_from_str(&text)
}

/// Parse a scene document from JSON text.
pub fn load_document_from_str(text: &str) -> Result<SceneDocument> {
    Ok(serde_json::from_str(text)?)
}
