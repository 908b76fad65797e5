//! Scene export.
//!
//! An [`Exporter`] pairs one [`SceneWriter`] (the file format) with the
//! [`Space`] that format works in. Commands are resolved into primitives in
//! that space and handed to the writer's hooks in the order they arrive.
//!
//! ```ignore
//! use scene_export::export::{export_document, ExportFormat, OutputTarget};
//!
//! let status = export_document(ExportFormat::X3d, OutputTarget::file("scene.x3d"), &document)?;
//! println!("{}", status);
//! ```

pub mod dedup;
pub mod format;
pub mod idtf;
pub mod obj;
pub mod sink;
pub mod space;
pub mod tachyon;
pub mod x3d;

pub use dedup::{PreparedSurface, UseRef, UseTable};
pub use sink::{ExportStatus, OutputTarget, SideFile, Sink, EXPORT_FAILED};
pub use space::{CrossSection, Cylinder, Primitive, Space};

use crate::error::{ExportError, Result};
use crate::scene::{DrawCommand, SceneContext, SceneDocument};
use crate::types::Color;
use glam::Vec3;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::str::FromStr;

/// What a writer writes into: the scene being exported plus the main sink.
pub struct Output {
    pub scene: SceneContext,
    pub sink: Sink,
}

impl Output {
    pub fn target(&self) -> &OutputTarget {
        self.sink.target()
    }

    pub fn bytes_written(&self) -> usize {
        self.sink.bytes_written()
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

/// Per-format emission hooks.
///
/// Coordinates arrive in the writer's [`Space`]: model units for model-space
/// formats, pixels for screen-space ones. Every hook may write to `out`
/// directly or buffer until [`SceneWriter::end`].
pub trait SceneWriter {
    /// Name reported in the status line.
    fn driver_name(&self) -> &'static str;

    /// Write the document header.
    fn begin(&mut self, out: &mut Output) -> Result<()>;

    fn emit_sphere(&mut self, out: &mut Output, center: Vec3, radius: f32, color: Color) -> Result<()>;

    fn emit_cylinder(&mut self, out: &mut Output, cylinder: &Cylinder) -> Result<()>;

    fn emit_cone(&mut self, out: &mut Output, base: Vec3, tip: Vec3, radius: f32, color: Color) -> Result<()>;

    /// A disk, or a thin ring when `fill` is false, facing along `normal`.
    fn emit_circle(
        &mut self,
        out: &mut Output,
        center: Vec3,
        normal: Vec3,
        radius: f32,
        fill: bool,
        color: Color,
    ) -> Result<()>;

    fn emit_ellipsoid(&mut self, out: &mut Output, center: Vec3, axes: &[Vec3; 3], color: Color) -> Result<()>;

    fn emit_triangle(&mut self, out: &mut Output, corners: [Vec3; 3], color: Color) -> Result<()>;

    fn emit_surface(&mut self, out: &mut Output, surface: &PreparedSurface) -> Result<()>;

    /// One pixel of rasterized text.
    fn emit_text_pixel(&mut self, out: &mut Output, point: Vec3, color: Color) -> Result<()>;

    /// Write the footer and any side files.
    fn end(&mut self, out: &mut Output) -> Result<Vec<SideFile>>;

    /// Remove side files already written. Called when an export is abandoned.
    fn discard(&mut self) {}
}

/// The registered formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Wavefront OBJ with an MTL material library and PNG textures.
    Obj,
    /// X3D XML scene.
    X3d,
    /// Intermediate text format for U3D conversion.
    Idtf,
    /// Tachyon ray-tracer scene script.
    Tachyon,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Obj,
        ExportFormat::X3d,
        ExportFormat::Idtf,
        ExportFormat::Tachyon,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::Obj => "OBJ",
            ExportFormat::X3d => "X3D",
            ExportFormat::Idtf => "IDTF",
            ExportFormat::Tachyon => "Tachyon",
        }
    }

    /// Customary file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Obj => "obj",
            ExportFormat::X3d => "x3d",
            ExportFormat::Idtf => "idtf",
            ExportFormat::Tachyon => "tachyon",
        }
    }

    pub fn space(&self) -> Space {
        match self {
            ExportFormat::Tachyon => Space::Screen,
            _ => Space::Model,
        }
    }

    /// A fresh writer for one export pass.
    pub fn writer(&self) -> Box<dyn SceneWriter> {
        match self {
            ExportFormat::Obj => Box::new(obj::ObjWriter::new()),
            ExportFormat::X3d => Box::new(x3d::X3dWriter::new()),
            ExportFormat::Idtf => Box::new(idtf::IdtfWriter::new()),
            ExportFormat::Tachyon => Box::new(tachyon::TachyonWriter::new()),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        ExportFormat::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s) || f.extension().eq_ignore_ascii_case(s))
            .ok_or_else(|| ExportError::UnknownFormat(s.to_string()))
    }
}

/// One export pass: header on creation, one [`Exporter::draw`] per command,
/// footer and status on [`Exporter::finalize`].
pub struct Exporter {
    format: ExportFormat,
    writer: Box<dyn SceneWriter>,
    out: Output,
    primitives: usize,
}

impl Exporter {
    /// Open the destination and write the header.
    pub fn initialize(format: ExportFormat, target: OutputTarget, scene: SceneContext) -> Result<Exporter> {
        scene.validate()?;
        let sink = Sink::open(target)?;
        let mut exporter = Exporter {
            format,
            writer: format.writer(),
            out: Output { scene, sink },
            primitives: 0,
        };
        if let Err(e) = exporter.writer.begin(&mut exporter.out) {
            exporter.abort();
            return Err(e);
        }
        log::debug!("{} export to {} started", format, exporter.out.target());
        Ok(exporter)
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn scene(&self) -> &SceneContext {
        &self.out.scene
    }

    pub fn bytes_written(&self) -> usize {
        self.out.bytes_written()
    }

    /// Number of primitives handed to the writer so far.
    pub fn primitive_count(&self) -> usize {
        self.primitives
    }

    /// Replay one command.
    pub fn draw(&mut self, command: &DrawCommand) -> Result<()> {
        for primitive in self.format.space().resolve(&self.out.scene, command) {
            self.emit(primitive)?;
        }
        Ok(())
    }

    fn emit(&mut self, primitive: Primitive<'_>) -> Result<()> {
        let out = &mut self.out;
        let writer = &mut self.writer;
        match primitive {
            Primitive::Sphere { center, radius, color } => writer.emit_sphere(out, center, radius, color)?,
            Primitive::Cylinder(cylinder) => writer.emit_cylinder(out, &cylinder)?,
            Primitive::Cone {
                base,
                tip,
                radius,
                color,
            } => writer.emit_cone(out, base, tip, radius, color)?,
            Primitive::Circle {
                center,
                normal,
                radius,
                fill,
                color,
            } => writer.emit_circle(out, center, normal, radius, fill, color)?,
            Primitive::Ellipsoid { center, axes, color } => writer.emit_ellipsoid(out, center, &axes, color)?,
            Primitive::Triangle { corners, color } => writer.emit_triangle(out, corners, color)?,
            Primitive::Surface(mesh) => match PreparedSurface::prepare(&mesh) {
                Some(surface) => writer.emit_surface(out, &surface)?,
                None => {
                    log::debug!("skipping surface with no drawable faces");
                    return Ok(());
                }
            },
            Primitive::TextPixel { point, color } => writer.emit_text_pixel(out, point, color)?,
        }
        self.primitives += 1;
        Ok(())
    }

    /// Write the footer, close every file and report what was written.
    ///
    /// On failure the partial destination and side files are removed.
    pub fn finalize(mut self) -> Result<ExportStatus> {
        let side_files = match self.writer.end(&mut self.out) {
            Ok(side_files) => side_files,
            Err(e) => {
                self.abort();
                return Err(e);
            }
        };
        let Exporter {
            format,
            mut writer,
            out,
            primitives,
        } = self;
        let target = out.target().clone();
        let finished = match out.sink.finish() {
            Ok(finished) => finished,
            Err(e) => {
                writer.discard();
                if let Some(path) = target.path() {
                    let _ = fs::remove_file(path);
                }
                log::warn!("{} export to {} failed on close: {}", format, target, e);
                return Err(e);
            }
        };
        let status = ExportStatus {
            driver: writer.driver_name(),
            bytes: finished.bytes,
            target: finished.target,
            side_files,
            contents: finished
                .contents
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
        };
        log::info!("{} ({} primitives)", status, primitives);
        Ok(status)
    }

    /// Abandon the pass and delete whatever was written.
    pub fn abort(self) {
        let Exporter {
            format,
            mut writer,
            out,
            ..
        } = self;
        log::warn!("{} export to {} aborted", format, out.target());
        writer.discard();
        out.sink.discard();
    }
}

/// Export a whole document. Any failure aborts the pass.
pub fn export_document(format: ExportFormat, target: OutputTarget, document: &SceneDocument) -> Result<ExportStatus> {
    let mut exporter = Exporter::initialize(format, target, document.context.clone())?;
    for command in &document.commands {
        if let Err(e) = exporter.draw(command) {
            exporter.abort();
            return Err(e);
        }
    }
    exporter.finalize()
}

/// The status string for an export result: `OK ...` or
/// `ERROR EXPORTING FILE: <reason>`.
pub fn status_line(result: &Result<ExportStatus>) -> String {
    match result {
        Ok(status) => status.to_string(),
        Err(e) => format!("{}: {}", EXPORT_FAILED, e),
    }
}
