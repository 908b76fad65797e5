//! Byte-counting output sinks and the status line reported at the end of an
//! export.

use crate::error::{ExportError, Result};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Status prefix reported when the destination could not be completed.
pub const EXPORT_FAILED: &str = "ERROR EXPORTING FILE";

/// Where an export goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    /// Kept in memory and returned in the status.
    Buffer,
}

impl OutputTarget {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        OutputTarget::File(path.into())
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            OutputTarget::File(path) => Some(path),
            OutputTarget::Buffer => None,
        }
    }

    /// A companion target: the destination with its extension replaced by
    /// `suffix` (`scene.obj` + `.mtl` -> `scene.mtl`).
    pub fn sibling(&self, suffix: &str) -> OutputTarget {
        match self {
            OutputTarget::File(path) => {
                let mut name = path.with_extension("").into_os_string();
                name.push(suffix);
                OutputTarget::File(PathBuf::from(name))
            }
            OutputTarget::Buffer => OutputTarget::Buffer,
        }
    }

    /// File name without directories, for references between files.
    pub fn file_name(&self) -> String {
        match self {
            OutputTarget::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            OutputTarget::Buffer => "buffer".to_string(),
        }
    }

    /// Base name without extension.
    pub fn stem(&self) -> String {
        match self {
            OutputTarget::File(path) => path
                .file_stem()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            OutputTarget::Buffer => "buffer".to_string(),
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::File(path) => write!(f, "{}", path.display()),
            OutputTarget::Buffer => f.write_str("buffer"),
        }
    }
}

enum Inner {
    File(BufWriter<File>),
    Buffer(Vec<u8>),
}

/// A text destination that counts every byte written to it.
///
/// The file handle is closed when the sink is finished, discarded or dropped.
pub struct Sink {
    inner: Inner,
    bytes: usize,
    target: OutputTarget,
}

impl Sink {
    /// Open (create or truncate) the destination.
    pub fn open(target: OutputTarget) -> Result<Sink> {
        let inner = match &target {
            OutputTarget::File(path) => {
                let file = File::create(path).map_err(|source| ExportError::SinkOpen {
                    path: path.clone(),
                    source,
                })?;
                Inner::File(BufWriter::new(file))
            }
            OutputTarget::Buffer => Inner::Buffer(Vec::new()),
        };
        Ok(Sink {
            inner,
            bytes: 0,
            target,
        })
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes
    }

    pub fn target(&self) -> &OutputTarget {
        &self.target
    }

    /// Append text.
    pub fn write_str(&mut self, text: &str) -> Result<()> {
        self.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Flush and close, returning what was written.
    pub fn finish(self) -> Result<Finished> {
        let Sink { inner, bytes, target } = self;
        let contents = match inner {
            Inner::File(mut writer) => {
                writer.flush()?;
                let file = writer.into_inner().map_err(|e| e.into_error())?;
                file.sync_all()?;
                None
            }
            Inner::Buffer(buffer) => Some(buffer),
        };
        Ok(Finished {
            bytes,
            target,
            contents,
        })
    }

    /// Close without flushing and remove the destination file.
    pub fn discard(self) {
        let Sink { inner, target, .. } = self;
        drop(inner);
        if let OutputTarget::File(path) = target {
            if let Err(e) = fs::remove_file(&path) {
                log::warn!("could not remove partial file {}: {}", path.display(), e);
            }
        }
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = match &mut self.inner {
            Inner::File(writer) => writer.write(buf)?,
            Inner::Buffer(buffer) => buffer.write(buf)?,
        };
        self.bytes += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            Inner::File(writer) => writer.flush(),
            Inner::Buffer(_) => Ok(()),
        }
    }
}

/// A closed sink.
#[derive(Debug, Clone)]
pub struct Finished {
    pub bytes: usize,
    pub target: OutputTarget,
    /// Buffered output, for [`OutputTarget::Buffer`].
    pub contents: Option<Vec<u8>>,
}

/// A companion file written next to the main destination.
#[derive(Debug, Clone, PartialEq)]
pub struct SideFile {
    pub bytes: usize,
    pub target: OutputTarget,
    /// Extra detail printed before the path, e.g. image dimensions.
    pub detail: Option<String>,
    /// Contents when the export goes to memory.
    pub contents: Option<Vec<u8>>,
}

impl SideFile {
    pub fn from_finished(finished: Finished) -> Self {
        SideFile {
            bytes: finished.bytes,
            target: finished.target,
            detail: None,
            contents: finished.contents,
        }
    }
}

/// Write a whole companion file in one go.
pub fn write_side_file(target: OutputTarget, contents: &[u8], detail: Option<String>) -> Result<SideFile> {
    let mut sink = Sink::open(target)?;
    if let Err(e) = sink.write_all(contents) {
        log::warn!("could not write {}: {}", sink.target(), e);
        sink.discard();
        return Err(e.into());
    }
    let mut side = SideFile::from_finished(sink.finish()?);
    side.detail = detail;
    Ok(side)
}

impl fmt::Display for SideFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({}) {}", self.bytes, detail, self.target),
            None => write!(f, "{} {}", self.bytes, self.target),
        }
    }
}

/// Outcome of a completed export.
///
/// Displays as `OK <bytes> <driver> <destination>`, followed by
/// `, <bytes> <path>` for each side file.
#[derive(Debug, Clone)]
pub struct ExportStatus {
    pub driver: &'static str,
    pub bytes: usize,
    pub target: OutputTarget,
    pub side_files: Vec<SideFile>,
    /// The document itself, for [`OutputTarget::Buffer`].
    pub contents: Option<String>,
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OK {} {} {}", self.bytes, self.driver, self.target)?;
        for side in &self.side_files {
            write!(f, ", {}", side)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_counts_bytes() {
        let mut sink = Sink::open(OutputTarget::Buffer).unwrap();
        sink.write_str("abc").unwrap();
        write!(sink, "{}\n", 42).unwrap();
        assert_eq!(sink.bytes_written(), 6);
        let finished = sink.finish().unwrap();
        assert_eq!(finished.contents.unwrap(), b"abc42\n");
    }

    #[test]
    fn test_file_sink_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.txt");
        let mut sink = Sink::open(OutputTarget::file(&path)).unwrap();
        sink.write_str("hello\n").unwrap();
        let finished = sink.finish().unwrap();
        assert_eq!(finished.bytes, 6);
        assert!(finished.contents.is_none());
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn test_open_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("scene.txt");
        match Sink::open(OutputTarget::file(&path)) {
            Err(ExportError::SinkOpen { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected SinkOpen, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_discard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.x3d");
        let mut sink = Sink::open(OutputTarget::file(&path)).unwrap();
        sink.write_str("<X3D>").unwrap();
        sink.discard();
        assert!(!path.exists());
    }

    #[test]
    fn test_sibling_names() {
        let target = OutputTarget::file("/tmp/out/scene.obj");
        assert_eq!(target.sibling(".mtl"), OutputTarget::file("/tmp/out/scene.mtl"));
        assert_eq!(
            target.sibling("_Surface1.png"),
            OutputTarget::file("/tmp/out/scene_Surface1.png")
        );
        assert_eq!(target.file_name(), "scene.obj");
        assert_eq!(target.stem(), "scene");
        assert_eq!(OutputTarget::Buffer.sibling(".mtl"), OutputTarget::Buffer);
    }

    #[test]
    fn test_write_side_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene_Surface1.png");
        let side = write_side_file(OutputTarget::file(&path), b"\x89PNG", Some("1x1".into())).unwrap();
        assert_eq!(side.bytes, 4);
        assert_eq!(fs::read(&path).unwrap(), b"\x89PNG");
        assert_eq!(side.to_string(), format!("4 (1x1) {}", path.display()));

        let buffered = write_side_file(OutputTarget::Buffer, b"abc", None).unwrap();
        assert_eq!(buffered.contents.unwrap(), b"abc");
    }

    #[test]
    fn test_status_line() {
        let status = ExportStatus {
            driver: "OBJ",
            bytes: 120,
            target: OutputTarget::file("a.obj"),
            side_files: vec![
                SideFile {
                    bytes: 30,
                    target: OutputTarget::file("a.mtl"),
                    detail: None,
                    contents: None,
                },
                SideFile {
                    bytes: 99,
                    target: OutputTarget::file("a_Surface1.png"),
                    detail: Some("2x1".into()),
                    contents: None,
                },
            ],
            contents: None,
        };
        assert_eq!(status.to_string(), "OK 120 OBJ a.obj, 30 a.mtl, 99 (2x1) a_Surface1.png");
    }
}
