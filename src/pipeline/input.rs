//! Input resolution: normalise an uploaded file to a local PDF path.
//!
//! pdfium opens files by path. Uploads that arrive as bytes are spooled to a
//! [`NamedTempFile`] owned by the returned [`ResolvedInput`], so the file is
//! removed as soon as the read finishes, whether it succeeded or not. We
//! validate the PDF magic bytes (`%PDF`) before returning so callers get a
//! meaningful error rather than a pdfium failure.

use crate::error::ExtractError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// An uploaded PDF: a file on disk or bytes held in memory.
#[derive(Debug, Clone)]
pub enum Upload {
    Path(PathBuf),
    Bytes { name: String, data: Vec<u8> },
}

impl Upload {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Upload::Path(path.into())
    }

    pub fn from_bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Upload::Bytes {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Display name: the file name for paths, the given name for bytes.
    pub fn name(&self) -> String {
        match self {
            Upload::Path(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string()),
            Upload::Bytes { name, .. } => name.clone(),
        }
    }
}

/// The resolved input — either a local path or a spooled temp file.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was in memory; the temp file lives as long as this value.
    Spooled(NamedTempFile),
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Spooled(tmp) => tmp.path(),
        }
    }
}

/// Resolve an upload to a readable PDF on disk.
pub fn resolve_input(upload: &Upload) -> Result<ResolvedInput, ExtractError> {
    match upload {
        Upload::Path(path) => resolve_local(path),
        Upload::Bytes { name, data } => spool_bytes(name, data),
    }
}

/// Resolve a local file path, validating existence and PDF magic bytes.
fn resolve_local(path: &Path) -> Result<ResolvedInput, ExtractError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(ExtractError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != PDF_MAGIC {
                return Err(ExtractError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ExtractError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Write in-memory bytes to a temp file after checking the magic bytes.
fn spool_bytes(name: &str, data: &[u8]) -> Result<ResolvedInput, ExtractError> {
    if data.len() >= 4 && &data[..4] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&data[..4]);
        return Err(ExtractError::NotAPdf {
            path: PathBuf::from(name),
            magic,
        });
    }

    let mut tmp = NamedTempFile::new()
        .map_err(|e| ExtractError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(data)
        .map_err(|e| ExtractError::Internal(format!("tempfile write: {e}")))?;

    debug!("Spooled '{}' ({} bytes) to {}", name, data.len(), tmp.path().display());
    Ok(ResolvedInput::Spooled(tmp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_reported() {
        let upload = Upload::from_path("/definitely/not/a/real/file.pdf");
        let err = resolve_input(&upload).err().expect("should fail");
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_file_is_rejected() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"hello world").unwrap();
        let err = resolve_input(&Upload::from_path(f.path()))
            .err()
            .expect("should fail");
        match err {
            ExtractError::NotAPdf { magic, .. } => assert_eq!(&magic, b"hell"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn pdf_bytes_are_spooled_and_removed_on_drop() {
        let upload = Upload::from_bytes("report.pdf", b"%PDF-1.7\n%%EOF".to_vec());
        let resolved = resolve_input(&upload).unwrap();
        let path = resolved.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7\n%%EOF");
        drop(resolved);
        assert!(!path.exists());
    }

    #[test]
    fn non_pdf_bytes_are_rejected_without_touching_disk() {
        let upload = Upload::from_bytes("notes.txt", b"plain text".to_vec());
        let err = resolve_input(&upload).err().expect("should fail");
        assert!(matches!(err, ExtractError::NotAPdf { .. }));
    }

    #[test]
    fn upload_names() {
        assert_eq!(Upload::from_path("/tmp/a/research.pdf").name(), "research.pdf");
        assert_eq!(Upload::from_bytes("b.pdf", vec![]).name(), "b.pdf");
    }
}
