//! File kinds and conversion direction, decided by extension.

use std::path::Path;

use anyhow::{bail, Result};
use rgss_core::Dialect;

/// What a path holds, judged by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// A binary data file of the given engine generation.
    Data(Dialect),
    /// A YAML document (`.yaml`, `.yml` or no extension).
    Document,
}

impl FileKind {
    pub fn of(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            None => Some(FileKind::Document),
            Some("yaml" | "yml") => Some(FileKind::Document),
            Some(ext) => Dialect::from_extension(ext).map(FileKind::Data),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Binary → YAML; the source extension names the dialect.
    ToDocument(Dialect),
    /// YAML → binary; the destination extension names the dialect.
    ToData(Dialect),
}

impl Direction {
    pub fn between(src: &Path, dest: &Path) -> Result<Self> {
        match (FileKind::of(src), FileKind::of(dest)) {
            (Some(FileKind::Data(dialect)), Some(FileKind::Document)) => {
                Ok(Direction::ToDocument(dialect))
            }
            (Some(FileKind::Document), Some(FileKind::Data(dialect))) => {
                Ok(Direction::ToData(dialect))
            }
            _ => bail!(
                "unsupported conversion: {} -> {}",
                src.display(),
                dest.display()
            ),
        }
    }

    /// Dialect implied by the data-side file.
    pub fn dialect(self) -> Dialect {
        match self {
            Direction::ToDocument(d) | Direction::ToData(d) => d,
        }
    }
}
