//! Classified pipeline errors and the ordered composite failure used by aggregate mode.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

fn display_opt(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

/// Broad class of a [`ScanError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Expected for non-matching files in the tree; never surfaced.
    Ignorable,
    Io,
    Decode,
    Traversal,
}

/// Every failure the walk, the validator or a decode worker can produce.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("{}: file too small to be a valid DICOM ({read} bytes)", .path.display())]
    TooSmall { path: PathBuf, read: usize },

    #[error("{}: invalid magic number", .path.display())]
    BadSignature { path: PathBuf },

    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("{}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: crate::decoder::DecodeError,
    },

    #[error("{}: panic during DICOM parsing: {message}", .path.display())]
    DecoderPanic { path: PathBuf, message: String },

    #[error("walk error at {}: {message}", display_opt(.path))]
    Walk {
        path: Option<PathBuf>,
        message: String,
    },
}

impl ScanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScanError::TooSmall { .. } | ScanError::BadSignature { .. } => ErrorKind::Ignorable,
            ScanError::Io { .. } => ErrorKind::Io,
            ScanError::Decode { .. } | ScanError::DecoderPanic { .. } => ErrorKind::Decode,
            ScanError::Walk { .. } => ErrorKind::Traversal,
        }
    }

    pub fn is_ignorable(&self) -> bool {
        self.kind() == ErrorKind::Ignorable
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ScanError::TooSmall { path, .. }
            | ScanError::BadSignature { path }
            | ScanError::Io { path, .. }
            | ScanError::Decode { path, .. }
            | ScanError::DecoderPanic { path, .. } => Some(path),
            ScanError::Walk { path, .. } => path.as_ref(),
        }
    }
}

/// Ordered collection of real errors rendered as one failure.
///
/// Insertion order is preserved, so in aggregate mode the rendering lists errors in the order
/// workers completed them.
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<ScanError>,
}

impl MultiError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `err`. Ignorable errors are dropped.
    pub fn add(&mut self, err: ScanError) {
        if err.is_ignorable() {
            return;
        }
        self.errors.push(err);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ScanError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ScanError> {
        self.errors
    }

    /// `None` when nothing was collected.
    pub fn into_option(self) -> Option<MultiError> {
        self.has_errors().then_some(self)
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return Ok(());
        }
        f.write_str("Multiple errors occurred:")?;
        for err in &self.errors {
            write!(f, "\n- {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}

impl Extend<ScanError> for MultiError {
    fn extend<T: IntoIterator<Item = ScanError>>(&mut self, iter: T) {
        for err in iter {
            self.add(err);
        }
    }
}
