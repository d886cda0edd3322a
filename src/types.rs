//! Public and internal types for the dicomscout API and pipeline.

use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::decoder::Dataset;

/// A file that passed signature validation: open, positioned at offset 0.
///
/// Owned by exactly one stage at a time; moving it through a channel transfers the handle.
#[derive(Debug)]
pub struct ValidatedFile {
    pub path: PathBuf,
    pub handle: File,
}

/// Handle lifecycle of a [`DecodedRecord`]: `Open -> Closed -> Open (reopened by path)`.
#[derive(Debug, Default)]
pub enum HandleState {
    Open(File),
    #[default]
    Closed,
}

impl HandleState {
    pub fn is_open(&self) -> bool {
        matches!(self, HandleState::Open(_))
    }
}

/// A decoded file plus its still-open source handle.
///
/// The consumer owns the record and should call [`DecodedRecord::close`] once it no longer needs
/// the bytes; dropping the record closes the handle as well.
#[derive(Debug)]
pub struct DecodedRecord {
    pub path: PathBuf,
    pub dataset: Dataset,
    handle: HandleState,
}

impl DecodedRecord {
    pub fn new(path: PathBuf, dataset: Dataset, handle: File) -> Self {
        Self {
            path,
            dataset,
            handle: HandleState::Open(handle),
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    pub fn state(&self) -> &HandleState {
        &self.handle
    }

    /// Borrow the source handle, reopening it by path if it was released earlier.
    pub fn handle(&mut self) -> io::Result<&mut File> {
        if let HandleState::Closed = self.handle {
            log::debug!("reopening {}", self.path.display());
            self.handle = HandleState::Open(File::open(&self.path)?);
        }
        match &mut self.handle {
            HandleState::Open(file) => Ok(file),
            HandleState::Closed => unreachable!("handle reopened above"),
        }
    }

    /// Release the source handle. Idempotent.
    pub fn close(&mut self) {
        self.handle = HandleState::Closed;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Display for DecodedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DecodedRecord{{path: {}, dataset: {} elements}}",
            self.path.display(),
            self.dataset.len()
        )
    }
}

/// How results leave the pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Print each record as it is decoded.
    #[default]
    Stream,
    /// Collect everything, then print records and one combined failure.
    Aggregate,
    /// Feed a timer-driven event loop that renders a file tree.
    Tree,
}

/// Lib-only options for the pipeline entry points.
#[derive(Clone, Debug)]
pub struct ScanOpts {
    /// Validator workers. `None` or 0 → default (8).
    pub concurrency: Option<usize>,
    /// Decode workers. `None` or 0 → same as `concurrency`.
    pub parse_concurrency: Option<usize>,
    /// Follow symbolic links while walking.
    pub follow_links: bool,
    /// Use the parallel walker (jwalk) instead of the serial one (walkdir).
    pub parallel_walk: bool,
    /// Exclude patterns (glob syntax, e.g. `*.txt`, `scratch`).
    pub exclude: Vec<String>,
    /// Skip the bulk pixel payload while decoding.
    pub skip_pixel_data: bool,
}

impl Default for ScanOpts {
    fn default() -> Self {
        Self {
            concurrency: None,
            parse_concurrency: None,
            follow_links: false,
            parallel_walk: false,
            exclude: Vec::new(),
            skip_pixel_data: true,
        }
    }
}

impl From<&Opts> for ScanOpts {
    fn from(o: &Opts) -> Self {
        ScanOpts {
            concurrency: o.concurrency,
            parse_concurrency: o.parse_concurrency,
            follow_links: o.follow_links,
            parallel_walk: o.parallel_walk,
            exclude: o.exclude.clone(),
            skip_pixel_data: !o.with_pixel_data,
        }
    }
}

/// Full options (CLI). Use [`ScanOpts`] for lib.
#[derive(Clone, Debug, Default)]
pub struct Opts {
    pub concurrency: Option<usize>,
    pub parse_concurrency: Option<usize>,
    pub follow_links: bool,
    pub parallel_walk: bool,
    pub exclude: Vec<String>,
    /// Decode pixel data too (slower, more memory).
    pub with_pixel_data: bool,
    pub mode: OutputMode,
    /// Poll period for tree mode, milliseconds.
    pub batch_delay_ms: Option<u64>,
    /// Print a JSON summary (aggregate mode).
    pub json: bool,
    pub verbose: bool,
}

/// Per-record line in the JSON summary.
#[derive(Debug, Serialize)]
pub struct RecordSummary {
    pub path: PathBuf,
    pub elements: usize,
    pub patient_id: Option<String>,
    pub modality: Option<String>,
    pub sop_instance_uid: Option<String>,
}

/// Aggregate-mode JSON summary.
#[derive(Debug, Serialize)]
pub struct ScanSummary {
    pub root: PathBuf,
    pub parsed: usize,
    pub errors: Vec<String>,
    pub records: Vec<RecordSummary>,
}
