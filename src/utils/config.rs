//! Application configuration constants.
//! Tuning, signature layout and defaults in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Per-directory settings file, e.g. `.dicomscout.toml`.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Names skipped by the walk regardless of user excludes.
    pub fn default_exclude_patterns(&self) -> Vec<String> {
        vec![self.config_filename().to_string()]
    }
}

// ---- Signature ----

/// Layout of the DICOM file signature: 128-byte preamble followed by a 4-byte magic.
pub struct Signature;

impl Signature {
    pub const PREAMBLE_LEN: usize = 128;
    pub const MAGIC: &'static [u8; 4] = b"DICM";
    /// Bytes that must be readable before a file can be classified.
    pub const HEADER_LEN: usize = Self::PREAMBLE_LEN + Self::MAGIC.len();
}

// ---- Worker threads / channels ----

/// Defaults for worker pools, channel sizing and the consumer bridge.
pub struct Defaults;

impl Defaults {
    /// Workers per stage when the caller passes 0 or nothing.
    pub const CONCURRENCY: usize = 8;
    /// Discovery path/result/error channel capacity per worker.
    pub const DISCOVERY_CHANNEL_FACTOR: usize = 2;
    /// Parse result/error channel capacity per worker.
    pub const PARSE_CHANNEL_FACTOR: usize = 4;
    /// Period between accumulator polls in the cooperative loop.
    pub const BATCH_DELAY: Duration = Duration::from_millis(100);
    /// Lower bound for the poll period (a zero period would spin the loop).
    pub const MIN_BATCH_DELAY: Duration = Duration::from_millis(1);
}

/// Resolve a requested worker count: 0 or `None` falls back to [`Defaults::CONCURRENCY`].
pub fn effective_concurrency(requested: Option<usize>) -> usize {
    match requested {
        Some(n) if n > 0 => n,
        _ => Defaults::CONCURRENCY,
    }
}

// ---- Progress ----

/// Streaming-mode progress counter tuning.
pub struct ProgressConsts;

impl ProgressConsts {
    /// Records between counter refreshes (reduce terminal churn).
    pub const UPDATE_BATCH_SIZE: usize = 16;
}
