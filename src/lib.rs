//! dicomscout: bounded-concurrency DICOM discovery and decoding pipeline

pub mod bridge;
pub mod decoder;
pub mod engine;
pub mod errors;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use errors::{ErrorKind, MultiError, ScanError};
pub use pipeline::{
    CancelToken, Collected, ScanHandles, StageOutput, discover, discover_all, parse, scan_all,
    scan_streaming,
};

use log::debug;
use std::path::Path;
use std::sync::Arc;

use decoder::{DicomDecoder, RecordDecoder};

/// Result alias used by public dicomscout API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: find and decode every DICOM file under `root` with the built-in decoder.
///
/// - **`on_record: None`** → aggregate: returns all records, or the composite failure if any real
///   error occurred (records decoded before the failure are dropped with their handles).
/// - **`on_record: Some(f)`** → streaming: `f` gets each record as it is decoded and owns it;
///   real errors are still folded into the returned failure.
pub fn scan_dir<F>(
    root: &Path,
    opts: &ScanOpts,
    on_record: Option<F>,
) -> std::result::Result<Vec<DecodedRecord>, MultiError>
where
    F: FnMut(DecodedRecord),
{
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    let decoder: Arc<dyn RecordDecoder> = Arc::new(DicomDecoder::new());
    match on_record {
        None => scan_all(root, opts, decoder).into_result(),
        Some(f) => {
            let mut failure = MultiError::new();
            scan_streaming(root, opts, decoder).drain(f, |err| failure.add(err));
            match failure.into_option() {
                Some(failure) => Err(failure),
                None => Ok(Vec::new()),
            }
        }
    }
}
