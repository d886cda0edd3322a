//! Result delivery: streaming drain and aggregate collection over stage outputs.

use crossbeam_channel::{never, select};
use std::path::Path;
use std::sync::Arc;

use crate::decoder::RecordDecoder;
use crate::errors::{MultiError, ScanError};
use crate::{DecodedRecord, ScanOpts};

use super::context::{CancelToken, PipelineTuning, ScanHandles, StageOutput};
use super::discovery::discover_with;
use super::parse::parse_with;

/// Aggregate result: everything that succeeded plus one composite failure, or `None`.
#[derive(Debug)]
pub struct Collected<T> {
    pub items: Vec<T>,
    pub failure: Option<MultiError>,
}

impl<T> Collected<T> {
    /// `Err` when at least one real error was collected; the successful items are dropped.
    pub fn into_result(self) -> Result<Vec<T>, MultiError> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(self.items),
        }
    }
}

fn join_barrier(barrier: std::thread::JoinHandle<()>) {
    if barrier.join().is_err() {
        log::error!("stage barrier panicked");
    }
}

/// Drain one stage until both of its channels are closed, calling back per item and per error.
pub fn drain_streaming<T, F, E>(output: StageOutput<T>, mut on_item: F, mut on_error: E)
where
    F: FnMut(T),
    E: FnMut(ScanError),
{
    let never_items = never::<T>();
    let never_errors = never::<ScanError>();
    let mut items_open = true;
    let mut errors_open = true;

    while items_open || errors_open {
        select! {
            recv(if items_open { &output.items } else { &never_items }) -> msg => match msg {
                Ok(item) => on_item(item),
                Err(_) => items_open = false,
            },
            recv(if errors_open { &output.errors } else { &never_errors }) -> msg => match msg {
                Ok(err) => on_error(err),
                Err(_) => errors_open = false,
            },
        }
    }
    join_barrier(output.barrier);
}

/// Aggregate one stage: receive until the result channel closes, then take whatever is still
/// buffered on the (already closed) error channel. Errors keep their completion order.
pub fn collect_all<T>(output: StageOutput<T>) -> Collected<T> {
    let mut items = Vec::new();
    let mut failure = MultiError::new();
    let never_errors = never::<ScanError>();
    let mut errors_open = true;

    loop {
        select! {
            recv(output.items) -> msg => match msg {
                Ok(item) => items.push(item),
                Err(_) => break,
            },
            recv(if errors_open { &output.errors } else { &never_errors }) -> msg => match msg {
                Ok(err) => failure.add(err),
                Err(_) => errors_open = false,
            },
        }
    }
    failure.extend(output.errors.iter());
    join_barrier(output.barrier);

    log::debug!(
        "collected {} items, {} errors",
        items.len(),
        failure.len()
    );
    Collected {
        items,
        failure: failure.into_option(),
    }
}

/// Wire discovery into parsing and return the streaming handles.
pub fn scan_streaming_with(
    root: &Path,
    opts: &ScanOpts,
    decoder: Arc<dyn RecordDecoder>,
    cancel: CancelToken,
) -> ScanHandles {
    let tuning = PipelineTuning::from_opts(opts);
    let discovery = discover_with(root, opts, &tuning, &cancel);
    let parsed = parse_with(discovery.items, decoder, opts, &tuning, &cancel);
    ScanHandles {
        records: parsed.items,
        parse_errors: parsed.errors,
        discovery_errors: discovery.errors,
        barriers: vec![discovery.barrier, parsed.barrier],
        cancel,
    }
}

/// Streaming scan with a fresh cancellation token.
pub fn scan_streaming(root: &Path, opts: &ScanOpts, decoder: Arc<dyn RecordDecoder>) -> ScanHandles {
    scan_streaming_with(root, opts, decoder, CancelToken::new())
}

impl ScanHandles {
    /// Drain records and both error streams until all three are closed.
    pub fn drain<F, E>(self, mut on_record: F, mut on_error: E)
    where
        F: FnMut(DecodedRecord),
        E: FnMut(ScanError),
    {
        let never_records = never::<DecodedRecord>();
        let never_errors = never::<ScanError>();
        let mut records_open = true;
        let mut parse_open = true;
        let mut discovery_open = true;

        while records_open || parse_open || discovery_open {
            select! {
                recv(if records_open { &self.records } else { &never_records }) -> msg => match msg {
                    Ok(record) => on_record(record),
                    Err(_) => records_open = false,
                },
                recv(if parse_open { &self.parse_errors } else { &never_errors }) -> msg => match msg {
                    Ok(err) => on_error(err),
                    Err(_) => parse_open = false,
                },
                recv(if discovery_open { &self.discovery_errors } else { &never_errors }) -> msg => match msg {
                    Ok(err) => on_error(err),
                    Err(_) => discovery_open = false,
                },
            }
        }
        for barrier in self.barriers {
            join_barrier(barrier);
        }
    }

    /// Aggregate both stages into one list of records and one composite failure.
    pub fn collect(self) -> Collected<DecodedRecord> {
        let mut records = Vec::new();
        let mut failure = MultiError::new();
        let never_errors = never::<ScanError>();
        let mut parse_open = true;
        let mut discovery_open = true;

        loop {
            select! {
                recv(self.records) -> msg => match msg {
                    Ok(record) => records.push(record),
                    Err(_) => break,
                },
                recv(if parse_open { &self.parse_errors } else { &never_errors }) -> msg => match msg {
                    Ok(err) => failure.add(err),
                    Err(_) => parse_open = false,
                },
                recv(if discovery_open { &self.discovery_errors } else { &never_errors }) -> msg => match msg {
                    Ok(err) => failure.add(err),
                    Err(_) => discovery_open = false,
                },
            }
        }
        // Both error streams closed before the record stream; only buffered leftovers remain.
        failure.extend(self.discovery_errors.iter());
        failure.extend(self.parse_errors.iter());
        for barrier in self.barriers {
            join_barrier(barrier);
        }
        Collected {
            items: records,
            failure: failure.into_option(),
        }
    }
}

/// Aggregate scan: discover + decode everything under `root`.
pub fn scan_all(
    root: &Path,
    opts: &ScanOpts,
    decoder: Arc<dyn RecordDecoder>,
) -> Collected<DecodedRecord> {
    scan_streaming(root, opts, decoder).collect()
}
