//! Batch accumulator: collector threads drain the pipeline into lock-guarded lists; the
//! cooperative consumer swaps them out on every poll.

use crossbeam_channel::{never, select};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::DecodedRecord;
use crate::errors::ScanError;
use crate::pipeline::ScanHandles;

const COLLECTORS: usize = 2;

/// What one poll hands to the consumer.
#[derive(Debug, Default)]
pub struct CollectedBatch {
    pub records: Vec<DecodedRecord>,
    pub errors: Vec<ScanError>,
}

impl CollectedBatch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.errors.is_empty()
    }
}

/// Shared buffer between the collector threads and the poll operation.
///
/// `finished` is only set by a poll that yields no records after both collectors have seen
/// their channels close, so a slow pipeline never looks finished.
#[derive(Debug, Default)]
pub struct BatchAccumulator {
    records: Mutex<Vec<DecodedRecord>>,
    errors: Mutex<Vec<ScanError>>,
    in_progress: AtomicBool,
    active_collectors: AtomicUsize,
    pipeline_complete: AtomicBool,
    finished: AtomicBool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BatchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_record(&self, record: DecodedRecord) {
        lock(&self.records).push(record);
    }

    /// Ignorable errors are dropped.
    pub fn push_error(&self, err: ScanError) {
        if err.is_ignorable() {
            return;
        }
        lock(&self.errors).push(err);
    }

    /// Mark the run started. Returns false if it already was.
    pub fn begin(&self, collectors: usize) -> bool {
        if self.in_progress.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.active_collectors.store(collectors, Ordering::Release);
        if collectors == 0 {
            self.pipeline_complete.store(true, Ordering::Release);
        }
        true
    }

    /// Called by each collector when its channels are closed and drained.
    pub fn collector_done(&self) {
        if self.active_collectors.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.pipeline_complete.store(true, Ordering::Release);
            log::debug!("accumulator: pipeline complete");
        }
    }

    /// Start the record collector and the error collector over `handles`.
    /// Returns no threads if collectors were already started for this accumulator.
    pub fn spawn_collectors(self: &Arc<Self>, handles: ScanHandles) -> Vec<JoinHandle<()>> {
        if !self.begin(COLLECTORS) {
            log::debug!("accumulator: collectors already running");
            return Vec::new();
        }
        let ScanHandles {
            records,
            parse_errors,
            discovery_errors,
            barriers,
            cancel: _,
        } = handles;

        let acc = Arc::clone(self);
        let record_collector = thread::spawn(move || {
            for record in records.iter() {
                acc.push_record(record);
            }
            for barrier in barriers {
                let _ = barrier.join();
            }
            acc.collector_done();
        });

        let acc = Arc::clone(self);
        let error_collector = thread::spawn(move || {
            let never_errors = never::<ScanError>();
            let mut parse_open = true;
            let mut discovery_open = true;
            while parse_open || discovery_open {
                select! {
                    recv(if parse_open { &parse_errors } else { &never_errors }) -> msg => match msg {
                        Ok(err) => acc.push_error(err),
                        Err(_) => parse_open = false,
                    },
                    recv(if discovery_open { &discovery_errors } else { &never_errors }) -> msg => match msg {
                        Ok(err) => acc.push_error(err),
                        Err(_) => discovery_open = false,
                    },
                }
            }
            acc.collector_done();
        });

        vec![record_collector, error_collector]
    }

    /// Swap both lists for empty ones and return what was buffered. Never blocks beyond the
    /// two short critical sections.
    pub fn take_batch(&self) -> CollectedBatch {
        // Read completion first: if it is already set, every push happened before the swap.
        let complete = self.pipeline_complete.load(Ordering::Acquire);
        let records = std::mem::take(&mut *lock(&self.records));
        let errors = std::mem::take(&mut *lock(&self.errors));
        if complete && records.is_empty() {
            self.finished.store(true, Ordering::Release);
        }
        CollectedBatch { records, errors }
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.pipeline_complete.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}
