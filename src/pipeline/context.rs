//! Pipeline context and tuning: shared data passed into the walk thread, stage outputs, and the
//! cancellation flag checked by every thread.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crate::ScanOpts;
use crate::errors::ScanError;
use crate::utils::config::{Defaults, PackagePaths, effective_concurrency};
use crate::utils::fd_limit::cap_workers;

/// Cooperative cancellation shared by the walk and every worker. Checked before each send.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Worker counts and channel capacities for both stages.
#[derive(Clone, Debug)]
pub struct PipelineTuning {
    pub discovery_workers: usize,
    pub parse_workers: usize,
    /// Capacity for the path, validated-file and discovery error channels.
    pub discovery_channel_cap: usize,
    /// Capacity for the record and parse error channels.
    pub parse_channel_cap: usize,
}

impl PipelineTuning {
    /// Resolve defaults (0/None → 8), mirror discovery into parse when unset, cap by FD budget.
    pub fn from_opts(opts: &ScanOpts) -> Self {
        let discovery_workers = cap_workers(effective_concurrency(opts.concurrency));
        let parse_workers = cap_workers(effective_concurrency(
            opts.parse_concurrency.or(Some(discovery_workers)),
        ));
        Self::with_workers(discovery_workers, parse_workers)
    }

    pub fn with_workers(discovery_workers: usize, parse_workers: usize) -> Self {
        let discovery_workers = discovery_workers.max(1);
        let parse_workers = parse_workers.max(1);
        Self {
            discovery_workers,
            parse_workers,
            discovery_channel_cap: discovery_workers * Defaults::DISCOVERY_CHANNEL_FACTOR,
            parse_channel_cap: parse_workers * Defaults::PARSE_CHANNEL_FACTOR,
        }
    }
}

/// Shared context for the walk thread: root, filters and cancellation.
pub struct PipelineContext {
    pub root: PathBuf,
    pub exclude: Vec<String>,
    pub follow_links: bool,
    pub parallel_walk: bool,
    pub cancel: CancelToken,
}

impl PipelineContext {
    pub fn new(root: &Path, opts: &ScanOpts, cancel: CancelToken) -> Self {
        let mut exclude = PackagePaths::get().default_exclude_patterns();
        exclude.extend(opts.exclude.iter().cloned());
        Self {
            root: root.to_path_buf(),
            exclude,
            follow_links: opts.follow_links,
            parallel_walk: opts.parallel_walk,
            cancel,
        }
    }
}

/// Output of one stage: a result stream and an error stream, plus the barrier thread that closes
/// them (errors first) once every worker of the stage has exited.
pub struct StageOutput<T> {
    pub items: Receiver<T>,
    pub errors: Receiver<ScanError>,
    pub barrier: JoinHandle<()>,
}

/// Handles for a full discovery + parse run in streaming form.
pub struct ScanHandles {
    pub records: Receiver<crate::DecodedRecord>,
    pub parse_errors: Receiver<ScanError>,
    pub discovery_errors: Receiver<ScanError>,
    pub barriers: Vec<JoinHandle<()>>,
    pub cancel: CancelToken,
}

/// Channels for one stage: workers get clones of the senders; the barrier keeps the originals.
pub struct StageChannels<T> {
    pub item_tx: Sender<T>,
    pub item_rx: Receiver<T>,
    pub err_tx: Sender<ScanError>,
    pub err_rx: Receiver<ScanError>,
}

pub fn create_stage_channels<T>(cap: usize) -> StageChannels<T> {
    let (item_tx, item_rx) = bounded::<T>(cap);
    let (err_tx, err_rx) = bounded::<ScanError>(cap);
    StageChannels {
        item_tx,
        item_rx,
        err_tx,
        err_rx,
    }
}

/// Send unless cancelled. Returns false when the caller should stop (cancelled or receiver gone).
pub fn send_unless_cancelled<T>(tx: &Sender<T>, value: T, cancel: &CancelToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    tx.send(value).is_ok()
}
