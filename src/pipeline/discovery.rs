//! Discovery stage: walk thread → bounded path channel → validator workers → validated files.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crate::errors::ScanError;
use crate::{ScanOpts, ValidatedFile};

use super::barrier::spawn_barrier;
use super::context::{
    CancelToken, PipelineContext, PipelineTuning, StageOutput, create_stage_channels,
    send_unless_cancelled,
};
use super::delivery::{Collected, collect_all};
use super::validate::validate;
use super::walk::spawn_walk_thread;

/// Single validator worker: read paths from `path_rx`, validate, send the handle or the error.
/// Ignorable classifications are dropped here and never reach `err_tx`.
fn validator_worker_loop(
    path_rx: Receiver<PathBuf>,
    file_tx: Sender<ValidatedFile>,
    err_tx: Sender<ScanError>,
    cancel: CancelToken,
) {
    while let Ok(path) = path_rx.recv() {
        if cancel.is_cancelled() {
            break;
        }
        let sent = match validate(&path) {
            Ok(file) => send_unless_cancelled(&file_tx, file, &cancel),
            Err(err) if err.is_ignorable() => {
                log::trace!("skip {}", err);
                true
            }
            Err(err) => send_unless_cancelled(&err_tx, err, &cancel),
        };
        if !sent {
            break;
        }
    }
}

/// Spawn validator workers. Each gets its own clones of the channel ends.
pub fn spawn_validator_workers(
    path_rx: Receiver<PathBuf>,
    file_tx: &Sender<ValidatedFile>,
    err_tx: &Sender<ScanError>,
    cancel: &CancelToken,
    num_threads: usize,
) -> Vec<JoinHandle<()>> {
    (0..num_threads)
        .map(|_| {
            let path_rx = path_rx.clone();
            let file_tx = file_tx.clone();
            let err_tx = err_tx.clone();
            let cancel = cancel.clone();
            thread::spawn(move || validator_worker_loop(path_rx, file_tx, err_tx, cancel))
        })
        .collect()
}

/// Start discovery under `root` with explicit tuning and cancellation.
pub fn discover_with(
    root: &Path,
    opts: &ScanOpts,
    tuning: &PipelineTuning,
    cancel: &CancelToken,
) -> StageOutput<ValidatedFile> {
    let (path_tx, path_rx) = bounded::<PathBuf>(tuning.discovery_channel_cap);
    let channels = create_stage_channels::<ValidatedFile>(tuning.discovery_channel_cap);

    let ctx = PipelineContext::new(root, opts, cancel.clone());
    let walk_handle = spawn_walk_thread(path_tx, channels.err_tx.clone(), ctx);

    let workers = spawn_validator_workers(
        path_rx,
        &channels.item_tx,
        &channels.err_tx,
        cancel,
        tuning.discovery_workers,
    );
    log::debug!(
        "discovery: {} validators, channel cap {}",
        tuning.discovery_workers,
        tuning.discovery_channel_cap
    );

    let barrier = spawn_barrier(
        "discovery",
        workers,
        Some(walk_handle),
        channels.item_tx,
        channels.err_tx,
    );

    StageOutput {
        items: channels.item_rx,
        errors: channels.err_rx,
        barrier,
    }
}

/// Streaming discovery: validated files and real errors arrive as they are produced.
/// The caller must drain both receivers until closed.
pub fn discover(root: &Path, opts: &ScanOpts) -> StageOutput<ValidatedFile> {
    discover_with(
        root,
        opts,
        &PipelineTuning::from_opts(opts),
        &CancelToken::new(),
    )
}

/// Aggregate discovery: every validated file plus one composite failure (if any real error).
pub fn discover_all(root: &Path, opts: &ScanOpts) -> Collected<ValidatedFile> {
    collect_all(discover(root, opts))
}
