//! Parsing stage: validated files → decode workers → decoded records with handles still open.

use crossbeam_channel::{Receiver, Sender};
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};
use std::thread::{self, JoinHandle};

use crate::decoder::{DecodeOptions, Dataset, RecordDecoder};
use crate::errors::ScanError;
use crate::{DecodedRecord, ScanOpts, ValidatedFile};

use super::barrier::spawn_barrier;
use super::context::{
    CancelToken, PipelineTuning, StageOutput, create_stage_channels, send_unless_cancelled,
};

/// Render a panic payload the way `std` does for `&str`/`String` payloads.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

thread_local! {
    static IN_DECODER: Cell<bool> = const { Cell::new(false) };
}

static QUIET_HOOK: Once = Once::new();

/// Chain a panic hook that stays silent for panics raised inside [`decode_isolated`] (they are
/// reported as errors instead) and defers to the previous hook everywhere else.
fn install_quiet_hook() {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if IN_DECODER.with(Cell::get) {
                log::trace!("decoder panic: {}", info);
                return;
            }
            previous(info);
        }));
    });
}

/// Run the decoder on `file` with panics converted into [`ScanError::DecoderPanic`].
pub fn decode_isolated(
    decoder: &dyn RecordDecoder,
    file: &mut ValidatedFile,
    opts: &DecodeOptions,
) -> Result<Dataset, ScanError> {
    install_quiet_hook();
    IN_DECODER.with(|flag| flag.set(true));
    let result = panic::catch_unwind(AssertUnwindSafe(|| decoder.decode(&mut file.handle, opts)));
    IN_DECODER.with(|flag| flag.set(false));
    match result {
        Ok(Ok(dataset)) => Ok(dataset),
        Ok(Err(source)) => Err(ScanError::Decode {
            path: file.path.clone(),
            source,
        }),
        Err(payload) => Err(ScanError::DecoderPanic {
            path: file.path.clone(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// Single decode worker. A failed file's handle is dropped before the error is sent.
fn decode_worker_loop(
    file_rx: Receiver<ValidatedFile>,
    record_tx: Sender<DecodedRecord>,
    err_tx: Sender<ScanError>,
    decoder: Arc<dyn RecordDecoder>,
    opts: DecodeOptions,
    cancel: CancelToken,
) {
    while let Ok(mut file) = file_rx.recv() {
        if cancel.is_cancelled() {
            break;
        }
        let sent = match decode_isolated(decoder.as_ref(), &mut file, &opts) {
            Ok(dataset) => {
                let ValidatedFile { path, handle } = file;
                send_unless_cancelled(&record_tx, DecodedRecord::new(path, dataset, handle), &cancel)
            }
            Err(err) => {
                drop(file);
                send_unless_cancelled(&err_tx, err, &cancel)
            }
        };
        if !sent {
            break;
        }
    }
}

/// Spawn decode workers sharing `decoder`.
pub fn spawn_decode_workers(
    file_rx: Receiver<ValidatedFile>,
    record_tx: &Sender<DecodedRecord>,
    err_tx: &Sender<ScanError>,
    decoder: &Arc<dyn RecordDecoder>,
    opts: DecodeOptions,
    cancel: &CancelToken,
    num_threads: usize,
) -> Vec<JoinHandle<()>> {
    (0..num_threads)
        .map(|_| {
            let file_rx = file_rx.clone();
            let record_tx = record_tx.clone();
            let err_tx = err_tx.clone();
            let decoder = Arc::clone(decoder);
            let cancel = cancel.clone();
            thread::spawn(move || {
                decode_worker_loop(file_rx, record_tx, err_tx, decoder, opts, cancel)
            })
        })
        .collect()
}

/// Start the parsing stage over `files` with explicit tuning and cancellation.
pub fn parse_with(
    files: Receiver<ValidatedFile>,
    decoder: Arc<dyn RecordDecoder>,
    opts: &ScanOpts,
    tuning: &PipelineTuning,
    cancel: &CancelToken,
) -> StageOutput<DecodedRecord> {
    let channels = create_stage_channels::<DecodedRecord>(tuning.parse_channel_cap);
    let decode_opts = DecodeOptions {
        skip_pixel_data: opts.skip_pixel_data,
    };

    let workers = spawn_decode_workers(
        files,
        &channels.item_tx,
        &channels.err_tx,
        &decoder,
        decode_opts,
        cancel,
        tuning.parse_workers,
    );
    log::debug!(
        "parse: {} decoders, channel cap {}",
        tuning.parse_workers,
        tuning.parse_channel_cap
    );

    let barrier = spawn_barrier("parse", workers, None, channels.item_tx, channels.err_tx);

    StageOutput {
        items: channels.item_rx,
        errors: channels.err_rx,
        barrier,
    }
}

/// Streaming parse: decoded records (handles open) and real errors as they are produced.
pub fn parse(
    files: Receiver<ValidatedFile>,
    decoder: Arc<dyn RecordDecoder>,
    opts: &ScanOpts,
) -> StageOutput<DecodedRecord> {
    parse_with(
        files,
        decoder,
        opts,
        &PipelineTuning::from_opts(opts),
        &CancelToken::new(),
    )
}
