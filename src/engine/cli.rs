//! CLI command handler: stream (default), aggregate, or tree mode over one directory.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::bridge::{App, DiscoveryModel, Msg, Program};
use crate::decoder::{DicomDecoder, RecordDecoder, Tag};
use crate::engine::arg_parser::Cli;
use crate::engine::progress::{StreamTally, create_counter};
use crate::pipeline::{CancelToken, scan_streaming_with};
use crate::utils::config::{Defaults, ProgressConsts};
use crate::utils::scout_toml::{apply_file_to_opts, load_scout_toml};
use crate::utils::setup_logging;
use crate::{DecodedRecord, Opts, OutputMode, RecordSummary, ScanOpts, ScanSummary};

/// Overwrite opts from CLI flags that were given.
fn apply_cli_to_opts(cli: &Cli, opts: &mut Opts) {
    if cli.concurrency.is_some() {
        opts.concurrency = cli.concurrency;
    }
    if cli.parse_concurrency.is_some() {
        opts.parse_concurrency = cli.parse_concurrency;
    }
    if cli.batch_delay_ms.is_some() {
        opts.batch_delay_ms = cli.batch_delay_ms;
    }
    if let Some(mode) = cli.mode {
        opts.mode = mode;
    }
    if let Some(v) = cli.follow_links {
        opts.follow_links = v;
    }
    if let Some(v) = cli.parallel_walk {
        opts.parallel_walk = v;
    }
    if let Some(v) = cli.with_pixel_data {
        opts.with_pixel_data = v;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    if !cli.exclude.is_empty() {
        opts.exclude = cli.exclude.clone();
    }
    opts.json |= cli.json;
}

/// Built-in defaults, then `.dicomscout.toml` in DIR, then CLI flags. Initializes logging.
fn setup_opts(cli: &Cli) -> Opts {
    let mut opts = Opts::default();
    let file = load_scout_toml(&cli.dir);
    if let Ok(Some(file)) = &file {
        apply_file_to_opts(file, &mut opts);
    }
    apply_cli_to_opts(cli, &mut opts);
    setup_logging(opts.verbose);
    if let Err(e) = file {
        warn!("ignoring settings file: {:#}", e);
    }
    opts
}

fn install_ctrlc<F>(handler: F) -> Result<()>
where
    F: FnMut() + Send + 'static,
{
    ctrlc::set_handler(handler).context("set Ctrl+C handler")
}

/// Run the scan in the mode selected by flags/settings.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli);
    if !cli.dir.is_dir() {
        anyhow::bail!("not a directory: {}", cli.dir.display());
    }
    debug!("{} CONFIG:{:#?}", env!("CARGO_PKG_NAME").to_uppercase(), opts);

    let decoder: Arc<dyn RecordDecoder> = Arc::new(DicomDecoder::new());
    match opts.mode {
        OutputMode::Stream => run_stream(&cli.dir, &opts, decoder),
        OutputMode::Aggregate => run_aggregate(&cli.dir, &opts, decoder),
        OutputMode::Tree => run_tree(&cli.dir, &opts, decoder),
    }
}

/// Print each record as it arrives and release its handle right away.
fn run_stream(dir: &Path, opts: &Opts, decoder: Arc<dyn RecordDecoder>) -> Result<()> {
    let cancel = CancelToken::new();
    let cancel_handler = cancel.clone();
    install_ctrlc(move || cancel_handler.cancel())?;

    let handles = scan_streaming_with(dir, &ScanOpts::from(opts), decoder, cancel.clone());

    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    let bar = opts.verbose.then(|| create_counter("Parsing"));
    let tally = std::cell::RefCell::new(StreamTally::new(bar, ProgressConsts::UPDATE_BATCH_SIZE));

    handles.drain(
        |mut record| {
            if let Err(e) = writeln!(
                writer,
                "Parsed {}: {} elements",
                record.path.display(),
                record.dataset.len()
            ) {
                warn!("write failed: {}", e);
            }
            record.close();
            tally.borrow_mut().record();
        },
        |err| {
            warn!("{}", err);
            tally.borrow_mut().error();
        },
    );

    let mut tally = tally.into_inner();
    tally.flush();
    writer.flush()?;
    drop(writer);
    println!(
        "\nProcessing complete. Parsed {} files with {} errors.",
        tally.parsed, tally.errors
    );
    if cancel.is_cancelled() {
        anyhow::bail!("scan cancelled by user");
    }
    Ok(())
}

fn summarize(record: &DecodedRecord) -> RecordSummary {
    RecordSummary {
        path: record.path.clone(),
        elements: record.dataset.len(),
        patient_id: record.dataset.string(Tag::PATIENT_ID),
        modality: record.dataset.string(Tag::MODALITY),
        sop_instance_uid: record.dataset.string(Tag::SOP_INSTANCE_UID),
    }
}

/// Collect everything first, then print records and one combined failure.
fn run_aggregate(dir: &Path, opts: &Opts, decoder: Arc<dyn RecordDecoder>) -> Result<()> {
    let cancel = CancelToken::new();
    let cancel_handler = cancel.clone();
    install_ctrlc(move || cancel_handler.cancel())?;

    let collected = scan_streaming_with(dir, &ScanOpts::from(opts), decoder, cancel.clone()).collect();
    let mut records = collected.items;
    for record in records.iter_mut() {
        record.close();
    }

    if opts.json {
        let summary = ScanSummary {
            root: dir.to_path_buf(),
            parsed: records.len(),
            errors: collected
                .failure
                .as_ref()
                .map(|f| f.errors().iter().map(|e| e.to_string()).collect())
                .unwrap_or_default(),
            records: records.iter().map(summarize).collect(),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("serialize summary")?
        );
    } else {
        let stdout = io::stdout();
        let mut writer = BufWriter::new(stdout.lock());
        for record in &records {
            writeln!(
                writer,
                "Parsed {}: {} elements",
                record.path.display(),
                record.dataset.len()
            )?;
        }
        writer.flush()?;
    }

    if cancel.is_cancelled() {
        anyhow::bail!("scan cancelled by user");
    }
    match collected.failure {
        Some(failure) => Err(anyhow::Error::new(failure)
            .context(format!("{} files parsed before errors", records.len()))),
        None => Ok(()),
    }
}

/// Drive the timer-polled tree app until the pipeline reports finished.
fn run_tree(dir: &Path, opts: &Opts, decoder: Arc<dyn RecordDecoder>) -> Result<()> {
    let delay = opts
        .batch_delay_ms
        .map(Duration::from_millis)
        .unwrap_or(Defaults::BATCH_DELAY);
    let model = DiscoveryModel::new(dir, delay, ScanOpts::from(opts), decoder);
    let cancel = model.cancel_token();

    let program = Program::new(App::new(model, io::stdout()));
    let tx = program.sender();
    install_ctrlc(move || {
        cancel.cancel();
        let _ = tx.send(Msg::Quit);
    })?;

    let app = program.run();
    debug!(
        "tree: {} nodes, {} parsed, {} errors",
        app.tree().len(),
        app.parsed(),
        app.errors()
    );
    if !app.discovery().finished() {
        anyhow::bail!("scan cancelled by user");
    }
    Ok(())
}
