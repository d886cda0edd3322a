//! Discovery model: starts the pipeline, then polls the accumulator on a fixed timer.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::ScanOpts;
use crate::decoder::RecordDecoder;
use crate::pipeline::{CancelToken, scan_streaming_with};
use crate::utils::config::Defaults;

use super::accumulator::BatchAccumulator;
use super::program::{Cmd, Model, Msg};

pub struct DiscoveryModel {
    root: PathBuf,
    batch_delay: Duration,
    opts: ScanOpts,
    decoder: Arc<dyn RecordDecoder>,
    cancel: CancelToken,
    accumulator: Arc<BatchAccumulator>,
    collectors: Vec<JoinHandle<()>>,
}

impl DiscoveryModel {
    pub fn new(
        root: &Path,
        batch_delay: Duration,
        opts: ScanOpts,
        decoder: Arc<dyn RecordDecoder>,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            batch_delay: batch_delay.max(Defaults::MIN_BATCH_DELAY),
            opts,
            decoder,
            cancel: CancelToken::new(),
            accumulator: Arc::new(BatchAccumulator::new()),
            collectors: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn batch_delay(&self) -> Duration {
        self.batch_delay
    }

    pub fn accumulator(&self) -> &Arc<BatchAccumulator> {
        &self.accumulator
    }

    /// Token that stops the walk and every worker; hand it to a signal handler.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn finished(&self) -> bool {
        self.accumulator.is_finished()
    }

    /// Start discovery + parsing and the collectors. No-op when already running.
    pub fn start(&mut self) {
        if self.accumulator.in_progress() {
            return;
        }
        log::debug!("discovery model: scanning {}", self.root.display());
        let handles = scan_streaming_with(
            &self.root,
            &self.opts,
            Arc::clone(&self.decoder),
            self.cancel.clone(),
        );
        self.collectors = self.accumulator.spawn_collectors(handles);
    }

    fn tick(&self) -> Cmd {
        Cmd::Tick(self.batch_delay)
    }

    fn collect(&self) -> Cmd {
        let acc = Arc::clone(&self.accumulator);
        Cmd::Perform(Box::new(move || Msg::Batch(acc.take_batch())))
    }

    /// React to a message owned by a parent model.
    pub fn handle(&mut self, msg: &Msg) -> Cmd {
        match msg {
            Msg::Tick if !self.finished() => Cmd::batch(vec![self.tick(), self.collect()]),
            Msg::Quit => {
                self.cancel.cancel();
                Cmd::None
            }
            _ => Cmd::None,
        }
    }
}

impl Model for DiscoveryModel {
    fn init(&mut self) -> Cmd {
        self.start();
        self.tick()
    }

    fn update(&mut self, msg: Msg) -> Cmd {
        self.handle(&msg)
    }

    fn view(&self) -> String {
        String::new()
    }
}

impl Drop for DiscoveryModel {
    fn drop(&mut self) {
        if !self.finished() {
            self.cancel.cancel();
        }
        // Collectors exit once the cancelled stages close their channels.
        for h in self.collectors.drain(..) {
            let _ = h.join();
        }
    }
}
