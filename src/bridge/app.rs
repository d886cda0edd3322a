//! Tree app: the consumer side of the bridge. Prints new tree nodes as batches arrive.

use std::io::{self, Write};

use crate::engine::tools::path_relative_to;

use super::accumulator::CollectedBatch;
use super::discovery_model::DiscoveryModel;
use super::program::{Cmd, Model, Msg};
use super::tree::FileTree;

pub struct App<W: Write> {
    discovery: DiscoveryModel,
    tree: FileTree,
    out: W,
    width: u16,
    height: u16,
    parsed: usize,
    errors: usize,
}

impl<W: Write> App<W> {
    pub fn new(discovery: DiscoveryModel, out: W) -> Self {
        Self {
            discovery,
            tree: FileTree::new(),
            out,
            width: 80,
            height: 24,
            parsed: 0,
            errors: 0,
        }
    }

    pub fn discovery(&self) -> &DiscoveryModel {
        &self.discovery
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    pub fn parsed(&self) -> usize {
        self.parsed
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    fn apply_batch(&mut self, batch: CollectedBatch) {
        let root = self.discovery.root().to_path_buf();
        for mut record in batch.records {
            let rel = path_relative_to(&record.path, &root).unwrap_or_else(|| record.path.clone());
            for (depth, name) in self.tree.insert(&rel) {
                let line = truncate(&name, (self.width as usize).saturating_sub(depth * 2));
                let res = writeln!(self.out, "{}{}", "  ".repeat(depth), line);
                warn_on_write_error(res);
            }
            record.close();
            self.parsed += 1;
        }
        for err in batch.errors {
            log::warn!("{}", err);
            self.errors += 1;
        }
        warn_on_write_error(self.out.flush());
    }

    fn write_summary(&mut self) {
        let res = writeln!(
            self.out,
            "\nProcessing complete. Parsed {} files with {} errors.",
            self.parsed, self.errors
        );
        warn_on_write_error(res.and_then(|_| self.out.flush()));
    }
}

fn warn_on_write_error(res: io::Result<()>) {
    if let Err(e) = res {
        log::warn!("write failed: {}", e);
    }
}

fn truncate(name: &str, max: usize) -> String {
    if max == 0 || name.chars().count() <= max {
        return name.to_string();
    }
    let mut s: String = name.chars().take(max.saturating_sub(1)).collect();
    s.push('…');
    s
}

impl<W: Write> Model for App<W> {
    fn init(&mut self) -> Cmd {
        self.discovery.init()
    }

    fn update(&mut self, msg: Msg) -> Cmd {
        match msg {
            Msg::Batch(batch) => {
                self.apply_batch(batch);
                if self.discovery.finished() {
                    self.write_summary();
                    return Cmd::Quit;
                }
                Cmd::None
            }
            Msg::Resize { width, height } => {
                self.width = width;
                self.height = height;
                Cmd::None
            }
            other => self.discovery.handle(&other),
        }
    }

    fn view(&self) -> String {
        self.tree.render()
    }
}
