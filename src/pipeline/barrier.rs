//! Stage barrier: joins every worker, then closes the error channel, then the result channel.

use crossbeam_channel::Sender;
use std::thread::{self, JoinHandle};

use crate::errors::ScanError;

/// Spawn the barrier for one stage.
///
/// Workers hold clones of `item_tx`/`err_tx`; the barrier holds the originals, so the channels
/// close exactly when the barrier drops them. The error sender is dropped first: a consumer that
/// selects over both streams sees errors closed no later than results, and never misses a
/// buffered error.
pub fn spawn_barrier<T: Send + 'static>(
    stage: &'static str,
    workers: Vec<JoinHandle<()>>,
    walk: Option<JoinHandle<usize>>,
    item_tx: Sender<T>,
    err_tx: Sender<ScanError>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        if let Some(walk) = walk {
            match walk.join() {
                Ok(count) => log::debug!("{}: walk finished ({} paths)", stage, count),
                Err(_) => log::error!("{}: walk thread panicked", stage),
            }
        }
        for (i, h) in workers.into_iter().enumerate() {
            if h.join().is_err() {
                log::error!("{}: worker {} panicked", stage, i);
            }
        }
        drop(err_tx);
        drop(item_tx);
        log::debug!("{}: all workers done, channels closed", stage);
    })
}
