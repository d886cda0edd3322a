//! Common walk loop: consumes an iterator of walk outcomes, sends candidate paths to `path_tx`,
//! reports traversal errors on `err_tx` without stopping.

use crossbeam_channel::Sender;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crate::engine::tools::should_include_in_walk;
use crate::errors::ScanError;

use super::context::{PipelineContext, send_unless_cancelled};

/// One result from a directory walk: an entry to consider or an error with optional path.
pub enum WalkOutcome {
    Ok { path: PathBuf, is_file: bool },
    Err { msg: String, path: Option<PathBuf> },
}

/// Convert a jwalk result into [`WalkOutcome`].
pub fn to_outcome_jwalk(r: Result<jwalk::DirEntry<((), ())>, jwalk::Error>) -> WalkOutcome {
    match r {
        Ok(entry) => WalkOutcome::Ok {
            is_file: entry.file_type().is_file(),
            path: entry.path(),
        },
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

/// Convert a walkdir result into [`WalkOutcome`].
pub fn to_outcome_walkdir(r: Result<walkdir::DirEntry, walkdir::Error>) -> WalkOutcome {
    match r {
        Ok(entry) => WalkOutcome::Ok {
            is_file: entry.file_type().is_file(),
            path: entry.into_path(),
        },
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

fn jwalk_iter(ctx: &PipelineContext) -> Box<dyn Iterator<Item = WalkOutcome>> {
    use jwalk::Parallelism;
    use std::time::Duration;
    Box::new(
        jwalk::WalkDir::new(&ctx.root)
            .follow_links(ctx.follow_links)
            .parallelism(Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_secs(60),
            })
            .into_iter()
            .map(to_outcome_jwalk),
    )
}

fn walkdir_iter(ctx: &PipelineContext) -> Box<dyn Iterator<Item = WalkOutcome>> {
    use walkdir::WalkDir;
    Box::new(
        WalkDir::new(&ctx.root)
            .follow_links(ctx.follow_links)
            .into_iter()
            .map(to_outcome_walkdir),
    )
}

pub fn spawn_walk_thread(
    path_tx: Sender<PathBuf>,
    err_tx: Sender<ScanError>,
    ctx: PipelineContext,
) -> JoinHandle<usize> {
    thread::spawn(move || {
        let iter: Box<dyn Iterator<Item = WalkOutcome>> = match ctx.parallel_walk {
            true => jwalk_iter(&ctx),
            false => walkdir_iter(&ctx),
        };
        run_walk_loop(path_tx, err_tx, &ctx, iter)
    })
}

/// Run the common walk loop: consume `iter`, skip anything that is not a regular file
/// (directories, and symlinks unless followed) and filtered names, send the rest
/// to `path_tx`. Errors go to `err_tx` as [`ScanError::Walk`] and the walk continues.
/// Drops `path_tx` when done (validators then drain and exit). Returns the count of paths sent.
pub fn run_walk_loop<I>(
    path_tx: Sender<PathBuf>,
    err_tx: Sender<ScanError>,
    ctx: &PipelineContext,
    iter: I,
) -> usize
where
    I: Iterator<Item = WalkOutcome>,
{
    let mut count = 0_usize;
    for outcome in iter {
        if ctx.cancel.is_cancelled() {
            log::debug!("walk: cancelled after {} paths", count);
            break;
        }
        match outcome {
            WalkOutcome::Ok { path, is_file } => {
                if !is_file || !should_include_in_walk(&path, &ctx.root, &ctx.exclude) {
                    continue;
                }
                if !send_unless_cancelled(&path_tx, path, &ctx.cancel) {
                    break;
                }
                count += 1;
            }
            WalkOutcome::Err { msg, path } => {
                log::debug!("walk error: {}", msg);
                let err = ScanError::Walk { path, message: msg };
                if !send_unless_cancelled(&err_tx, err, &ctx.cancel) {
                    break;
                }
            }
        }
    }
    drop(err_tx);
    drop(path_tx);
    log::debug!("walk: done, {} candidate paths", count);
    count
}
