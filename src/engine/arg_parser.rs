use clap::Parser;
use std::path::PathBuf;

use crate::OutputMode;

/// Find and decode DICOM files under a directory.
#[derive(Clone, Debug, Parser)]
#[command(name = "dicomscout")]
#[command(about = "Walk a directory, validate DICOM signatures in parallel, and decode what matches.")]
pub struct Cli {
    /// Directory to scan.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Validator workers (0 = default of 8). Capped by the open-file limit.
    #[arg(long, short = 'j')]
    pub concurrency: Option<usize>,

    /// Decode workers. Default: same as --concurrency.
    #[arg(long)]
    pub parse_concurrency: Option<usize>,

    /// How results are delivered: stream (default), aggregate, or tree.
    #[arg(long, short = 'm', value_enum)]
    pub mode: Option<OutputMode>,

    /// Poll period for tree mode, in milliseconds (default 100).
    #[arg(long)]
    pub batch_delay_ms: Option<u64>,

    /// Follow symbolic links.
    #[arg(long, short = 'f', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub follow_links: Option<bool>,

    /// Walk directories in parallel (jwalk) instead of serially.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub parallel_walk: Option<bool>,

    /// Exclude patterns (glob syntax). Can specify multiple: -e pattern1 pattern2 pattern3
    #[arg(long, short = 'e', num_args = 1..)]
    pub exclude: Vec<String>,

    /// Decode pixel data as well (slower, more memory).
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub with_pixel_data: Option<bool>,

    /// Aggregate mode: print a JSON summary instead of text.
    #[arg(long)]
    pub json: bool,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
