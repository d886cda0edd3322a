//! dicomscout CLI: find and decode DICOM files under a directory.

use anyhow::Result;
use clap::Parser;
use dicomscout::engine::arg_parser::Cli;
use dicomscout::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
