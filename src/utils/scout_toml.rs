//! Load `.dicomscout.toml` from the scanned directory (CLI only). Lib callers pass [`ScanOpts`](crate::ScanOpts) directly.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::{OutputMode, Opts};
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ScoutToml {
    #[serde(default)]
    settings: ScanSection,
}

#[derive(Debug, Default, Deserialize)]
struct ScanSection {
    concurrency: Option<usize>,
    parse_concurrency: Option<usize>,
    mode: Option<OutputMode>,
    batch_delay_ms: Option<u64>,
    follow_links: Option<bool>,
    parallel_walk: Option<bool>,
    exclude: Option<Vec<String>>,
    with_pixel_data: Option<bool>,
    verbose: Option<bool>,
}

/// Load the settings file from `dir`. `Ok(None)` when there is no file.
pub(crate) fn load_scout_toml(dir: &Path) -> Result<Option<ScoutToml>> {
    let path = dir.join(PackagePaths::get().config_filename());
    if !path.is_file() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path)
        .with_context(|| format!("read {}", path.display()))?;
    let file = parse_scout_toml(&s).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(file))
}

pub(crate) fn parse_scout_toml(s: &str) -> std::result::Result<ScoutToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($idx:expr, $opts:expr, $idx_field:ident => $opts_field:ident) => {
        if let Some(v) = $idx.$idx_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only set fields present in the file). Call before applying CLI.
pub(crate) fn apply_file_to_opts(file: &ScoutToml, opts: &mut Opts) {
    let s = &file.settings;
    if s.concurrency.is_some() {
        opts.concurrency = s.concurrency;
    }
    if s.parse_concurrency.is_some() {
        opts.parse_concurrency = s.parse_concurrency;
    }
    if s.batch_delay_ms.is_some() {
        opts.batch_delay_ms = s.batch_delay_ms;
    }
    apply_file_opt!(s, opts, mode => mode);
    apply_file_opt!(s, opts, follow_links => follow_links);
    apply_file_opt!(s, opts, parallel_walk => parallel_walk);
    apply_file_opt!(s, opts, with_pixel_data => with_pixel_data);
    apply_file_opt!(s, opts, verbose => verbose);
    if let Some(ref v) = s.exclude {
        opts.exclude = v.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_fill_opts() {
        let file = parse_scout_toml(
            r#"
            [settings]
            concurrency = 4
            mode = "aggregate"
            exclude = ["*.txt"]
            "#,
        )
        .unwrap();
        let mut opts = Opts::default();
        apply_file_to_opts(&file, &mut opts);
        assert_eq!(opts.concurrency, Some(4));
        assert_eq!(opts.mode, OutputMode::Aggregate);
        assert_eq!(opts.exclude, vec!["*.txt".to_string()]);
        assert!(!opts.follow_links);
    }

    #[test]
    fn missing_section_is_empty() {
        let file = parse_scout_toml("").unwrap();
        let mut opts = Opts::default();
        apply_file_to_opts(&file, &mut opts);
        assert_eq!(opts.concurrency, None);
        assert_eq!(opts.mode, OutputMode::Stream);
    }
}
