//! Pipeline components: walk, validation, the two worker stages, and result delivery.

pub mod barrier;
pub mod context;
pub mod delivery;
pub mod discovery;
pub mod parse;
pub mod validate;
pub mod walk;

pub use barrier::spawn_barrier;
pub use context::{
    CancelToken, PipelineContext, PipelineTuning, ScanHandles, StageOutput, create_stage_channels,
};
pub use delivery::{
    Collected, collect_all, drain_streaming, scan_all, scan_streaming, scan_streaming_with,
};
pub use discovery::{discover, discover_all, discover_with};
pub use parse::{decode_isolated, parse, parse_with};
pub use validate::validate;
pub use walk::{WalkOutcome, run_walk_loop, spawn_walk_thread, to_outcome_jwalk, to_outcome_walkdir};
