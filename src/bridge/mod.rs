//! Consumer bridge: feeds pipeline output to a single-threaded, timer-driven event loop.

pub mod accumulator;
pub mod app;
pub mod discovery_model;
pub mod program;
pub mod tree;

pub use accumulator::{BatchAccumulator, CollectedBatch};
pub use app::App;
pub use discovery_model::DiscoveryModel;
pub use program::{Cmd, Model, Msg, Program};
pub use tree::FileTree;
