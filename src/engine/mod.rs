//! Engine module: CLI wiring, output modes, progress, and path filters

pub mod arg_parser;
pub mod cli;
pub mod progress;
pub mod tools;

pub use arg_parser::Cli;
pub use cli::handle_run;
pub use tools::{glob_match, is_os_hidden_file, path_relative_to, should_include_in_walk};
