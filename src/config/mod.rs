//! Configuration: CLI parsing and runtime settings

pub mod cli;
pub mod settings;

pub use cli::{Cli, FormatArg, Mode};
pub use settings::Settings;
