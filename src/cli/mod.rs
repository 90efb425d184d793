//! # Command-Line Interface
//!
//! User-facing commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `init` | Write a starter `pipeline.toml` and source layout |
//! | `build` | Plan and run tasks with everything they depend on |
//! | `tasks` | List tasks in execution order |
//! | `deps` | Show dependency declarations or resolve a classpath |
//! | `clean` | Remove the build directory |
//!
//! ## Output Formats
//!
//! All commands support `--format`:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Logging
//!
//! `--verbose` (or `-v`) turns on debug logging. `STAGEHAND_LOG` takes an
//! `EnvFilter` directive and wins over the flag:
//! ```bash
//! STAGEHAND_LOG=stagehand=trace stagehand build
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod build;
mod inspect;
mod logging;
mod output;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
