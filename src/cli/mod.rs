//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose | Example |
//! |---------|---------|---------|
//! | `group` | Filter, sort and group tasks | `taskfn group -t tasks.yaml -g 'task.tags'` |
//! | `eval` | Print an expression's value per task | `taskfn eval -t tasks.yaml 'task.urgency'` |
//! | `check` | Compile expressions only | `taskfn check 'task.due.format("YYYY")'` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Markdown headings and task lines
//! - `json` - Machine-parseable JSON
//!
//! The default can be changed with `[output] default_format` in the config.
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output and library logs on stderr.
//! The log filter comes from `TASKFN_LOG` (default `taskfn=debug`):
//! ```bash
//! TASKFN_LOG=taskfn=trace taskfn --verbose group -t tasks.yaml -g 'task.tags'
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod eval_cmd;
mod group_cmd;
mod output;

pub use app::{run, Cli, Commands, LOG_ENV};
pub use output::{Output, OutputFormat};
