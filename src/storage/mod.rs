//! # Storage Layer
//!
//! File access for the command-line host. The library core never touches the
//! file system; everything that does lives here.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | YAML or JSON fixture | any path given to `--tasks` |
//! | Config | TOML | `.taskfn/config.toml`, `~/.config/taskfn/config.toml` |
//!
//! ## Key Types
//!
//! - [`TaskStore`] - Reads task fixtures
//! - [`Config`] - Project and global configuration

mod config;
mod store;

pub use config::{Config, ConfigError, ConfigFile, OutputFormat, StatusEntry, PROJECT_DIR};
pub use store::{StoreError, TaskDocument, TaskRecord, TaskStore};
