//! # Storage Layer
//!
//! Project manifest and user configuration.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Pipeline manifest | TOML | `pipeline.toml` (project root) |
//! | User preferences | TOML | `<config dir>/stagehand/config.toml` |
//! | Build report | JSON | `build/reports/pipeline.json` |
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for a project directory
//! - [`PipelineConfig`] - Parsed and validated `pipeline.toml`
//! - [`Config`] - Global configuration and project discovery

mod config;
mod project;

pub use config::{
    ActionConfig, Config, ConfigError, ConfigurationConfig, GlobalConfig, OutputFormat,
    PipelineConfig, ProjectMeta, TaskConfig, MANIFEST_FILE,
};
pub use project::{Project, ProjectError};
