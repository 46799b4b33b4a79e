// Public API
pub mod cli;
pub mod commands;
pub mod server;
pub mod tools;

// Core domain types
mod config;
mod diagnostics;
mod environment;
mod error;
mod inventory;
mod playbook;
mod process;
mod project;
mod ui;
mod util;

// Re-export main types
pub use config::{ConfigStore, ProjectDefinition, ServerConfiguration};
pub use environment::{compose_env, project_env, EnvMap};
pub use error::ToolError;
pub use process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use project::{resolve_project, resolve_project_with};
