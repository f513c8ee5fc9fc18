//! widget-injector - inject a widget extension target into a generated Xcode project
//!
//! This crate provides functionality to:
//! - Parse and write `project.pbxproj` files in Xcode's own layout
//! - Create an app-extension target with its configurations and build phases
//! - Merge app-group entitlements and scaffold the extension's files
//! - Run the whole mutation as an ordered pipeline that reports, never panics
pub mod assets;
pub mod config;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod project;
pub mod stages;

// Re-export commonly used types
pub use config::{CONFIG_FILE_NAME, ConfigLoader, PipelineConfig, SettingValue};
pub use error::{Error, Result};
pub use layout::ProjectLayout;
pub use pipeline::{Pipeline, PipelineOutput, RunReport};
pub use project::{NodeKind, ObjectId, ProjectDescriptor, ProjectGraph};
pub use stages::{Diagnostic, Level, Outcome, StageKind, StageReport};
