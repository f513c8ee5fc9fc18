//! The four ordered stages of a run and the report each one produces

pub mod entitlements;
pub mod modules;
pub mod patcher;
pub mod scaffold;

pub use entitlements::{APP_GROUPS_KEY, EntitlementStage, merge_app_group};
pub use modules::ModuleStage;
pub use patcher::{PatchStage, PatchState, ProjectPatcher, Resolution};
pub use scaffold::ScaffoldStage;

use crate::config::PipelineConfig;
use crate::layout::ProjectLayout;
use crate::project::ProjectDescriptor;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Entitlements,
    Scaffold,
    Modules,
    Patch,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::Entitlements => "Entitlement merger",
            StageKind::Scaffold => "Extension scaffolder",
            StageKind::Modules => "Module file installer",
            StageKind::Patch => "Project graph patcher",
        };
        f.write_str(name)
    }
}

/// How a stage ended. Ordered by severity; a report keeps the worst one seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    NoOp,
    Applied,
    SoftSkip,
    SoftFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: StageKind,
    pub outcome: Outcome,
    pub diagnostics: Vec<Diagnostic>,
}

impl StageReport {
    pub fn new(stage: StageKind) -> Self {
        Self {
            stage,
            outcome: Outcome::NoOp,
            diagnostics: Vec::new(),
        }
    }

    /// Raise the outcome to `outcome` unless something worse was recorded.
    pub fn escalate(&mut self, outcome: Outcome) {
        self.outcome = self.outcome.max(outcome);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(stage = %self.stage, "{}", message);
        self.push(Level::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(stage = %self.stage, "{}", message);
        self.push(Level::Warning, message);
    }

    /// A sub-step that could not run; the rest of the stage continues.
    pub fn skip(&mut self, message: impl Into<String>) {
        self.warn(message);
        self.escalate(Outcome::SoftSkip);
    }

    /// The stage stops here.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!(stage = %self.stage, "{}", message);
        self.push(Level::Error, message);
        self.escalate(Outcome::SoftFailure);
    }

    pub fn is_failure(&self) -> bool {
        self.outcome == Outcome::SoftFailure
    }

    fn push(&mut self, level: Level, message: String) {
        self.diagnostics.push(Diagnostic { level, message });
    }
}

/// State shared by the stages of one run
#[derive(Debug)]
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub layout: ProjectLayout,
    /// Entries created directly under the extension directory
    pub extension_entries: Vec<String>,
    /// Every file written during the run
    pub written: Vec<PathBuf>,
    /// Descriptor as left by the patch stage
    pub project: Option<ProjectDescriptor>,
}

impl PipelineContext {
    pub fn new(config: PipelineConfig, layout: ProjectLayout) -> Self {
        Self {
            config,
            layout,
            extension_entries: Vec::new(),
            written: Vec::new(),
            project: None,
        }
    }
}

/// A step of the pipeline. Returning `Err` ends the stage as a soft failure;
/// the pipeline carries on with the next stage.
pub trait Stage {
    fn kind(&self) -> StageKind;

    fn run(&self, context: &mut PipelineContext, report: &mut StageReport) -> anyhow::Result<()>;
}

/// Context over a bare `ios/HelloWorld.xcodeproj` under `root`.
#[cfg(test)]
pub(crate) fn test_context(root: &std::path::Path) -> PipelineContext {
    let xcodeproj = root.join("ios").join("HelloWorld.xcodeproj");
    std::fs::create_dir_all(&xcodeproj).unwrap();
    std::fs::write(xcodeproj.join("project.pbxproj"), "").unwrap();
    let config = PipelineConfig {
        app_group: "group.com.example.app".to_string(),
        ..PipelineConfig::default()
    };
    let layout = ProjectLayout::resolve(root, &config).unwrap();
    PipelineContext::new(config, layout)
}
