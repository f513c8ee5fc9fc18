//! Runs the stages in order and collects their reports

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::layout::ProjectLayout;
use crate::project::ProjectDescriptor;
use crate::stages::{
    EntitlementStage, ModuleStage, Outcome, PatchStage, PipelineContext, ScaffoldStage, Stage,
    StageKind, StageReport,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reports of every stage of one run, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub project_root: PathBuf,
    pub target_name: String,
    pub stages: Vec<StageReport>,
    pub written: Vec<PathBuf>,
}

impl RunReport {
    pub fn stage(&self, kind: StageKind) -> Option<&StageReport> {
        self.stages.iter().find(|report| report.stage == kind)
    }

    /// The worst outcome of any stage
    pub fn outcome(&self) -> Outcome {
        self.stages
            .iter()
            .map(|report| report.outcome)
            .max()
            .unwrap_or(Outcome::NoOp)
    }

    pub fn has_failures(&self) -> bool {
        self.stages.iter().any(StageReport::is_failure)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub report: RunReport,
    /// Descriptor after the patch stage, if it could be loaded
    pub project: Option<ProjectDescriptor>,
}

pub struct Pipeline {
    context: PipelineContext,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Resolve the project layout. Errors here are the only ones a run can
    /// return; once stages start, failures end up in the report.
    pub fn new(project_root: &Path, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let layout = ProjectLayout::resolve(project_root, &config)?;
        Ok(Self::with_layout(config, layout))
    }

    pub fn with_layout(config: PipelineConfig, layout: ProjectLayout) -> Self {
        Self {
            context: PipelineContext::new(config, layout),
            stages: vec![
                Box::new(EntitlementStage),
                Box::new(ScaffoldStage),
                Box::new(ModuleStage),
                Box::new(PatchStage),
            ],
        }
    }

    pub fn run(mut self) -> PipelineOutput {
        info!(
            "Injecting {} into {}",
            self.context.config.target_name,
            self.context.layout.project_root.display()
        );

        let mut stages = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let mut report = StageReport::new(stage.kind());
            debug!("Running stage: {}", stage.kind());
            if let Err(e) = stage.run(&mut self.context, &mut report) {
                report.fail(format!("{e:#}"));
            }
            stages.push(report);
        }

        let report = RunReport {
            project_root: self.context.layout.project_root.clone(),
            target_name: self.context.config.target_name.clone(),
            stages,
            written: self.context.written,
        };
        info!("Run finished: {:?}", report.outcome());
        PipelineOutput {
            report,
            project: self.context.project,
        }
    }
}
