//! Stage 3: install the bridge module files into the main target

use super::{Outcome, PipelineContext, Stage, StageKind, StageReport};
use anyhow::Context;
use std::fs;

pub struct ModuleStage;

impl Stage for ModuleStage {
    fn kind(&self) -> StageKind {
        StageKind::Modules
    }

    fn run(&self, context: &mut PipelineContext, report: &mut StageReport) -> anyhow::Result<()> {
        let template_dir = context.layout.module_template_dir();
        let host_dir = context.layout.host_dir();

        let mut installed = 0;
        for file in &context.config.module_files {
            let from = template_dir.join(file);
            if !from.is_file() {
                report.skip(format!("Module file {} not found", from.display()));
                continue;
            }
            let to = host_dir.join(file);
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::copy(&from, &to).with_context(|| format!("Failed to copy {}", from.display()))?;
            context.written.push(to);
            installed += 1;
        }

        if installed > 0 {
            report.info(format!(
                "Installed {installed} module file(s) into {}",
                host_dir.display()
            ));
            report.escalate(Outcome::Applied);
        }
        Ok(())
    }
}
