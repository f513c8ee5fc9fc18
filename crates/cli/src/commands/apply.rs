use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;
use widget_injector_core::{ConfigLoader, Pipeline};

use crate::display::print_run_report;
use crate::utils::resolve_dir;

/// Run the pipeline. Stage failures are reported, not returned.
pub fn apply_command(project_root: Option<&str>, config: Option<&str>, json: bool) -> Result<()> {
    let project_root = resolve_dir(project_root)?;
    debug!("Applying to project root {:?}", project_root);

    let config = match config {
        Some(path) => ConfigLoader::load_file(Path::new(path))
            .with_context(|| format!("Failed to load config from {path}"))?,
        None => ConfigLoader::load_for_project(&project_root)
            .context("Failed to load configuration")?,
    };

    let pipeline = Pipeline::new(&project_root, config)
        .with_context(|| format!("Failed to resolve project at {}", project_root.display()))?;
    let output = pipeline.run();

    if json {
        println!("{}", output.report.to_json()?);
    } else {
        print_run_report(&output.report);
    }
    Ok(())
}
