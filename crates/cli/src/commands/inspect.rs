use anyhow::{Context, Result};
use widget_injector_core::{ConfigLoader, ProjectDescriptor, ProjectLayout};

use crate::display::print_targets;
use crate::utils::resolve_dir;

pub fn inspect_command(project_root: Option<&str>) -> Result<()> {
    let project_root = resolve_dir(project_root)?;
    let config =
        ConfigLoader::load_for_project(&project_root).context("Failed to load configuration")?;
    let layout = ProjectLayout::resolve(&project_root, &config)
        .with_context(|| format!("Failed to resolve project at {}", project_root.display()))?;

    let pbxproj = layout.pbxproj_path();
    let project = ProjectDescriptor::load(&pbxproj)
        .with_context(|| format!("Failed to parse {}", pbxproj.display()))?;

    print_targets(&project, &pbxproj);
    Ok(())
}
