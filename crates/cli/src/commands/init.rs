use anyhow::{Context, Result};
use tracing::info;
use widget_injector_core::{CONFIG_FILE_NAME, PipelineConfig};

use crate::utils::{find_xcodeprojs, resolve_dir};

pub fn init_command(cwd: Option<&str>, force: bool) -> Result<()> {
    let project_root = resolve_dir(cwd)?;
    let config_path = project_root.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        println!("❌ Config already exists at: {}", config_path.display());
        println!("   Use --force to overwrite");
        return Ok(());
    }

    println!(
        "🚀 Initializing widget-injector in: {}",
        project_root.display()
    );

    let mut config = PipelineConfig::default();
    let projects = find_xcodeprojs(&project_root);
    match projects.first() {
        Some(xcodeproj) => {
            let ios_dir = xcodeproj
                .parent()
                .and_then(|dir| dir.strip_prefix(&project_root).ok())
                .and_then(|dir| dir.to_str())
                .filter(|dir| !dir.is_empty());
            if let Some(ios_dir) = ios_dir {
                config.ios_dir = ios_dir.to_string();
            }
            config.host_target = xcodeproj
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string);
            info!("Detected Xcode project {:?}", xcodeproj);
            println!("📦 Found Xcode project: {}", xcodeproj.display());
            if projects.len() > 1 {
                println!("   ({} more ignored)", projects.len() - 1);
            }
        }
        None => println!("⚠️  No .xcodeproj found yet, using defaults"),
    }

    config
        .save_to_file(&config_path)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!("✅ Created config: {}", config_path.display());
    println!("\n📌 Next steps:");
    println!("   Edit target_name, host_bundle_id and app_group, then run:");
    println!("   widget-injector apply");
    Ok(())
}
