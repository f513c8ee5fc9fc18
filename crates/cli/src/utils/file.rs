use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories never searched for Xcode projects
const SKIPPED_DIRS: &[&str] = &["node_modules", "Pods", "build", "DerivedData", ".git"];

/// `dir` or the current directory, canonicalized.
pub fn resolve_dir(dir: Option<&str>) -> Result<PathBuf> {
    let dir = match dir {
        Some(dir) => PathBuf::from(dir),
        None => env::current_dir().context("Failed to get current directory")?,
    };
    dir.canonicalize()
        .with_context(|| format!("Failed to canonicalize {}", dir.display()))
}

/// Every `*.xcodeproj` under `root`, at most three levels deep, sorted.
pub fn find_xcodeprojs(root: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .max_depth(3)
        .into_iter()
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .is_none_or(|name| !SKIPPED_DIRS.contains(&name))
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_dir()
                && entry.path().extension().and_then(|e| e.to_str()) == Some("xcodeproj")
        })
        .map(|entry| entry.into_path())
        .collect();
    found.sort();
    found
}

/// Display label for a file the pipeline wrote
pub fn describe_entry(path: &Path) -> &'static str {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    match path.extension().and_then(|e| e.to_str()) {
        Some("pbxproj") => "🧩",
        Some("entitlements") => "🔐",
        Some("plist") => "📋",
        Some("swift") | Some("m") | Some("mm") | Some("h") => "📄",
        Some("png") | Some("jpg") => "🖼️",
        _ if file_name == "Contents.json" => "🎨",
        _ => "📁",
    }
}
