//! Where things live inside a project root

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

const XCODEPROJ_EXTENSION: &str = "xcodeproj";
const PBXPROJ_FILE_NAME: &str = "project.pbxproj";

/// Resolved paths for one project tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub project_root: PathBuf,
    pub ios_dir: PathBuf,
    pub xcodeproj: PathBuf,
    pub host_target: String,
    pub target_name: String,
    pub template_dir: PathBuf,
    widget_template_subdir: String,
    module_template_subdir: String,
}

impl ProjectLayout {
    /// Locate the native project directory and its `.xcodeproj` bundle.
    pub fn resolve(project_root: &Path, config: &PipelineConfig) -> Result<Self> {
        let ios_dir = project_root.join(&config.ios_dir);
        if !ios_dir.is_dir() {
            return Err(Error::ConfigError(format!(
                "native project directory {} does not exist",
                ios_dir.display()
            )));
        }
        let xcodeproj = find_xcodeproj(&ios_dir)?;
        let host_target = match &config.host_target {
            Some(host) => host.clone(),
            None => xcodeproj
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::ConfigError(format!(
                        "cannot derive the host target from {}",
                        xcodeproj.display()
                    ))
                })?,
        };
        debug!("Resolved {:?} with host target {}", xcodeproj, host_target);

        Ok(Self {
            project_root: project_root.to_path_buf(),
            ios_dir,
            xcodeproj,
            host_target,
            target_name: config.target_name.clone(),
            template_dir: project_root.join(&config.template_dir),
            widget_template_subdir: config.widget_template_subdir.clone(),
            module_template_subdir: config.module_template_subdir.clone(),
        })
    }

    pub fn pbxproj_path(&self) -> PathBuf {
        self.xcodeproj.join(PBXPROJ_FILE_NAME)
    }

    /// Source directory of the main app target
    pub fn host_dir(&self) -> PathBuf {
        self.ios_dir.join(&self.host_target)
    }

    pub fn host_entitlements_path(&self) -> PathBuf {
        self.host_dir()
            .join(format!("{}.entitlements", self.host_target))
    }

    /// Directory the extension's files are written to
    pub fn extension_dir(&self) -> PathBuf {
        self.ios_dir.join(&self.target_name)
    }

    pub fn widget_template_dir(&self) -> PathBuf {
        self.template_dir.join(&self.widget_template_subdir)
    }

    pub fn module_template_dir(&self) -> PathBuf {
        self.template_dir.join(&self.module_template_subdir)
    }
}

/// The first `*.xcodeproj` (by name) that holds a `project.pbxproj`.
fn find_xcodeproj(ios_dir: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(ios_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension().and_then(|e| e.to_str()) == Some(XCODEPROJ_EXTENSION)
                && path.join(PBXPROJ_FILE_NAME).is_file()
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next().ok_or_else(|| {
        Error::ConfigError(format!(
            "no *.{XCODEPROJ_EXTENSION} with a {PBXPROJ_FILE_NAME} under {}",
            ios_dir.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project_tree() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let xcodeproj = temp_dir.path().join("ios").join("HelloWorld.xcodeproj");
        fs::create_dir_all(&xcodeproj).unwrap();
        fs::write(xcodeproj.join(PBXPROJ_FILE_NAME), "// !$*UTF8*$!\n{}\n").unwrap();
        temp_dir
    }

    #[test]
    fn test_host_target_from_xcodeproj_name() {
        let root = project_tree();
        let layout = ProjectLayout::resolve(root.path(), &PipelineConfig::default()).unwrap();

        assert_eq!(layout.host_target, "HelloWorld");
        assert_eq!(
            layout.pbxproj_path(),
            root.path().join("ios/HelloWorld.xcodeproj/project.pbxproj")
        );
        assert_eq!(
            layout.host_entitlements_path(),
            root.path().join("ios/HelloWorld/HelloWorld.entitlements")
        );
        assert_eq!(layout.extension_dir(), root.path().join("ios/HomeWidget"));
        assert_eq!(
            layout.widget_template_dir(),
            root.path().join("widget/extension")
        );
    }

    #[test]
    fn test_configured_host_target_wins() {
        let root = project_tree();
        let config = PipelineConfig {
            host_target: Some("MainApp".to_string()),
            ..PipelineConfig::default()
        };
        let layout = ProjectLayout::resolve(root.path(), &config).unwrap();
        assert_eq!(layout.host_target, "MainApp");
    }

    #[test]
    fn test_missing_xcodeproj_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("ios")).unwrap();

        let result = ProjectLayout::resolve(temp_dir.path(), &PipelineConfig::default());
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}
