//! Locating `.widget-injector.json`

use super::PipelineConfig;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = ".widget-injector.json";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Walk up from `start_path` until a config file is found.
    pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
        let mut current = if start_path.is_file() {
            start_path.parent()?
        } else {
            start_path
        };

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }
            current = current.parent()?;
        }
    }

    /// Load the configuration that applies to a project root, falling back to
    /// the defaults when no file exists. The result is validated.
    pub fn load_for_project(project_root: &Path) -> Result<PipelineConfig> {
        let config = match Self::find_config_file(project_root) {
            Some(path) => {
                debug!("Loading config from {:?}", path);
                PipelineConfig::load_from_file(&path)?
            }
            None => {
                debug!("No {} found above {:?}, using defaults", CONFIG_FILE_NAME, project_root);
                PipelineConfig::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load an explicitly named config file.
    pub fn load_file(path: &Path) -> Result<PipelineConfig> {
        let config = PipelineConfig::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_finds_config_in_ancestor() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("apps").join("mobile");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            r#"{ "target_name": "OrdersWidget" }"#,
        )
        .unwrap();

        let found = ConfigLoader::find_config_file(&nested).unwrap();
        assert_eq!(found, temp_dir.path().join(CONFIG_FILE_NAME));

        let config = ConfigLoader::load_for_project(&nested).unwrap();
        assert_eq!(config.target_name, "OrdersWidget");
    }

    #[test]
    fn test_nearest_config_wins() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("mobile");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            r#"{ "target_name": "Outer" }"#,
        )
        .unwrap();
        fs::write(nested.join(CONFIG_FILE_NAME), r#"{ "target_name": "Inner" }"#).unwrap();

        let config = ConfigLoader::load_for_project(&nested).unwrap();
        assert_eq!(config.target_name, "Inner");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{ "target_name": "" }"#).unwrap();

        assert!(ConfigLoader::load_file(&path).is_err());
    }
}
