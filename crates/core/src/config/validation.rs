//! Configuration validation before the pipeline touches any file

use super::PipelineConfig;
use crate::error::{Error, Result};

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target_name.trim().is_empty() {
            return Err(Error::ConfigError("target_name must not be empty".to_string()));
        }
        if self.target_name.contains(['/', '\\']) {
            return Err(Error::ConfigError(format!(
                "target_name '{}' must not contain path separators",
                self.target_name
            )));
        }
        if self.host_target.as_deref() == Some(self.target_name.as_str()) {
            return Err(Error::ConfigError(
                "target_name and host_target must differ".to_string(),
            ));
        }
        if self.host_bundle_id.trim().is_empty() {
            return Err(Error::ConfigError("host_bundle_id must not be empty".to_string()));
        }
        if self.app_group.trim().is_empty() {
            return Err(Error::ConfigError("app_group must not be empty".to_string()));
        }
        if !is_valid_deployment_target(&self.deployment_target) {
            return Err(Error::ConfigError(format!(
                "deployment_target '{}' is not a version like 17.0",
                self.deployment_target
            )));
        }
        Ok(())
    }
}

/// `17`, `17.0` or `17.0.1`
pub fn is_valid_deployment_target(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    (1..=3).contains(&parts.len())
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_deployment_target_shapes() {
        assert!(is_valid_deployment_target("17"));
        assert!(is_valid_deployment_target("16.4"));
        assert!(is_valid_deployment_target("15.0.1"));
        assert!(!is_valid_deployment_target(""));
        assert!(!is_valid_deployment_target("17."));
        assert!(!is_valid_deployment_target("iOS 17"));
        assert!(!is_valid_deployment_target("1.2.3.4"));
    }

    #[test]
    fn test_rejects_bad_names() {
        let config = PipelineConfig {
            target_name: "ios/Widget".to_string(),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            host_target: Some("HomeWidget".to_string()),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
