//! Configuration for the project mutation pipeline
//!
//! Every constant the pipeline writes into a project (target name, bundle
//! ids, team, deployment floor, the build settings table) lives here. The
//! defaults describe an Expo-style `ios/` tree; a `.widget-injector.json`
//! file overrides any subset of them.

mod loader;
mod settings;
mod validation;

pub use loader::{CONFIG_FILE_NAME, ConfigLoader};
pub use settings::{
    Interpolation, SettingValue, SettingsTable, default_settings, layer_settings,
};

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Name of the extension target; also its directory under `ios_dir`
    pub target_name: String,
    /// Shared app group granted to both the app and the extension
    pub app_group: String,
    pub host_bundle_id: String,
    /// Appended to `host_bundle_id` to form the extension's bundle id
    pub bundle_suffix: String,
    pub team_id: String,
    pub deployment_target: String,

    /// Native project directory, relative to the project root
    pub ios_dir: String,
    /// Main app target; derived from the `.xcodeproj` name when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_target: Option<String>,
    /// Template directory, relative to the project root
    pub template_dir: String,
    pub widget_template_subdir: String,
    pub module_template_subdir: String,
    pub widget_sources: Vec<String>,
    pub module_files: Vec<String>,

    /// Host icon, relative to the host target directory
    pub host_icon: String,
    pub icon_set_name: String,
    /// Color set name -> `#RRGGBB` / `#RRGGBBAA`
    pub colors: IndexMap<String, String>,

    /// Register the extension's files with its target in the project
    pub register_source_files: bool,

    /// Layered over the default settings table; `null` removes a key
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub build_settings: IndexMap<String, Option<SettingValue>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let mut colors = IndexMap::new();
        colors.insert("AccentColor".to_string(), "#007AFF".to_string());
        colors.insert("WidgetBackground".to_string(), "#FFFFFF".to_string());

        Self {
            target_name: "HomeWidget".to_string(),
            app_group: "group.com.example.app".to_string(),
            host_bundle_id: "com.example.app".to_string(),
            bundle_suffix: ".widget".to_string(),
            team_id: String::new(),
            deployment_target: "17.0".to_string(),
            ios_dir: "ios".to_string(),
            host_target: None,
            template_dir: "widget".to_string(),
            widget_template_subdir: "extension".to_string(),
            module_template_subdir: "module".to_string(),
            widget_sources: vec![
                "HomeWidget.swift".to_string(),
                "HomeWidgetBundle.swift".to_string(),
                "SharedStorage.swift".to_string(),
            ],
            module_files: vec![
                "WidgetBridge.swift".to_string(),
                "WidgetBridge.m".to_string(),
            ],
            host_icon: "Images.xcassets/AppIcon.appiconset/App-Icon-1024x1024@1x.png".to_string(),
            icon_set_name: "WidgetIcon".to_string(),
            colors,
            register_source_files: true,
            build_settings: IndexMap::new(),
        }
    }
}

impl PipelineConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigError(format!("Failed to parse {}: {e}", path.display())))?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// `<host_bundle_id><bundle_suffix>`
    pub fn extension_bundle_id(&self) -> String {
        format!("{}{}", self.host_bundle_id, self.bundle_suffix)
    }

    /// The fully interpolated settings table.
    pub fn settings_table(&self) -> SettingsTable {
        let bundle_id = self.extension_bundle_id();
        let vars = Interpolation {
            target_name: &self.target_name,
            bundle_id: &bundle_id,
            host_bundle_id: &self.host_bundle_id,
            team_id: &self.team_id,
            deployment_target: &self.deployment_target,
            app_group: &self.app_group,
        };
        layer_settings(default_settings(), &self.build_settings)
            .into_iter()
            .map(|(key, value)| {
                let value = value.interpolate(&vars);
                (key, value)
            })
            .collect()
    }
}
