//! Fixture trees for the end-to-end pipeline tests

use anyhow::{Context, Result};
use plist::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use widget_injector_core::stages::APP_GROUPS_KEY;
use widget_injector_core::{Pipeline, PipelineConfig, PipelineOutput, ProjectDescriptor};

pub const FIXTURE: &str = include_str!("../crates/core/tests/fixtures/HelloWorld.pbxproj");
pub const HOST_TARGET: &str = "HelloWorld";
pub const HOST_ICON: &str = "Images.xcassets/AppIcon.appiconset/App-Icon-1024x1024@1x.png";
pub const ICON_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfixture";
pub const WIDGET_SOURCES: &[&str] = &[
    "HomeWidget.swift",
    "HomeWidgetBundle.swift",
    "SharedStorage.swift",
];
pub const MODULE_FILES: &[&str] = &["WidgetBridge.swift", "WidgetBridge.m"];

const ROOT_OBJECT_LINE: &str = "rootObject = 83CBB9F71A601CBA00E9B192 /* Project object */;";

/// A throwaway Expo-style project tree
pub struct ProjectTree {
    dir: TempDir,
}

impl ProjectTree {
    /// Project file, host target directory with an icon, and templates.
    pub fn expo() -> Result<Self> {
        let tree = Self {
            dir: TempDir::new()?,
        };
        let xcodeproj = tree.ios_dir().join(format!("{HOST_TARGET}.xcodeproj"));
        fs::create_dir_all(&xcodeproj)?;
        fs::write(xcodeproj.join("project.pbxproj"), FIXTURE)?;

        let icon = tree.host_dir().join(HOST_ICON);
        fs::create_dir_all(icon.parent().context("icon path has a parent")?)?;
        fs::write(&icon, ICON_BYTES)?;

        let extension = tree.root().join("widget/extension");
        fs::create_dir_all(&extension)?;
        for source in WIDGET_SOURCES {
            fs::write(extension.join(source), format!("// {source}\nimport WidgetKit\n"))?;
        }
        let module = tree.root().join("widget/module");
        fs::create_dir_all(&module)?;
        for file in MODULE_FILES {
            fs::write(module.join(file), format!("// {file}\n"))?;
        }
        Ok(tree)
    }

    /// Drop the whole `widget/` template tree.
    pub fn without_templates(self) -> Result<Self> {
        fs::remove_dir_all(self.root().join("widget"))?;
        Ok(self)
    }

    pub fn without_host_icon(self) -> Result<Self> {
        fs::remove_file(self.host_dir().join(HOST_ICON))?;
        Ok(self)
    }

    /// Point `rootObject` at the host target so the graph rejects target
    /// creation.
    pub fn with_broken_root_object(self) -> Result<Self> {
        let path = self.pbxproj_path();
        let contents = fs::read_to_string(&path)?;
        anyhow::ensure!(contents.contains(ROOT_OBJECT_LINE), "fixture root object moved");
        let broken = contents.replace(ROOT_OBJECT_LINE, "rootObject = 13B07F861A680F5B00A75B9A;");
        fs::write(&path, broken)?;
        Ok(self)
    }

    /// Host entitlements holding `groups` before the run
    pub fn with_host_groups(self, groups: &[&str]) -> Result<Self> {
        let mut entitlements = plist::Dictionary::new();
        entitlements.insert(
            APP_GROUPS_KEY.to_string(),
            Value::Array(groups.iter().map(|g| Value::String(g.to_string())).collect()),
        );
        let path = self.host_entitlements_path();
        fs::create_dir_all(self.host_dir())?;
        Value::Dictionary(entitlements).to_file_xml(&path)?;
        Ok(self)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn ios_dir(&self) -> PathBuf {
        self.root().join("ios")
    }

    pub fn host_dir(&self) -> PathBuf {
        self.ios_dir().join(HOST_TARGET)
    }

    pub fn host_entitlements_path(&self) -> PathBuf {
        self.host_dir().join(format!("{HOST_TARGET}.entitlements"))
    }

    pub fn extension_dir(&self, config: &PipelineConfig) -> PathBuf {
        self.ios_dir().join(&config.target_name)
    }

    pub fn pbxproj_path(&self) -> PathBuf {
        self.ios_dir()
            .join(format!("{HOST_TARGET}.xcodeproj"))
            .join("project.pbxproj")
    }

    pub fn read_pbxproj(&self) -> Result<String> {
        Ok(fs::read_to_string(self.pbxproj_path())?)
    }

    pub fn load_project(&self) -> Result<ProjectDescriptor> {
        Ok(ProjectDescriptor::load(&self.pbxproj_path())?)
    }

    pub fn run(&self, config: &PipelineConfig) -> Result<PipelineOutput> {
        let pipeline = Pipeline::new(self.root(), config.clone())?;
        Ok(pipeline.run())
    }
}

/// Configuration matching the fixture's host app
pub fn fixture_config() -> PipelineConfig {
    PipelineConfig {
        host_bundle_id: "com.example.helloworld".to_string(),
        app_group: "group.com.example.helloworld".to_string(),
        team_id: "ABCDE12345".to_string(),
        ..PipelineConfig::default()
    }
}

/// App groups listed in an entitlements file
pub fn app_groups(path: &Path) -> Result<Vec<String>> {
    let value = Value::from_file(path)?;
    let groups = value
        .as_dictionary()
        .and_then(|dict| dict.get(APP_GROUPS_KEY))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_string().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    Ok(groups)
}
