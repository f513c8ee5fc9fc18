//! Stage 4: inject the extension target into the project graph
//!
//! The patcher runs a small state machine:
//!
//! ```text
//! TargetAbsent -> TargetCreated -> ConfigListResolved(Primary | Fallback) -> SettingsApplied
//! TargetAbsent -> AlreadyExists
//! ```
//!
//! Anything the graph rejects ends the run as a soft failure.

use super::{Outcome, PipelineContext, Stage, StageKind, StageReport};
use crate::config::{PipelineConfig, SettingsTable};
use crate::project::{
    APP_EXTENSION_PRODUCT_TYPE, NewTarget, ObjectId, ProjectDescriptor, ProjectGraph, SourceFile,
    TableEntry, TargetHandle,
};
use anyhow::Context;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// Which path found the new target's configuration list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Reference carried by the creation handle
    Primary,
    /// Scan of the target table by name
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchState {
    AlreadyExists(ObjectId),
    SettingsApplied {
        target: ObjectId,
        resolution: Resolution,
        configurations: usize,
    },
    Failed,
}

impl PatchState {
    /// Whether the graph holds changes that should be written back.
    pub fn is_mutated(&self) -> bool {
        matches!(self, PatchState::SettingsApplied { .. })
    }
}

pub struct ProjectPatcher<'a> {
    pub target_name: &'a str,
    pub bundle_id: String,
    pub host_target: Option<&'a str>,
    pub settings: SettingsTable,
    /// Files to register under the extension's group; empty to skip
    pub source_files: Vec<SourceFile>,
}

impl<'a> ProjectPatcher<'a> {
    pub fn new(config: &'a PipelineConfig, host_target: Option<&'a str>) -> Self {
        Self {
            target_name: &config.target_name,
            bundle_id: config.extension_bundle_id(),
            host_target,
            settings: config.settings_table(),
            source_files: Vec::new(),
        }
    }

    pub fn with_source_files(mut self, files: Vec<SourceFile>) -> Self {
        self.source_files = files;
        self
    }

    pub fn patch<G: ProjectGraph + ?Sized>(
        &self,
        graph: &mut G,
        report: &mut StageReport,
    ) -> PatchState {
        let name = self.target_name;
        if let Some(existing) = graph.find_target(name) {
            report.info(format!("Target {name} already exists ({existing}), nothing to do"));
            return PatchState::AlreadyExists(existing);
        }

        let request = NewTarget {
            name: name.to_string(),
            product_type: APP_EXTENSION_PRODUCT_TYPE.to_string(),
            bundle_id: self.bundle_id.clone(),
            host_target: self.host_target.map(str::to_string),
        };
        let handle = match graph.add_target(&request) {
            Ok(handle) => handle,
            Err(e) => {
                let error =
                    anyhow::Error::new(e).context(format!("Failed to create target {name}"));
                report.fail(format!("{error:#}"));
                return PatchState::Failed;
            }
        };
        report.info(format!("Created target {name} ({})", handle.id));
        if self.host_target.is_some() && handle.embedded_in.is_none() {
            report.warn(format!("{name} was not embedded into a host target"));
        }

        let Some((resolution, configurations)) =
            self.resolve_configurations(graph, &handle, report)
        else {
            report.fail(format!(
                "No configuration list found for {name}, build settings not applied"
            ));
            return PatchState::Failed;
        };

        let mut applied = 0;
        for configuration in &configurations {
            match graph.build_settings_mut(configuration) {
                Some(settings) => {
                    for (key, value) in &self.settings {
                        settings.insert(key.clone(), value.to_project_value());
                    }
                    applied += 1;
                }
                None => report.warn(format!(
                    "Configuration {configuration} is not a build configuration, skipped"
                )),
            }
        }
        report.info(format!(
            "Applied {} build setting(s) to {applied} configuration(s)",
            self.settings.len()
        ));
        if applied == 0 {
            report.skip(format!(
                "No build configuration of {name} received the build settings"
            ));
        }

        if !self.source_files.is_empty() {
            match graph.add_source_files(&handle.id, name, &self.source_files) {
                Ok(added) => report.info(format!("Registered {added} file(s) with {name}")),
                Err(e) => report.skip(format!("Source files not registered: {e}")),
            }
        }

        report.escalate(Outcome::Applied);
        PatchState::SettingsApplied {
            target: handle.id,
            resolution,
            configurations: applied,
        }
    }

    fn resolve_configurations<G: ProjectGraph + ?Sized>(
        &self,
        graph: &G,
        handle: &TargetHandle,
        report: &mut StageReport,
    ) -> Option<(Resolution, Vec<ObjectId>)> {
        if let Some(configurations) = handle
            .configuration_list
            .as_ref()
            .and_then(|list| graph.configuration_list(list))
        {
            debug!("Configuration list resolved from the creation handle");
            return Some((Resolution::Primary, configurations));
        }

        warn!(
            "Creation handle for {} has no usable configuration list, scanning targets",
            handle.name
        );
        let configurations = graph.target_table().into_iter().find_map(|entry| match entry {
            TableEntry::Target {
                name: Some(name),
                configuration_list: Some(list),
                ..
            } if name == self.target_name => graph.configuration_list(&list),
            _ => None,
        })?;
        report.warn(format!(
            "Configuration list of {} found by scanning the target table",
            self.target_name
        ));
        Some((Resolution::Fallback, configurations))
    }
}

/// Loads the project, patches it and writes it back when it changed.
pub struct PatchStage;

impl Stage for PatchStage {
    fn kind(&self) -> StageKind {
        StageKind::Patch
    }

    fn run(&self, context: &mut PipelineContext, report: &mut StageReport) -> anyhow::Result<()> {
        let path = context.layout.pbxproj_path();
        let mut project = ProjectDescriptor::load(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?;

        let files = if context.config.register_source_files {
            context
                .extension_entries
                .iter()
                .map(SourceFile::new)
                .collect()
        } else {
            Vec::new()
        };
        let host_target = Some(context.layout.host_target.as_str());
        let patcher = ProjectPatcher::new(&context.config, host_target).with_source_files(files);
        let state = patcher.patch(&mut project, report);

        if write_back(&project, &state, &path)? {
            context.written.push(path);
        }
        context.project = Some(project);
        Ok(())
    }
}

/// Saves `project` to `path` only when `state` holds changes.
pub(crate) fn write_back(
    project: &ProjectDescriptor,
    state: &PatchState,
    path: &Path,
) -> anyhow::Result<bool> {
    if !state.is_mutated() {
        return Ok(false);
    }
    project
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SettingValue;
    use crate::error::{Error, Result};
    use crate::project::{Dict, Value};
    use tempfile::TempDir;

    const FIXTURE: &str = include_str!("../../tests/fixtures/HelloWorld.pbxproj");

    fn fixture() -> ProjectDescriptor {
        ProjectDescriptor::parse(FIXTURE).unwrap()
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            host_bundle_id: "com.example.helloworld".to_string(),
            app_group: "group.com.example.helloworld".to_string(),
            ..PipelineConfig::default()
        }
    }

    /// Graph quirks layered over a real project.
    #[derive(Default)]
    struct Quirks {
        /// Creation handle carries no configuration list
        lossy_handle: bool,
        /// Target left out of the target table
        hidden_target: Option<&'static str>,
        /// Every configuration list resolves to no configurations
        empty_lists: bool,
        /// Every target creation is rejected
        read_only: bool,
    }

    struct QuirkyGraph {
        project: ProjectDescriptor,
        quirks: Quirks,
    }

    impl QuirkyGraph {
        fn new(project: ProjectDescriptor, quirks: Quirks) -> Self {
            Self { project, quirks }
        }
    }

    impl ProjectGraph for QuirkyGraph {
        fn find_target(&self, name: &str) -> Option<ObjectId> {
            self.project.find_target(name)
        }
        fn add_target(&mut self, request: &NewTarget) -> Result<TargetHandle> {
            if self.quirks.read_only {
                return Err(Error::GraphError("project is read-only".to_string()));
            }
            let mut handle = self.project.add_target(request)?;
            if self.quirks.lossy_handle {
                handle.configuration_list = None;
            }
            Ok(handle)
        }
        fn target_table(&self) -> Vec<TableEntry> {
            // Annotation rows first, so a scan that reads them would go wrong.
            let mut table = self.project.target_table();
            table.sort_by_key(|entry| matches!(entry, TableEntry::Target { .. }));
            if let Some(hidden) = self.quirks.hidden_target {
                table.retain(|entry| {
                    !matches!(entry, TableEntry::Target { name: Some(name), .. } if name == hidden)
                });
            }
            table
        }
        fn configuration_list(&self, id: &ObjectId) -> Option<Vec<ObjectId>> {
            if self.quirks.empty_lists {
                return Some(Vec::new());
            }
            self.project.configuration_list(id)
        }
        fn build_settings_mut(&mut self, configuration: &ObjectId) -> Option<&mut Dict> {
            self.project.build_settings_mut(configuration)
        }
        fn add_source_files(
            &mut self,
            target: &ObjectId,
            group_path: &str,
            files: &[SourceFile],
        ) -> Result<usize> {
            self.project.add_source_files(target, group_path, files)
        }
    }

    fn settings_of(project: &ProjectDescriptor, target: &str) -> Vec<Dict> {
        let list = project
            .native_target(target)
            .and_then(|node| node.reference("buildConfigurationList"))
            .unwrap();
        project
            .configuration_list(&list)
            .unwrap()
            .iter()
            .map(|id| {
                project.node(id).unwrap().fields["buildSettings"]
                    .as_dict()
                    .unwrap()
                    .clone()
            })
            .collect()
    }

    #[test]
    fn test_creates_target_and_applies_settings() {
        let config = config();
        let mut project = fixture();
        let mut report = StageReport::new(StageKind::Patch);

        let patcher = ProjectPatcher::new(&config, Some("HelloWorld"));
        let state = patcher.patch(&mut project, &mut report);

        assert!(matches!(
            state,
            PatchState::SettingsApplied {
                resolution: Resolution::Primary,
                configurations: 2,
                ..
            }
        ));
        assert_eq!(report.outcome, Outcome::Applied);
        for settings in settings_of(&project, "HomeWidget") {
            assert_eq!(
                settings["PRODUCT_BUNDLE_IDENTIFIER"],
                Value::from("com.example.helloworld.widget")
            );
            assert_eq!(
                settings["CODE_SIGN_ENTITLEMENTS"],
                Value::from("HomeWidget/HomeWidget.entitlements")
            );
        }
    }

    #[test]
    fn test_existing_target_is_a_no_op() {
        let config = config();
        let mut project = fixture();
        let patcher = ProjectPatcher::new(&config, Some("HelloWorld"));
        patcher.patch(&mut project, &mut StageReport::new(StageKind::Patch));
        let after_first = project.to_pbxproj();

        let mut report = StageReport::new(StageKind::Patch);
        let state = patcher.patch(&mut project, &mut report);

        assert!(matches!(state, PatchState::AlreadyExists(_)));
        assert!(!state.is_mutated());
        assert_eq!(report.outcome, Outcome::NoOp);
        assert_eq!(project.to_pbxproj(), after_first);
    }

    #[test]
    fn test_fallback_applies_the_same_settings() {
        let config = config();
        let patcher = ProjectPatcher::new(&config, Some("HelloWorld"));

        let mut primary = fixture();
        patcher.patch(&mut primary, &mut StageReport::new(StageKind::Patch));

        let quirks = Quirks {
            lossy_handle: true,
            ..Quirks::default()
        };
        let mut lossy = QuirkyGraph::new(fixture(), quirks);
        let mut report = StageReport::new(StageKind::Patch);
        let state = patcher.patch(&mut lossy, &mut report);

        assert!(matches!(
            state,
            PatchState::SettingsApplied {
                resolution: Resolution::Fallback,
                configurations: 2,
                ..
            }
        ));
        assert_eq!(report.outcome, Outcome::Applied);
        assert_eq!(
            settings_of(&lossy.project, "HomeWidget"),
            settings_of(&primary, "HomeWidget")
        );
    }

    #[test]
    fn test_rejected_creation_is_a_soft_failure() {
        let config = config();
        let quirks = Quirks {
            read_only: true,
            ..Quirks::default()
        };
        let mut graph = QuirkyGraph::new(fixture(), quirks);
        let before = graph.project.to_pbxproj();
        let mut report = StageReport::new(StageKind::Patch);

        let patcher = ProjectPatcher::new(&config, Some("HelloWorld"));
        let state = patcher.patch(&mut graph, &mut report);

        assert_eq!(state, PatchState::Failed);
        assert!(report.is_failure());
        assert!(report.diagnostics[0].message.contains("project is read-only"));
        assert_eq!(graph.project.to_pbxproj(), before);
    }

    #[test]
    fn test_unresolved_configuration_list_leaves_the_file_alone() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("project.pbxproj");
        std::fs::write(&path, FIXTURE).unwrap();
        let config = config();
        let quirks = Quirks {
            lossy_handle: true,
            hidden_target: Some("HomeWidget"),
            ..Quirks::default()
        };
        let mut graph = QuirkyGraph::new(ProjectDescriptor::load(&path).unwrap(), quirks);
        let mut report = StageReport::new(StageKind::Patch);

        let state = ProjectPatcher::new(&config, Some("HelloWorld")).patch(&mut graph, &mut report);

        assert_eq!(state, PatchState::Failed);
        assert!(!state.is_mutated());
        assert_eq!(report.outcome, Outcome::SoftFailure);
        assert!(report.diagnostics.iter().any(|d| {
            d.message == "No configuration list found for HomeWidget, build settings not applied"
        }));
        // only the defaults written at creation
        for settings in settings_of(&graph.project, "HomeWidget") {
            assert_eq!(settings.len(), 4);
            assert!(!settings.contains_key("CODE_SIGN_ENTITLEMENTS"));
            assert!(!settings.contains_key("DEVELOPMENT_TEAM"));
            assert!(!settings.contains_key("IPHONEOS_DEPLOYMENT_TARGET"));
        }

        assert!(!write_back(&graph.project, &state, &path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), FIXTURE);
    }

    #[test]
    fn test_empty_configuration_list_is_a_soft_skip() {
        let config = config();
        let quirks = Quirks {
            empty_lists: true,
            ..Quirks::default()
        };
        let mut graph = QuirkyGraph::new(fixture(), quirks);
        let mut report = StageReport::new(StageKind::Patch);

        let state = ProjectPatcher::new(&config, Some("HelloWorld")).patch(&mut graph, &mut report);

        assert!(matches!(
            state,
            PatchState::SettingsApplied {
                configurations: 0,
                ..
            }
        ));
        assert_eq!(report.outcome, Outcome::SoftSkip);
        assert!(report.diagnostics.iter().any(|d| {
            d.message == "No build configuration of HomeWidget received the build settings"
        }));
    }

    #[test]
    fn test_write_back_saves_a_mutated_project() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("project.pbxproj");
        std::fs::write(&path, FIXTURE).unwrap();
        let config = config();
        let mut project = ProjectDescriptor::load(&path).unwrap();

        let state = ProjectPatcher::new(&config, Some("HelloWorld"))
            .patch(&mut project, &mut StageReport::new(StageKind::Patch));

        assert!(write_back(&project, &state, &path).unwrap());
        let reloaded = ProjectDescriptor::load(&path).unwrap();
        assert!(reloaded.find_target("HomeWidget").is_some());
    }

    #[test]
    fn test_overrides_reach_every_configuration() {
        let mut config = config();
        config
            .build_settings
            .insert("SWIFT_VERSION".to_string(), Some(SettingValue::text("6.0")));
        config.build_settings.insert("SKIP_INSTALL".to_string(), None);
        let mut project = fixture();

        ProjectPatcher::new(&config, Some("HelloWorld"))
            .patch(&mut project, &mut StageReport::new(StageKind::Patch));

        for settings in settings_of(&project, "HomeWidget") {
            assert_eq!(settings["SWIFT_VERSION"], Value::from("6.0"));
            // created with the target, not part of the table anymore
            assert_eq!(settings["SKIP_INSTALL"], Value::from("YES"));
        }
    }

    #[test]
    fn test_registers_source_files() {
        let config = config();
        let mut project = fixture();
        let patcher = ProjectPatcher::new(&config, Some("HelloWorld")).with_source_files(vec![
            SourceFile::new("HomeWidget.swift"),
            SourceFile::new("Assets.xcassets"),
            SourceFile::new("Info.plist"),
        ]);
        let mut report = StageReport::new(StageKind::Patch);

        patcher.patch(&mut project, &mut report);

        assert_eq!(report.outcome, Outcome::Applied);
        assert!(
            report
                .diagnostics
                .iter()
                .any(|d| d.message == "Registered 3 file(s) with HomeWidget")
        );
        let written = project.to_pbxproj();
        assert!(written.contains("HomeWidget.swift in Sources"));
        assert!(written.contains("Assets.xcassets in Resources"));
    }
}
