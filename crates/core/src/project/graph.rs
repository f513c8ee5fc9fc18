//! Graph operations the patcher needs, behind a trait
//!
//! `ProjectDescriptor` is the real implementation. Tests wrap it to simulate
//! a graph library that loses references or rejects operations.

use super::ids::ObjectId;
use super::model::{Node, NodeKind, ProjectDescriptor};
use super::value::{Dict, Value};
use crate::error::{Error, Result};
use crate::pbx_dict;
use std::path::Path;
use tracing::{debug, warn};

pub const APP_EXTENSION_PRODUCT_TYPE: &str = "com.apple.product-type.app-extension";

/// `dstSubfolderSpec` of the "Embed Foundation Extensions" phase (PlugIns).
const PLUGINS_SUBFOLDER_SPEC: &str = "13";
const EMBED_PHASE_NAME: &str = "Embed Foundation Extensions";
const BUILD_ACTION_MASK: &str = "2147483647";

/// Request to create a new native target
#[derive(Debug, Clone)]
pub struct NewTarget {
    pub name: String,
    pub product_type: String,
    pub bundle_id: String,
    /// Target that embeds the new product, if any
    pub host_target: Option<String>,
}

/// What target creation hands back to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetHandle {
    pub id: ObjectId,
    pub name: String,
    pub configuration_list: Option<ObjectId>,
    /// Host target the product was embedded into
    pub embedded_in: Option<ObjectId>,
}

/// One row of the target table. Annotation rows mirror the comments that sit
/// next to each object in the file; scans must skip them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEntry {
    Target {
        id: ObjectId,
        name: Option<String>,
        configuration_list: Option<ObjectId>,
    },
    Annotation {
        id: ObjectId,
        text: String,
    },
}

/// A source file to register with a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the target's group
    pub path: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    fn file_type(&self) -> &'static str {
        let extension = Path::new(&self.path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        match extension {
            "swift" => "sourcecode.swift",
            "m" => "sourcecode.c.objc",
            "mm" => "sourcecode.cpp.objcpp",
            "h" => "sourcecode.c.h",
            "plist" => "text.plist.xml",
            "entitlements" => "text.plist.entitlements",
            "xcassets" => "folder.assetcatalog",
            "intentdefinition" => "file.intentdefinition",
            _ => "text",
        }
    }

    fn phase(&self) -> Option<NodeKind> {
        match self.file_type() {
            "sourcecode.swift" | "sourcecode.c.objc" | "sourcecode.cpp.objcpp" => {
                Some(NodeKind::SourcesBuildPhase)
            }
            "folder.assetcatalog" => Some(NodeKind::ResourcesBuildPhase),
            _ => None,
        }
    }
}

/// Abstract project graph
pub trait ProjectGraph {
    /// Id of the native target with exactly this name.
    fn find_target(&self, name: &str) -> Option<ObjectId>;

    /// Create a native target with its configuration list and build phases.
    fn add_target(&mut self, request: &NewTarget) -> Result<TargetHandle>;

    /// Every native target, each followed by its annotation row if it has one.
    fn target_table(&self) -> Vec<TableEntry>;

    /// Build configurations listed by a configuration list, or `None` if the
    /// id does not resolve to a configuration list.
    fn configuration_list(&self, id: &ObjectId) -> Option<Vec<ObjectId>>;

    /// Settings of a build configuration, created empty if missing.
    fn build_settings_mut(&mut self, configuration: &ObjectId) -> Option<&mut Dict>;

    /// Register files in a group named after `group_path` and in the
    /// target's build phases. Returns how many files were newly added.
    fn add_source_files(
        &mut self,
        target: &ObjectId,
        group_path: &str,
        files: &[SourceFile],
    ) -> Result<usize>;
}

impl ProjectDescriptor {
    fn configuration_names(&self) -> Vec<String> {
        let names: Vec<String> = self
            .root_project()
            .and_then(|project| project.reference("buildConfigurationList"))
            .and_then(|list| self.node(&list))
            .map(|list| list.references("buildConfigurations"))
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.node(id))
            .filter_map(|config| config.name().map(str::to_string))
            .collect();
        if names.is_empty() {
            vec!["Debug".to_string(), "Release".to_string()]
        } else {
            names
        }
    }

    fn phase_of(&self, target: &Node, kind: &NodeKind) -> Option<ObjectId> {
        target
            .references("buildPhases")
            .into_iter()
            .find(|phase| self.node(phase).is_some_and(|node| &node.kind == kind))
    }

    fn new_phase(&mut self, seed: &str, kind: NodeKind) -> ObjectId {
        self.insert_node(
            seed,
            kind,
            pbx_dict! {
                "buildActionMask" => BUILD_ACTION_MASK,
                "files" => Vec::<Value>::new(),
                "runOnlyForDeploymentPostprocessing" => "0",
            },
        )
    }

    fn push_to(&mut self, owner: &ObjectId, key: &str, id: &ObjectId) -> Result<()> {
        let node = self
            .node_mut(owner)
            .ok_or_else(|| Error::graph(format!("object {owner} disappeared from the graph")))?;
        node.push_reference(key, id);
        Ok(())
    }

    fn embed_product(
        &mut self,
        host: &ObjectId,
        target: &ObjectId,
        product: &ObjectId,
        name: &str,
    ) -> Result<()> {
        let seed = format!("{name}/embed");
        let build_file = self.insert_node(
            &format!("{seed}/build-file"),
            NodeKind::BuildFile,
            pbx_dict! {
                "fileRef" => product.as_str(),
                "settings" => pbx_dict! {
                    "ATTRIBUTES" => vec![Value::from("RemoveHeadersOnCopy")],
                },
            },
        );

        let host_node = self
            .node(host)
            .ok_or_else(|| Error::graph(format!("host target {host} not found")))?;
        let existing_phase = host_node
            .references("buildPhases")
            .into_iter()
            .find(|phase| {
                self.node(phase).is_some_and(|node| {
                    node.kind == NodeKind::CopyFilesBuildPhase
                        && node.str_field("dstSubfolderSpec") == Some(PLUGINS_SUBFOLDER_SPEC)
                })
            });
        let phase = match existing_phase {
            Some(phase) => phase,
            None => {
                let phase = self.insert_node(
                    &format!("{seed}/phase"),
                    NodeKind::CopyFilesBuildPhase,
                    pbx_dict! {
                        "buildActionMask" => BUILD_ACTION_MASK,
                        "dstPath" => "",
                        "dstSubfolderSpec" => PLUGINS_SUBFOLDER_SPEC,
                        "files" => Vec::<Value>::new(),
                        "name" => EMBED_PHASE_NAME,
                        "runOnlyForDeploymentPostprocessing" => "0",
                    },
                );
                self.push_to(host, "buildPhases", &phase)?;
                phase
            }
        };
        self.push_to(&phase, "files", &build_file)?;

        let root = self.root_object().clone();
        let proxy = self.insert_node(
            &format!("{seed}/proxy"),
            NodeKind::ContainerItemProxy,
            pbx_dict! {
                "containerPortal" => root.as_str(),
                "proxyType" => "1",
                "remoteGlobalIDString" => target.as_str(),
                "remoteInfo" => name,
            },
        );
        let dependency = self.insert_node(
            &format!("{seed}/dependency"),
            NodeKind::TargetDependency,
            pbx_dict! {
                "target" => target.as_str(),
                "targetProxy" => proxy.as_str(),
            },
        );
        self.push_to(host, "dependencies", &dependency)
    }

    fn register_target_attributes(&mut self, target: &ObjectId) {
        let root = self.root_object().clone();
        let Some(project) = self.node_mut(&root) else {
            return;
        };
        let Some(attributes) = project
            .fields
            .get_mut("attributes")
            .and_then(Value::as_dict_mut)
        else {
            return;
        };
        let target_attributes = attributes
            .entry("TargetAttributes".to_string())
            .or_insert_with(|| Value::Dict(Dict::new()));
        if let Some(table) = target_attributes.as_dict_mut() {
            table.insert(
                target.as_str().to_string(),
                Value::Dict(pbx_dict! { "CreatedOnToolsVersion" => "15.0" }),
            );
        }
    }

    fn find_child_group(&self, parent: &ObjectId, path: &str) -> Option<ObjectId> {
        self.node(parent)?
            .references("children")
            .into_iter()
            .find(|child| {
                self.node(child).is_some_and(|node| {
                    node.kind == NodeKind::Group
                        && (node.str_field("path") == Some(path) || node.name() == Some(path))
                })
            })
    }
}

impl ProjectGraph for ProjectDescriptor {
    fn find_target(&self, name: &str) -> Option<ObjectId> {
        self.native_target(name).map(|node| node.id.clone())
    }

    fn add_target(&mut self, request: &NewTarget) -> Result<TargetHandle> {
        if request.name.trim().is_empty() {
            return Err(Error::graph("target name must not be empty"));
        }
        if self.find_target(&request.name).is_some() {
            return Err(Error::graph(format!(
                "a target named {} already exists",
                request.name
            )));
        }
        let project = self.root_project().ok_or_else(|| {
            Error::graph(format!(
                "root object {} is not a PBXProject",
                self.root_object()
            ))
        })?;
        let products_group = project.reference("productRefGroup");
        let host = match &request.host_target {
            Some(host_name) => {
                let host = self.find_target(host_name);
                if host.is_none() {
                    warn!(
                        "Host target {} not found, {} will not be embedded",
                        host_name, request.name
                    );
                }
                host
            }
            None => None,
        };

        // Validation is done; everything below only adds to the graph.
        let name = request.name.as_str();
        let configurations: Vec<ObjectId> = self
            .configuration_names()
            .iter()
            .map(|config_name| {
                self.insert_node(
                    &format!("{name}/configuration/{config_name}"),
                    NodeKind::BuildConfiguration,
                    pbx_dict! {
                        "buildSettings" => pbx_dict! {
                            "INFOPLIST_FILE" => format!("{name}/Info.plist"),
                            "PRODUCT_BUNDLE_IDENTIFIER" => request.bundle_id.as_str(),
                            "PRODUCT_NAME" => "$(TARGET_NAME)",
                            "SKIP_INSTALL" => "YES",
                        },
                        "name" => config_name.as_str(),
                    },
                )
            })
            .collect();

        let list = self.insert_node(
            &format!("{name}/configuration-list"),
            NodeKind::ConfigurationList,
            pbx_dict! {
                "buildConfigurations" => configurations
                    .iter()
                    .map(|id| Value::from(id.as_str()))
                    .collect::<Vec<_>>(),
                "defaultConfigurationIsVisible" => "0",
                "defaultConfigurationName" => "Release",
            },
        );

        let product = self.insert_node(
            &format!("{name}/product"),
            NodeKind::FileReference,
            pbx_dict! {
                "explicitFileType" => "wrapper.app-extension",
                "includeInIndex" => "0",
                "path" => format!("{name}.appex"),
                "sourceTree" => "BUILT_PRODUCTS_DIR",
            },
        );
        if let Some(group) = &products_group {
            self.push_to(group, "children", &product)?;
        }

        let phases = vec![
            self.new_phase(&format!("{name}/sources"), NodeKind::SourcesBuildPhase),
            self.new_phase(&format!("{name}/frameworks"), NodeKind::FrameworksBuildPhase),
            self.new_phase(&format!("{name}/resources"), NodeKind::ResourcesBuildPhase),
        ];

        let target = self.insert_node(
            &format!("{name}/target"),
            NodeKind::NativeTarget,
            pbx_dict! {
                "buildConfigurationList" => list.as_str(),
                "buildPhases" => phases
                    .iter()
                    .map(|id| Value::from(id.as_str()))
                    .collect::<Vec<_>>(),
                "buildRules" => Vec::<Value>::new(),
                "dependencies" => Vec::<Value>::new(),
                "name" => name,
                "productName" => name,
                "productReference" => product.as_str(),
                "productType" => request.product_type.as_str(),
            },
        );

        let root = self.root_object().clone();
        self.push_to(&root, "targets", &target)?;
        self.register_target_attributes(&target);

        let embedded_in = match host {
            Some(host) => {
                self.embed_product(&host, &target, &product, name)?;
                Some(host)
            }
            None => None,
        };

        debug!("Created target {} ({})", name, target);
        Ok(TargetHandle {
            id: target,
            name: name.to_string(),
            configuration_list: Some(list),
            embedded_in,
        })
    }

    fn target_table(&self) -> Vec<TableEntry> {
        let mut table = Vec::new();
        for node in self.nodes_of_kind(NodeKind::NativeTarget) {
            table.push(TableEntry::Target {
                id: node.id.clone(),
                name: node.name().map(str::to_string),
                configuration_list: node.reference("buildConfigurationList"),
            });
            if let Some(text) = self.annotation(&node.id) {
                table.push(TableEntry::Annotation {
                    id: node.id.clone(),
                    text,
                });
            }
        }
        table
    }

    fn configuration_list(&self, id: &ObjectId) -> Option<Vec<ObjectId>> {
        self.node(id)
            .filter(|node| node.kind == NodeKind::ConfigurationList)
            .map(|node| node.references("buildConfigurations"))
    }

    fn build_settings_mut(&mut self, configuration: &ObjectId) -> Option<&mut Dict> {
        let node = self
            .node_mut(configuration)
            .filter(|node| node.kind == NodeKind::BuildConfiguration)?;
        let settings = node
            .fields
            .entry("buildSettings".to_string())
            .or_insert_with(|| Value::Dict(Dict::new()));
        if !matches!(settings, Value::Dict(_)) {
            *settings = Value::Dict(Dict::new());
        }
        settings.as_dict_mut()
    }

    fn add_source_files(
        &mut self,
        target: &ObjectId,
        group_path: &str,
        files: &[SourceFile],
    ) -> Result<usize> {
        if !self
            .node(target)
            .is_some_and(|node| node.kind == NodeKind::NativeTarget)
        {
            return Err(Error::graph(format!("target {target} not found")));
        }
        let main_group = self
            .root_project()
            .and_then(|project| project.reference("mainGroup"))
            .ok_or_else(|| Error::graph("project has no main group"))?;

        let group = match self.find_child_group(&main_group, group_path) {
            Some(group) => group,
            None => {
                let group = self.insert_node(
                    &format!("{group_path}/group"),
                    NodeKind::Group,
                    pbx_dict! {
                        "children" => Vec::<Value>::new(),
                        "path" => group_path,
                        "sourceTree" => "<group>",
                    },
                );
                self.push_to(&main_group, "children", &group)?;
                group
            }
        };

        let existing: Vec<String> = self
            .node(&group)
            .map(|node| node.references("children"))
            .unwrap_or_default()
            .iter()
            .filter_map(|child| self.node(child))
            .filter_map(|child| child.str_field("path").map(str::to_string))
            .collect();

        let mut added = 0;
        for file in files {
            if existing.contains(&file.path) {
                debug!("{} already registered in group {}", file.path, group_path);
                continue;
            }
            let file_ref = self.insert_node(
                &format!("{group_path}/file/{}", file.path),
                NodeKind::FileReference,
                pbx_dict! {
                    "lastKnownFileType" => file.file_type(),
                    "path" => file.path.as_str(),
                    "sourceTree" => "<group>",
                },
            );
            self.push_to(&group, "children", &file_ref)?;

            if let Some(kind) = file.phase() {
                let existing_phase = self
                    .node(target)
                    .and_then(|node| self.phase_of(node, &kind));
                let phase = match existing_phase {
                    Some(phase) => phase,
                    None => {
                        let phase = self.new_phase(&format!("{group_path}/phase/{kind}"), kind);
                        self.push_to(target, "buildPhases", &phase)?;
                        phase
                    }
                };
                let build_file = self.insert_node(
                    &format!("{group_path}/build-file/{}", file.path),
                    NodeKind::BuildFile,
                    pbx_dict! { "fileRef" => file_ref.as_str() },
                );
                self.push_to(&phase, "files", &build_file)?;
            }
            added += 1;
        }
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../../tests/fixtures/HelloWorld.pbxproj");

    fn widget_request() -> NewTarget {
        NewTarget {
            name: "HomeWidget".to_string(),
            product_type: APP_EXTENSION_PRODUCT_TYPE.to_string(),
            bundle_id: "com.example.helloworld.widget".to_string(),
            host_target: Some("HelloWorld".to_string()),
        }
    }

    #[test]
    fn test_add_target_builds_complete_subgraph() {
        let mut project = ProjectDescriptor::parse(FIXTURE).unwrap();
        let handle = project.add_target(&widget_request()).unwrap();

        assert_eq!(project.find_target("HomeWidget"), Some(handle.id.clone()));
        let list = handle.configuration_list.clone().unwrap();
        let configurations = project.configuration_list(&list).unwrap();
        let names: Vec<_> = configurations
            .iter()
            .filter_map(|id| project.node(id))
            .filter_map(|node| node.name())
            .collect();
        assert_eq!(names, vec!["Debug", "Release"]);

        let target = project.node(&handle.id).unwrap();
        assert_eq!(target.str_field("productType"), Some(APP_EXTENSION_PRODUCT_TYPE));
        assert_eq!(target.references("buildPhases").len(), 3);

        let root = project.root_project().unwrap();
        assert!(root.references("targets").contains(&handle.id));
    }

    #[test]
    fn test_add_target_embeds_into_host() {
        let mut project = ProjectDescriptor::parse(FIXTURE).unwrap();
        let handle = project.add_target(&widget_request()).unwrap();
        let host = project.find_target("HelloWorld").unwrap();
        assert_eq!(handle.embedded_in, Some(host.clone()));

        let host_node = project.node(&host).unwrap();
        assert_eq!(host_node.references("dependencies").len(), 1);
        let written = project.to_pbxproj();
        assert!(written.contains("name = \"Embed Foundation Extensions\";"));
        assert!(written.contains("/* HomeWidget.appex in Embed Foundation Extensions */"));
        assert!(written.contains(&format!("remoteGlobalIDString = {};", handle.id)));
    }

    #[test]
    fn test_add_target_without_root_project_fails_cleanly() {
        let broken = FIXTURE.replace(
            "rootObject = 83CBB9F71A601CBA00E9B192 /* Project object */;",
            "rootObject = 13B07F861A680F5B00A75B9A /* HelloWorld */;",
        );
        let mut project = ProjectDescriptor::parse(&broken).unwrap();
        let before = project.len();

        let result = project.add_target(&widget_request());
        assert!(matches!(result, Err(Error::GraphError(_))));
        assert_eq!(project.len(), before);
    }

    #[test]
    fn test_add_target_rejects_duplicates() {
        let mut project = ProjectDescriptor::parse(FIXTURE).unwrap();
        project.add_target(&widget_request()).unwrap();
        assert!(project.add_target(&widget_request()).is_err());
    }

    #[test]
    fn test_target_table_interleaves_annotations() {
        let project = ProjectDescriptor::parse(FIXTURE).unwrap();
        let table = project.target_table();
        assert_eq!(table.len(), 2);
        assert!(matches!(
            &table[0],
            TableEntry::Target { name: Some(name), .. } if name == "HelloWorld"
        ));
        assert!(matches!(&table[1], TableEntry::Annotation { text, .. } if text == "HelloWorld"));
    }

    #[test]
    fn test_build_settings_created_lazily() {
        let mut project = ProjectDescriptor::parse(FIXTURE).unwrap();
        let config = project.insert_node(
            "test/bare-config",
            NodeKind::BuildConfiguration,
            pbx_dict! { "name" => "Debug" },
        );
        let settings = project.build_settings_mut(&config).unwrap();
        assert!(settings.is_empty());
        settings.insert("SWIFT_VERSION".to_string(), Value::from("5.0"));

        let node = project.node(&config).unwrap();
        assert!(node.fields["buildSettings"].as_dict().unwrap().contains_key("SWIFT_VERSION"));
    }

    #[test]
    fn test_build_settings_only_for_configurations() {
        let mut project = ProjectDescriptor::parse(FIXTURE).unwrap();
        let target = project.find_target("HelloWorld").unwrap();
        assert!(project.build_settings_mut(&target).is_none());
    }

    #[test]
    fn test_add_source_files_registers_group_and_phases() {
        let mut project = ProjectDescriptor::parse(FIXTURE).unwrap();
        let handle = project.add_target(&widget_request()).unwrap();
        let files = vec![
            SourceFile::new("HomeWidget.swift"),
            SourceFile::new("Assets.xcassets"),
            SourceFile::new("Info.plist"),
        ];

        let added = project.add_source_files(&handle.id, "HomeWidget", &files).unwrap();
        assert_eq!(added, 3);

        let written = project.to_pbxproj();
        assert!(written.contains("/* HomeWidget.swift in Sources */"));
        assert!(written.contains("/* Assets.xcassets in Resources */"));
        assert!(!written.contains("/* Info.plist in"));

        let again = project.add_source_files(&handle.id, "HomeWidget", &files).unwrap();
        assert_eq!(again, 0);
    }
}
