//! Typed view over the object graph of a project descriptor

use super::ids::{IdGenerator, ObjectId};
use super::parser::parse_document;
use super::value::{Dict, Value};
use super::writer;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// The `isa` of an object, with the kinds the pipeline works with spelled out
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Project,
    NativeTarget,
    BuildConfiguration,
    ConfigurationList,
    Group,
    FileReference,
    BuildFile,
    SourcesBuildPhase,
    FrameworksBuildPhase,
    ResourcesBuildPhase,
    CopyFilesBuildPhase,
    ShellScriptBuildPhase,
    TargetDependency,
    ContainerItemProxy,
    Other(String),
}

impl NodeKind {
    pub fn from_isa(isa: &str) -> Self {
        match isa {
            "PBXProject" => NodeKind::Project,
            "PBXNativeTarget" => NodeKind::NativeTarget,
            "XCBuildConfiguration" => NodeKind::BuildConfiguration,
            "XCConfigurationList" => NodeKind::ConfigurationList,
            "PBXGroup" => NodeKind::Group,
            "PBXFileReference" => NodeKind::FileReference,
            "PBXBuildFile" => NodeKind::BuildFile,
            "PBXSourcesBuildPhase" => NodeKind::SourcesBuildPhase,
            "PBXFrameworksBuildPhase" => NodeKind::FrameworksBuildPhase,
            "PBXResourcesBuildPhase" => NodeKind::ResourcesBuildPhase,
            "PBXCopyFilesBuildPhase" => NodeKind::CopyFilesBuildPhase,
            "PBXShellScriptBuildPhase" => NodeKind::ShellScriptBuildPhase,
            "PBXTargetDependency" => NodeKind::TargetDependency,
            "PBXContainerItemProxy" => NodeKind::ContainerItemProxy,
            other => NodeKind::Other(other.to_string()),
        }
    }

    pub fn isa(&self) -> &str {
        match self {
            NodeKind::Project => "PBXProject",
            NodeKind::NativeTarget => "PBXNativeTarget",
            NodeKind::BuildConfiguration => "XCBuildConfiguration",
            NodeKind::ConfigurationList => "XCConfigurationList",
            NodeKind::Group => "PBXGroup",
            NodeKind::FileReference => "PBXFileReference",
            NodeKind::BuildFile => "PBXBuildFile",
            NodeKind::SourcesBuildPhase => "PBXSourcesBuildPhase",
            NodeKind::FrameworksBuildPhase => "PBXFrameworksBuildPhase",
            NodeKind::ResourcesBuildPhase => "PBXResourcesBuildPhase",
            NodeKind::CopyFilesBuildPhase => "PBXCopyFilesBuildPhase",
            NodeKind::ShellScriptBuildPhase => "PBXShellScriptBuildPhase",
            NodeKind::TargetDependency => "PBXTargetDependency",
            NodeKind::ContainerItemProxy => "PBXContainerItemProxy",
            NodeKind::Other(isa) => isa,
        }
    }

    pub fn is_build_phase(&self) -> bool {
        matches!(
            self,
            NodeKind::SourcesBuildPhase
                | NodeKind::FrameworksBuildPhase
                | NodeKind::ResourcesBuildPhase
                | NodeKind::CopyFilesBuildPhase
                | NodeKind::ShellScriptBuildPhase
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.isa())
    }
}

/// One object of the graph. `fields` holds every key, `isa` included, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: ObjectId,
    pub kind: NodeKind,
    pub fields: Dict,
}

impl Node {
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    /// A field holding a reference to another object.
    pub fn reference(&self, key: &str) -> Option<ObjectId> {
        self.str_field(key).map(ObjectId::from)
    }

    /// A field holding a list of references.
    pub fn references(&self, key: &str) -> Vec<ObjectId> {
        self.fields
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ObjectId::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append a reference to a list field, creating the list if needed.
    pub fn push_reference(&mut self, key: &str, id: &ObjectId) {
        let entry = self
            .fields
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !matches!(entry, Value::Array(_)) {
            *entry = Value::Array(Vec::new());
        }
        if let Value::Array(items) = entry {
            items.push(Value::from(id.as_str()));
        }
    }
}

/// In-memory project descriptor: top-level keys plus the typed object table
#[derive(Debug, Clone)]
pub struct ProjectDescriptor {
    /// Top-level entries in file order. `objects` is kept as an empty
    /// placeholder so its position is remembered.
    top_level: Dict,
    objects: IndexMap<ObjectId, Node>,
    root_object: ObjectId,
    annotations: HashMap<ObjectId, String>,
    ids: IdGenerator,
}

impl ProjectDescriptor {
    pub fn parse(source: &str) -> Result<Self> {
        let document = parse_document(source)?;
        let mut top_level = document.root;

        let root_object = top_level
            .get("rootObject")
            .and_then(Value::as_str)
            .map(ObjectId::from)
            .ok_or_else(|| Error::parse(1, "missing rootObject"))?;

        let raw_objects = match top_level.get_mut("objects") {
            Some(Value::Dict(objects)) => std::mem::take(objects),
            _ => return Err(Error::parse(1, "missing objects table")),
        };

        let mut objects = IndexMap::with_capacity(raw_objects.len());
        for (key, value) in raw_objects {
            let Value::Dict(fields) = value else {
                return Err(Error::parse(1, format!("object {key} is not a dictionary")));
            };
            let isa = fields
                .get("isa")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::parse(1, format!("object {key} has no isa")))?;
            let id = ObjectId::new(key);
            let node = Node {
                id: id.clone(),
                kind: NodeKind::from_isa(isa),
                fields,
            };
            objects.insert(id, node);
        }

        let annotations = document
            .annotations
            .into_iter()
            .map(|(token, text)| (ObjectId::new(token), text))
            .filter(|(id, _)| objects.contains_key(id))
            .collect();

        debug!(
            "Parsed project descriptor with {} objects, root {}",
            objects.len(),
            root_object
        );

        let ids = IdGenerator::new(objects.keys());
        Ok(Self {
            top_level,
            objects,
            root_object,
            annotations,
            ids,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_pbxproj())?;
        Ok(())
    }

    /// Serialize in Xcode's own layout.
    pub fn to_pbxproj(&self) -> String {
        writer::write_project(self)
    }

    pub fn top_level(&self) -> &Dict {
        &self.top_level
    }

    pub fn root_object(&self) -> &ObjectId {
        &self.root_object
    }

    pub fn objects(&self) -> impl Iterator<Item = &Node> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn node(&self, id: &ObjectId) -> Option<&Node> {
        self.objects.get(id)
    }

    pub fn node_mut(&mut self, id: &ObjectId) -> Option<&mut Node> {
        self.objects.get_mut(id)
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.objects.values().filter(move |node| node.kind == kind)
    }

    pub fn root_project(&self) -> Option<&Node> {
        self.node(&self.root_object)
            .filter(|node| node.kind == NodeKind::Project)
    }

    pub fn native_target(&self, name: &str) -> Option<&Node> {
        self.nodes_of_kind(NodeKind::NativeTarget)
            .find(|node| node.name() == Some(name))
    }

    /// Insert a new object. `seed` makes the generated id reproducible.
    pub fn insert_node(&mut self, seed: &str, kind: NodeKind, mut fields: Dict) -> ObjectId {
        let id = self.ids.generate(seed);
        fields.shift_insert(0, "isa".to_string(), Value::from(kind.isa()));
        self.objects.insert(
            id.clone(),
            Node {
                id: id.clone(),
                kind,
                fields,
            },
        );
        id
    }

    /// The annotation Xcode would print after a reference to `id`.
    pub fn annotation(&self, id: &ObjectId) -> Option<String> {
        if let Some(text) = self.annotations.get(id) {
            return Some(text.clone());
        }
        let node = self.node(id)?;
        match &node.kind {
            NodeKind::Project => Some("Project object".to_string()),
            NodeKind::BuildFile => {
                let file = node
                    .reference("fileRef")
                    .and_then(|file| self.annotation(&file))?;
                let phase = self.phase_containing(id)?;
                Some(format!("{file} in {}", self.phase_title(phase)))
            }
            NodeKind::ConfigurationList => {
                let owner = self.objects.values().find(|candidate| {
                    candidate.reference("buildConfigurationList").as_ref() == Some(id)
                })?;
                let owner_name = owner.name().unwrap_or("Project object");
                Some(format!(
                    "Build configuration list for {} \"{owner_name}\"",
                    owner.kind
                ))
            }
            kind if kind.is_build_phase() => Some(self.phase_title(node)),
            NodeKind::TargetDependency | NodeKind::ContainerItemProxy => {
                Some(node.kind.isa().to_string())
            }
            _ => node
                .name()
                .or_else(|| node.str_field("path"))
                .map(str::to_string),
        }
    }

    fn phase_containing(&self, build_file: &ObjectId) -> Option<&Node> {
        self.objects.values().find(|node| {
            node.kind.is_build_phase() && node.references("files").contains(build_file)
        })
    }

    fn phase_title(&self, phase: &Node) -> String {
        if let Some(name) = phase.name() {
            return name.to_string();
        }
        match phase.kind {
            NodeKind::SourcesBuildPhase => "Sources",
            NodeKind::FrameworksBuildPhase => "Frameworks",
            NodeKind::ResourcesBuildPhase => "Resources",
            NodeKind::CopyFilesBuildPhase => "CopyFiles",
            _ => "ShellScript",
        }
        .to_string()
    }
}
