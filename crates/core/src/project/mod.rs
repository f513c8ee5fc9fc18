//! Xcode project descriptor (`project.pbxproj`)
//!
//! The text format is read into a [`Value`] tree by the parser, lifted into
//! a typed [`ProjectDescriptor`], mutated through the [`ProjectGraph`]
//! trait, and written back by the writer in Xcode's layout.

pub mod graph;
pub mod ids;
pub mod model;
pub mod parser;
pub mod value;
pub mod writer;

pub use graph::{
    APP_EXTENSION_PRODUCT_TYPE, NewTarget, ProjectGraph, SourceFile, TableEntry, TargetHandle,
};
pub use ids::{IdGenerator, ObjectId};
pub use model::{Node, NodeKind, ProjectDescriptor};
pub use value::{Dict, Value};
