//! Serializer producing the layout Xcode itself writes
//!
//! Objects are grouped into `/* Begin <isa> section */` blocks sorted by
//! isa, and sorted by id inside a block. Build files and file references
//! are written on a single line. References are followed by the display
//! annotation of the object they point at.

use super::ids::ObjectId;
use super::model::{NodeKind, ProjectDescriptor};
use super::value::{Dict, Value};
use std::collections::BTreeMap;
use std::fmt::Write;

const HEADER: &str = "// !$*UTF8*$!";

/// Fields whose id values Xcode leaves unannotated.
const UNANNOTATED_KEYS: &[&str] = &["remoteGlobalIDString", "TestTargetID"];

pub fn write_project(project: &ProjectDescriptor) -> String {
    let writer = Writer { project };
    let mut out = String::with_capacity(project.len() * 160);
    out.push_str(HEADER);
    out.push_str("\n{\n");
    for (key, value) in project.top_level() {
        indent(&mut out, 1);
        out.push_str(&quote(key));
        out.push_str(" = ");
        if key == "objects" {
            writer.write_objects(&mut out);
        } else {
            writer.write_value(&mut out, value, 1, Some(key), false);
        }
        out.push_str(";\n");
    }
    out.push_str("}\n");
    out
}

struct Writer<'a> {
    project: &'a ProjectDescriptor,
}

impl Writer<'_> {
    fn write_objects(&self, out: &mut String) {
        let mut sections: BTreeMap<&str, Vec<&super::model::Node>> = BTreeMap::new();
        for node in self.project.objects() {
            sections.entry(node.kind.isa()).or_default().push(node);
        }

        out.push_str("{\n");
        for (isa, mut nodes) in sections {
            nodes.sort_by(|a, b| a.id.cmp(&b.id));
            let _ = write!(out, "\n/* Begin {isa} section */\n");
            let one_line = matches!(nodes[0].kind, NodeKind::BuildFile | NodeKind::FileReference);
            for node in nodes {
                indent(out, 2);
                out.push_str(node.id.as_str());
                self.annotate(out, &node.id);
                out.push_str(" = ");
                self.write_dict(out, &node.fields, 2, one_line);
                out.push_str(";\n");
            }
            let _ = writeln!(out, "/* End {isa} section */");
        }
        indent(out, 1);
        out.push('}');
    }

    fn annotate(&self, out: &mut String, id: &ObjectId) {
        if let Some(text) = self.project.annotation(id) {
            let _ = write!(out, " /* {text} */");
        }
    }

    fn write_value(
        &self,
        out: &mut String,
        value: &Value,
        depth: usize,
        key: Option<&str>,
        one_line: bool,
    ) {
        match value {
            Value::String(text) => {
                out.push_str(&quote(text));
                let annotated = !key.is_some_and(|k| UNANNOTATED_KEYS.contains(&k));
                if annotated && ObjectId::is_well_formed(text) {
                    let id = ObjectId::from(text.as_str());
                    if self.project.contains(&id) {
                        self.annotate(out, &id);
                    }
                }
            }
            Value::Array(items) => {
                if one_line {
                    out.push('(');
                    for item in items {
                        self.write_value(out, item, depth, key, true);
                        out.push_str(", ");
                    }
                    out.push(')');
                } else {
                    out.push_str("(\n");
                    for item in items {
                        indent(out, depth + 1);
                        self.write_value(out, item, depth + 1, key, false);
                        out.push_str(",\n");
                    }
                    indent(out, depth);
                    out.push(')');
                }
            }
            Value::Dict(dict) => self.write_dict(out, dict, depth, one_line),
        }
    }

    fn write_dict(&self, out: &mut String, dict: &Dict, depth: usize, one_line: bool) {
        if one_line {
            out.push('{');
            for (key, value) in dict {
                out.push_str(&quote(key));
                out.push_str(" = ");
                self.write_value(out, value, depth, Some(key), true);
                out.push_str("; ");
            }
            out.push('}');
            return;
        }

        out.push_str("{\n");
        for (key, value) in dict {
            indent(out, depth + 1);
            out.push_str(&quote(key));
            out.push_str(" = ");
            self.write_value(out, value, depth + 1, Some(key), false);
            out.push_str(";\n");
        }
        indent(out, depth);
        out.push('}');
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

/// Quote a string unless it is a bare word.
pub fn quote(text: &str) -> String {
    let bare = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | ':' | '.'));
    if bare {
        return text.to_string();
    }

    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}
