//! Stage 1: grant the shared app group to the main application

use super::{Outcome, PipelineContext, Stage, StageKind, StageReport};
use crate::error::{Error, Result};
use anyhow::Context;
use plist::{Dictionary, Value};
use std::path::Path;

pub const APP_GROUPS_KEY: &str = "com.apple.security.application-groups";

/// Ensure `group` appears exactly once under the app-group key.
///
/// The array is created if missing. Duplicates of `group` collapse onto the
/// first occurrence; other entries keep their order. Returns whether the
/// document changed.
pub fn merge_app_group(entitlements: &mut Dictionary, group: &str) -> bool {
    let before = entitlements.get(APP_GROUPS_KEY).cloned();
    let existing = match &before {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let mut seen = false;
    let mut merged = Vec::with_capacity(existing.len() + 1);
    for item in existing {
        if item.as_string() == Some(group) {
            if seen {
                continue;
            }
            seen = true;
        }
        merged.push(item);
    }
    if !seen {
        merged.push(Value::String(group.to_string()));
    }

    let merged = Value::Array(merged);
    let changed = before.as_ref() != Some(&merged);
    entitlements.insert(APP_GROUPS_KEY.to_string(), merged);
    changed
}

/// Entitlements granting only `group`
pub fn app_group_entitlements(group: &str) -> Dictionary {
    let mut entitlements = Dictionary::new();
    merge_app_group(&mut entitlements, group);
    entitlements
}

/// Reads an entitlements file; a missing file is an empty document.
pub(crate) fn read_entitlements(path: &Path) -> Result<Dictionary> {
    if !path.exists() {
        return Ok(Dictionary::new());
    }
    match Value::from_file(path)? {
        Value::Dictionary(dict) => Ok(dict),
        _ => Err(Error::Other(format!(
            "{} is not a dictionary property list",
            path.display()
        ))),
    }
}

pub(crate) fn write_entitlements(path: &Path, entitlements: Dictionary) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Value::Dictionary(entitlements).to_file_xml(path)?;
    Ok(())
}

pub struct EntitlementStage;

impl Stage for EntitlementStage {
    fn kind(&self) -> StageKind {
        StageKind::Entitlements
    }

    fn run(&self, context: &mut PipelineContext, report: &mut StageReport) -> anyhow::Result<()> {
        let path = context.layout.host_entitlements_path();
        let group = context.config.app_group.as_str();

        if !path.exists() {
            report.info(format!("{} not found, creating it", path.display()));
        }
        let mut entitlements = read_entitlements(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if entitlements
            .get(APP_GROUPS_KEY)
            .is_some_and(|value| value.as_array().is_none())
        {
            report.warn(format!(
                "{APP_GROUPS_KEY} in {} is not an array, replacing it",
                path.display()
            ));
        }
        if !merge_app_group(&mut entitlements, group) {
            report.info(format!("{group} already granted in {}", path.display()));
            return Ok(());
        }

        write_entitlements(&path, entitlements)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        context.written.push(path.clone());
        report.info(format!("Granted {group} in {}", path.display()));
        report.escalate(Outcome::Applied);
        Ok(())
    }
}
