//! Stage 2: materialize the extension's file tree

use super::entitlements::{app_group_entitlements, write_entitlements};
use super::{Outcome, PipelineContext, Stage, StageKind, StageReport};
use crate::assets::{CatalogContents, ColorSetContents, ImageSetContents, write_contents};
use anyhow::Context;
use plist::{Dictionary, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const ASSET_CATALOG: &str = "Assets.xcassets";
const INFO_PLIST: &str = "Info.plist";
const CONTENTS_JSON: &str = "Contents.json";
pub const WIDGETKIT_EXTENSION_POINT: &str = "com.apple.widgetkit-extension";

/// Info.plist of the extension. Values are build-variable placeholders
/// resolved by the native toolchain.
pub fn extension_info_plist(display_name: &str) -> Dictionary {
    let mut info = Dictionary::new();
    let entries = [
        ("CFBundleDevelopmentRegion", "$(DEVELOPMENT_LANGUAGE)"),
        ("CFBundleDisplayName", display_name),
        ("CFBundleExecutable", "$(EXECUTABLE_NAME)"),
        ("CFBundleIdentifier", "$(PRODUCT_BUNDLE_IDENTIFIER)"),
        ("CFBundleInfoDictionaryVersion", "6.0"),
        ("CFBundleName", "$(PRODUCT_NAME)"),
        ("CFBundlePackageType", "$(PRODUCT_BUNDLE_PACKAGE_TYPE)"),
        ("CFBundleShortVersionString", "$(MARKETING_VERSION)"),
        ("CFBundleVersion", "$(CURRENT_PROJECT_VERSION)"),
    ];
    for (key, value) in entries {
        info.insert(key.to_string(), Value::String(value.to_string()));
    }

    let mut extension = Dictionary::new();
    extension.insert(
        "NSExtensionPointIdentifier".to_string(),
        Value::String(WIDGETKIT_EXTENSION_POINT.to_string()),
    );
    info.insert("NSExtension".to_string(), Value::Dictionary(extension));
    info
}

pub struct ScaffoldStage;

impl ScaffoldStage {
    fn write_asset_catalog(
        &self,
        context: &mut PipelineContext,
        report: &mut StageReport,
        catalog: &Path,
    ) -> anyhow::Result<()> {
        fs::create_dir_all(catalog)
            .with_context(|| format!("Failed to create {}", catalog.display()))?;
        let path = catalog.join(CONTENTS_JSON);
        write_contents(&path, &CatalogContents::default())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        context.written.push(path);

        for (name, hex) in &context.config.colors {
            let contents = match ColorSetContents::from_hex(hex) {
                Ok(contents) => contents,
                Err(e) => {
                    report.skip(format!("Color {name} skipped: {e}"));
                    continue;
                }
            };
            let dir = catalog.join(format!("{name}.colorset"));
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let path = dir.join(CONTENTS_JSON);
            write_contents(&path, &contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            context.written.push(path);
        }

        self.copy_host_icon(context, report, catalog)
    }

    fn copy_host_icon(
        &self,
        context: &mut PipelineContext,
        report: &mut StageReport,
        catalog: &Path,
    ) -> anyhow::Result<()> {
        let icon = context.layout.host_dir().join(&context.config.host_icon);
        let Some(file_name) = icon.file_name().and_then(|n| n.to_str()).map(str::to_string)
        else {
            report.skip(format!("Host icon path {} has no file name", icon.display()));
            return Ok(());
        };
        if !icon.is_file() {
            report.skip(format!(
                "Host icon {} not found, icon set not written",
                icon.display()
            ));
            return Ok(());
        }

        let dir = catalog.join(format!("{}.imageset", context.config.icon_set_name));
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        let copied = dir.join(&file_name);
        fs::copy(&icon, &copied)
            .with_context(|| format!("Failed to copy {}", icon.display()))?;
        let path = dir.join(CONTENTS_JSON);
        write_contents(&path, &ImageSetContents::single_scale(&file_name))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        context.written.extend([copied, path]);
        Ok(())
    }

    fn copy_sources(
        &self,
        context: &mut PipelineContext,
        report: &mut StageReport,
        extension_dir: &Path,
    ) -> anyhow::Result<Vec<String>> {
        let template_dir = context.layout.widget_template_dir();
        let mut copied = Vec::new();
        for source in &context.config.widget_sources {
            let from = template_dir.join(source);
            if !from.is_file() {
                report.skip(format!("Template {} not found", from.display()));
                continue;
            }
            let to = extension_dir.join(source);
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::copy(&from, &to).with_context(|| format!("Failed to copy {}", from.display()))?;
            debug!("Copied {:?} -> {:?}", from, to);
            context.written.push(to);
            copied.push(source.clone());
        }
        Ok(copied)
    }
}

impl Stage for ScaffoldStage {
    fn kind(&self) -> StageKind {
        StageKind::Scaffold
    }

    fn run(&self, context: &mut PipelineContext, report: &mut StageReport) -> anyhow::Result<()> {
        let extension_dir = context.layout.extension_dir();
        fs::create_dir_all(&extension_dir)
            .with_context(|| format!("Failed to create {}", extension_dir.display()))?;
        report.escalate(Outcome::Applied);

        let target_name = context.config.target_name.clone();
        let entitlements_name = format!("{target_name}.entitlements");
        let entitlements: PathBuf = extension_dir.join(&entitlements_name);
        write_entitlements(&entitlements, app_group_entitlements(&context.config.app_group))
            .with_context(|| format!("Failed to write {}", entitlements.display()))?;
        context.written.push(entitlements);
        context.extension_entries.push(entitlements_name);

        let info_plist = extension_dir.join(INFO_PLIST);
        Value::Dictionary(extension_info_plist(&target_name))
            .to_file_xml(&info_plist)
            .with_context(|| format!("Failed to write {}", info_plist.display()))?;
        context.written.push(info_plist);
        context.extension_entries.push(INFO_PLIST.to_string());

        self.write_asset_catalog(context, report, &extension_dir.join(ASSET_CATALOG))?;
        context.extension_entries.push(ASSET_CATALOG.to_string());

        let sources = self.copy_sources(context, report, &extension_dir)?;
        report.info(format!(
            "Wrote {} with {} source file(s)",
            extension_dir.display(),
            sources.len()
        ));
        context.extension_entries.extend(sources);
        Ok(())
    }
}
