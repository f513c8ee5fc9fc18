//! Build settings written into every configuration of the extension target

use crate::project::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A build setting value: a literal string or a list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Text(String),
    List(Vec<String>),
}

impl SettingValue {
    pub fn text(value: impl Into<String>) -> Self {
        SettingValue::Text(value.into())
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SettingValue::List(values.into_iter().map(Into::into).collect())
    }

    pub fn interpolate(&self, vars: &Interpolation<'_>) -> Self {
        match self {
            SettingValue::Text(text) => SettingValue::Text(vars.apply(text)),
            SettingValue::List(items) => {
                SettingValue::List(items.iter().map(|item| vars.apply(item)).collect())
            }
        }
    }

    pub fn to_project_value(&self) -> Value {
        match self {
            SettingValue::Text(text) => Value::from(text.as_str()),
            SettingValue::List(items) => Value::Array(
                items.iter().map(|item| Value::from(item.as_str())).collect(),
            ),
        }
    }

    /// Whether a value read back from a project equals this one.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (SettingValue::Text(expected), Value::String(actual)) => expected == actual,
            (SettingValue::List(expected), Value::Array(actual)) => {
                expected.len() == actual.len()
                    && expected
                        .iter()
                        .zip(actual)
                        .all(|(e, a)| a.as_str() == Some(e.as_str()))
            }
            _ => false,
        }
    }
}

/// Placeholder values substituted into settings, e.g. `{target_name}`
#[derive(Debug, Clone, Copy)]
pub struct Interpolation<'a> {
    pub target_name: &'a str,
    pub bundle_id: &'a str,
    pub host_bundle_id: &'a str,
    pub team_id: &'a str,
    pub deployment_target: &'a str,
    pub app_group: &'a str,
}

impl Interpolation<'_> {
    pub fn apply(&self, template: &str) -> String {
        template
            .replace("{target_name}", self.target_name)
            .replace("{bundle_id}", self.bundle_id)
            .replace("{host_bundle_id}", self.host_bundle_id)
            .replace("{team_id}", self.team_id)
            .replace("{deployment_target}", self.deployment_target)
            .replace("{app_group}", self.app_group)
    }
}

/// Ordered table of build settings
pub type SettingsTable = IndexMap<String, SettingValue>;

/// The settings every configuration of the extension receives, before
/// interpolation.
pub fn default_settings() -> SettingsTable {
    let entries = [
        ("ASSETCATALOG_COMPILER_GLOBAL_ACCENT_COLOR_NAME", SettingValue::text("AccentColor")),
        (
            "ASSETCATALOG_COMPILER_WIDGET_BACKGROUND_COLOR_NAME",
            SettingValue::text("WidgetBackground"),
        ),
        ("CODE_SIGN_ENTITLEMENTS", SettingValue::text("{target_name}/{target_name}.entitlements")),
        ("CODE_SIGN_STYLE", SettingValue::text("Automatic")),
        ("CURRENT_PROJECT_VERSION", SettingValue::text("1")),
        ("DEVELOPMENT_TEAM", SettingValue::text("{team_id}")),
        ("GENERATE_INFOPLIST_FILE", SettingValue::text("YES")),
        ("INFOPLIST_FILE", SettingValue::text("{target_name}/Info.plist")),
        ("INFOPLIST_KEY_CFBundleDisplayName", SettingValue::text("{target_name}")),
        ("INFOPLIST_KEY_NSHumanReadableCopyright", SettingValue::text("")),
        ("IPHONEOS_DEPLOYMENT_TARGET", SettingValue::text("{deployment_target}")),
        (
            "LD_RUNPATH_SEARCH_PATHS",
            SettingValue::list([
                "$(inherited)",
                "@executable_path/Frameworks",
                "@executable_path/../../Frameworks",
            ]),
        ),
        ("MARKETING_VERSION", SettingValue::text("1.0")),
        ("PRODUCT_BUNDLE_IDENTIFIER", SettingValue::text("{bundle_id}")),
        ("PRODUCT_NAME", SettingValue::text("$(TARGET_NAME)")),
        ("SKIP_INSTALL", SettingValue::text("YES")),
        ("SWIFT_EMIT_LOC_STRINGS", SettingValue::text("YES")),
        ("SWIFT_VERSION", SettingValue::text("5.0")),
        ("TARGETED_DEVICE_FAMILY", SettingValue::text("1,2")),
    ];
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Layer `overrides` over `base`: a value replaces or adds a key, `None`
/// removes it.
pub fn layer_settings(
    mut base: SettingsTable,
    overrides: &IndexMap<String, Option<SettingValue>>,
) -> SettingsTable {
    for (key, value) in overrides {
        match value {
            Some(value) => {
                base.insert(key.clone(), value.clone());
            }
            None => {
                base.shift_remove(key);
            }
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> Interpolation<'static> {
        Interpolation {
            target_name: "HomeWidget",
            bundle_id: "com.example.app.widget",
            host_bundle_id: "com.example.app",
            team_id: "ABCDE12345",
            deployment_target: "17.0",
            app_group: "group.com.example.app",
        }
    }

    #[test]
    fn test_interpolation_replaces_every_placeholder() {
        let value = SettingValue::text("{target_name}/{target_name}.entitlements");
        assert_eq!(
            value.interpolate(&vars()),
            SettingValue::text("HomeWidget/HomeWidget.entitlements")
        );

        let list = SettingValue::list(["{team_id}", "{app_group}"]);
        assert_eq!(
            list.interpolate(&vars()),
            SettingValue::list(["ABCDE12345", "group.com.example.app"])
        );
    }

    #[test]
    fn test_default_table_is_complete() {
        let table = default_settings();
        assert_eq!(table.len(), 19);
        for key in [
            "DEVELOPMENT_TEAM",
            "CODE_SIGN_STYLE",
            "SWIFT_VERSION",
            "IPHONEOS_DEPLOYMENT_TARGET",
            "TARGETED_DEVICE_FAMILY",
            "CODE_SIGN_ENTITLEMENTS",
            "PRODUCT_BUNDLE_IDENTIFIER",
            "SKIP_INSTALL",
        ] {
            assert!(table.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn test_layering_replaces_adds_and_removes() {
        let mut overrides = IndexMap::new();
        overrides.insert("SWIFT_VERSION".to_string(), Some(SettingValue::text("6.0")));
        overrides.insert("ENABLE_PREVIEWS".to_string(), Some(SettingValue::text("YES")));
        overrides.insert("SWIFT_EMIT_LOC_STRINGS".to_string(), None);

        let table = layer_settings(default_settings(), &overrides);
        assert_eq!(table["SWIFT_VERSION"], SettingValue::text("6.0"));
        assert_eq!(table["ENABLE_PREVIEWS"], SettingValue::text("YES"));
        assert!(!table.contains_key("SWIFT_EMIT_LOC_STRINGS"));
    }

    #[test]
    fn test_setting_values_deserialize_untagged() {
        let text: SettingValue = serde_json::from_str("\"YES\"").unwrap();
        let list: SettingValue = serde_json::from_str("[\"a\", \"b\"]").unwrap();
        assert_eq!(text, SettingValue::text("YES"));
        assert_eq!(list, SettingValue::list(["a", "b"]));
    }

    #[test]
    fn test_matches_compares_shape_and_content() {
        let list = SettingValue::list(["$(inherited)", "-ObjC"]);
        assert!(list.matches(&list.to_project_value()));
        assert!(!list.matches(&Value::from("$(inherited) -ObjC")));
    }
}
