//! `Contents.json` descriptors of an asset catalog

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const UNIVERSAL: &str = "universal";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogInfo {
    pub author: String,
    pub version: u32,
}

impl Default for CatalogInfo {
    fn default() -> Self {
        Self {
            author: "xcode".to_string(),
            version: 1,
        }
    }
}

/// `Assets.xcassets/Contents.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogContents {
    pub info: CatalogInfo,
}

/// `<Name>.colorset/Contents.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSetContents {
    pub colors: Vec<ColorEntry>,
    pub info: CatalogInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorEntry {
    pub color: Color,
    pub idiom: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    #[serde(rename = "color-space")]
    pub color_space: String,
    pub components: Components,
}

/// sRGB components, each formatted with three decimals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub alpha: String,
    pub blue: String,
    pub green: String,
    pub red: String,
}

/// `<Name>.imageset/Contents.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSetContents {
    pub images: Vec<ImageSlot>,
    pub info: CatalogInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSlot {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub filename: Option<String>,
    pub idiom: String,
    pub scale: String,
}

impl ColorSetContents {
    /// A universal sRGB color set from `#RRGGBB` or `#RRGGBBAA`.
    pub fn from_hex(hex: &str) -> Result<Self> {
        Ok(Self {
            colors: vec![ColorEntry {
                color: Color {
                    color_space: "srgb".to_string(),
                    components: parse_hex_color(hex)?,
                },
                idiom: UNIVERSAL.to_string(),
            }],
            info: CatalogInfo::default(),
        })
    }
}

impl ImageSetContents {
    /// The 1x slot references `filename`; 2x and 3x stay empty.
    pub fn single_scale(filename: &str) -> Self {
        let slot = |scale: &str, filename: Option<&str>| ImageSlot {
            filename: filename.map(str::to_string),
            idiom: UNIVERSAL.to_string(),
            scale: scale.to_string(),
        };
        Self {
            images: vec![
                slot("1x", Some(filename)),
                slot("2x", None),
                slot("3x", None),
            ],
            info: CatalogInfo::default(),
        }
    }
}

pub fn parse_hex_color(hex: &str) -> Result<Components> {
    let digits = hex.trim().trim_start_matches('#');
    if !matches!(digits.len(), 6 | 8) || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::Other(format!(
            "'{hex}' is not a #RRGGBB or #RRGGBBAA color"
        )));
    }
    let channel = |index: usize| -> Result<String> {
        let byte = u8::from_str_radix(&digits[index * 2..index * 2 + 2], 16)
            .map_err(|e| Error::Other(format!("invalid color '{hex}': {e}")))?;
        Ok(format!("{:.3}", f64::from(byte) / 255.0))
    };
    let alpha = if digits.len() == 8 {
        channel(3)?
    } else {
        "1.000".to_string()
    };
    Ok(Components {
        alpha,
        blue: channel(2)?,
        green: channel(1)?,
        red: channel(0)?,
    })
}

/// Pretty JSON with a trailing newline, the way Xcode writes it.
pub fn write_contents<T: Serialize>(path: &Path, contents: &T) -> Result<()> {
    let mut json = serde_json::to_string_pretty(contents)?;
    json.push('\n');
    std::fs::write(path, json)?;
    Ok(())
}
