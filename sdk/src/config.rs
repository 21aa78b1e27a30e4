use std::{fs, path::Path};

use pe2pkcs7_compiler::Pe2Pkcs7Error;
use pe2pkcs7_schema::DecodeOptions;
use serde::{Deserialize, Serialize};

use crate::{export::ExportFormat, render::RenderConfig};

/// `root_type` value that picks the best matching definition.
pub const AUTO_ROOT: &str = "auto";

/// Everything [dump](crate::dump) needs besides the input and the schema.
/// Every field has a default, so a config file only lists what it changes:
///
/// ```json
/// { "root_type": "auto", "render": { "show_offsets": true } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Where the top-level value starts in the input.
    pub offset:    usize,
    /// Definition applied to the top-level value: a name, [AUTO_ROOT], or
    /// nothing for an unlabeled dump.
    pub root_type: Option<String>,
    pub decode:    DecodeOptions,
    pub render:    RenderConfig,
    pub format:    ExportFormat,
}

impl DumpConfig {
    pub fn from_json_str(text: &str) -> Result<Self, Pe2Pkcs7Error> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Pe2Pkcs7Error> {
        let text = fs::read_to_string(path)?;
        DumpConfig::from_json_str(&text)
    }
}
