use std::{fmt, str::FromStr};

use pe2pkcs7_compiler::Pe2Pkcs7Error;
use serde::{Deserialize, Serialize};

use crate::{render::render_text, Dump, RenderConfig};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Indented lines, as shown by the tree view.
    #[default]
    Text,
    /// The render lines as a JSON array.
    Json,
    /// The exact bytes of the decoded value.
    Der,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ExportFormat::Text),
            "json" => Ok(ExportFormat::Json),
            "der" | "bin" => Ok(ExportFormat::Der),
            other => Err(format!("unknown export format \"{}\" (expected text, json or der)", other)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Text => "text",
            ExportFormat::Json => "json",
            ExportFormat::Der => "der",
        })
    }
}

/// Serializes a dump in the requested format.
pub fn export(dump: &Dump, format: ExportFormat, config: &RenderConfig) -> Result<Vec<u8>, Pe2Pkcs7Error> {
    match format {
        ExportFormat::Text => {
            let mut text = render_text(&dump.lines, config);
            text.push('\n');
            Ok(text.into_bytes())
        }
        ExportFormat::Json => Ok(serde_json::to_vec_pretty(&dump.lines)?),
        ExportFormat::Der => Ok(dump.encoded().to_vec()),
    }
}
