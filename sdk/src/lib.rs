//! pe2pkcs7
//!
//! Turns the PKCS#7 signature block of a signed executable into an annotated
//! ASN.1 tree.
//!
//! - [dump]: decode, pick the root definition, render
//! - [Renderer] / [RenderLine]: the schema-guided tree walk
//! - [export](export::export): text, JSON or the raw encoded bytes
//! - [builtin_schema]: PKCS#7, X.509 and Authenticode definitions
//!
//! ```
//! use pe2pkcs7::{dump, DumpConfig, Schema};
//!
//! let bytes = [0x30, 0x03, 0x02, 0x01, 0x05];
//! let result = dump(&bytes, &Schema::default(), &DumpConfig::default()).unwrap();
//! assert_eq!(result.text(&Default::default()), "SEQUENCE\n  INTEGER: 5");
//! ```

pub mod config;
pub mod export;
pub mod logging;
pub mod render;

pub use config::{DumpConfig, AUTO_ROOT};
pub use export::{export, ExportFormat};
pub use render::{render_text, RenderConfig, RenderLine, Renderer};

pub use pe2pkcs7_compiler::{
    builtin_schema, compile_modules, compile_schema, schema_from_json, schema_to_json,
    Pe2Pkcs7Error, AUTHENTICODE, DEFAULT_ROOT,
};
pub use pe2pkcs7_schema::{
    decode, decode_with, DecodeError, DecodeOptions, DecodedNode, Def, Schema, TypeDef, TypeKind,
};

use tracing::{debug, warn};

/// A decoded and rendered value.
#[derive(Debug, Clone, PartialEq)]
pub struct Dump<'a> {
    pub root:      DecodedNode<'a>,
    /// Definition the top-level value was rendered as, if any.
    pub root_type: Option<String>,
    pub lines:     Vec<RenderLine>,
}

impl<'a> Dump<'a> {
    pub fn text(&self, config: &RenderConfig) -> String {
        render_text(&self.lines, config)
    }

    /// The bytes of the top-level value, header and end-of-contents included.
    pub fn encoded(&self) -> &'a [u8] {
        self.root.encoded()
    }
}

/// Decode the value at `config.offset` and render it against `schema`.
pub fn dump<'a>(buffer: &'a [u8], schema: &Schema, config: &DumpConfig) -> Result<Dump<'a>, Pe2Pkcs7Error> {
    let root = decode_with(buffer, config.offset, &config.decode)?;

    let trailing = buffer.len().saturating_sub(root.byte_range().end);
    if trailing > 0 {
        warn!(trailing, end = root.byte_range().end, "ignoring bytes after the top-level value");
    }

    let renderer = Renderer::with_config(schema, config.render.clone());
    let root_type = match config.root_type.as_deref() {
        None => None,
        Some(AUTO_ROOT) => detect_root(&renderer, &root),
        Some(name) if schema.contains(name) => Some(name.to_owned()),
        Some(name) => return Err(Pe2Pkcs7Error::UnknownRootType(name.to_owned())),
    };

    let root_def = root_type.as_deref().map(TypeDef::reference);
    let lines = renderer.render(&root, root_def.as_ref(), 0);
    Ok(Dump { root, root_type, lines })
}

/// The top-level definition that labels the most lines of `node`; the
/// first one in declaration order on a tie. `None` when nothing matches.
pub fn detect_root(renderer: &Renderer, node: &DecodedNode) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for name in renderer.schema().names() {
        let def = TypeDef::reference(name);
        let score = renderer
            .render(node, Some(&def), 0)
            .iter()
            .filter(|line| line.matched)
            .count();
        if score > 0 && best.map_or(true, |(_, top)| score > top) {
            best = Some((name, score));
        }
    }
    debug!(root = ?best, "detected root type");
    best.map(|(name, _)| name.to_owned())
}
