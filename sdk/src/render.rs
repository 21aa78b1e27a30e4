use std::fmt::Write;

use pe2pkcs7_schema::{universal_number, DecodedNode, Primitive, Schema, TagClass, TypeDef, TypeKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How lines are turned into text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Repeated once per nesting level.
    pub indent:            String,
    /// Append ` @offset+length` after the type name.
    pub show_offsets:      bool,
    /// Longer summaries are cut and end with `…`.
    pub max_summary_chars: Option<usize>,
    /// Replaces line breaks inside summaries.
    pub line_break:        String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            indent:            "  ".to_owned(),
            show_offsets:      false,
            max_summary_chars: None,
            line_break:        "⏎".to_owned(),
        }
    }
}

/// One rendered node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderLine {
    pub indent_level:    usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_label:     Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_type:     Option<String>,
    pub type_name:       String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_summary: Option<String>,
    pub offset:          usize,
    pub length:          usize,
    /// A schema definition applied to this node.
    pub matched:         bool,
}

impl RenderLine {
    pub fn to_text(&self, config: &RenderConfig) -> String {
        let mut out = config.indent.repeat(self.indent_level);
        for part in [&self.field_label, &self.schema_type].into_iter().flatten() {
            out.push_str(part);
            out.push(' ');
        }
        out.push_str(&self.type_name);
        if config.show_offsets {
            let _ = write!(out, " @{}+{}", self.offset, self.length);
        }
        if let Some(summary) = &self.content_summary {
            out.push_str(": ");
            out.push_str(summary);
        }
        out
    }
}

/// Newline-joined text of `lines`.
pub fn render_text(lines: &[RenderLine], config: &RenderConfig) -> String {
    lines
        .iter()
        .map(|line| line.to_text(config))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Walks a decoded tree together with its schema definitions.
///
/// Rendering never fails: a definition that does not fit the node it is
/// applied to is dropped and that subtree renders unlabeled.
pub struct Renderer<'s> {
    schema: &'s Schema,
    config: RenderConfig,
}

impl<'s> Renderer<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Renderer::with_config(schema, RenderConfig::default())
    }

    pub fn with_config(schema: &'s Schema, config: RenderConfig) -> Self {
        Renderer { schema, config }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Lines for `node` and its descendants, in document order. `indent` is
    /// the nesting level given to `node` itself.
    pub fn render<'d>(&self, node: &DecodedNode, def: Option<&'d TypeDef>, indent: usize) -> Vec<RenderLine>
    where
        's: 'd,
    {
        let mut lines = Vec::with_capacity(node.node_count());
        self.render_into(node, def, indent, &mut lines);
        lines
    }

    pub fn render_text(&self, node: &DecodedNode, def: Option<&TypeDef>) -> String {
        render_text(&self.render(node, def, 0), &self.config)
    }

    fn render_into<'d>(
        &self,
        node: &DecodedNode,
        def: Option<&'d TypeDef>,
        indent: usize,
        lines: &mut Vec<RenderLine>,
    ) where
        's: 'd,
    {
        let schema: &'d Schema = self.schema;
        let mut field_label = def.and_then(|d| d.field.clone());
        let mut schema_type = def
            .filter(|d| d.kind == TypeKind::DefinedReference)
            .map(|d| d.name.clone());

        let mut resolved = schema.resolve(def);
        if let Some(choice) = resolved.filter(|d| d.kind == TypeKind::Choice) {
            resolved = match schema.select_alternative(choice, node.type_name()) {
                Some((alternative, branch)) => {
                    if field_label.is_none() {
                        field_label = alternative.field.clone();
                    }
                    if schema_type.is_none() && alternative.kind == TypeKind::DefinedReference {
                        schema_type = Some(alternative.name.clone());
                    }
                    Some(branch)
                }
                None => {
                    debug!(offset = node.offset(), found = %node.type_name(), "no CHOICE alternative matches");
                    None
                }
            };
        }

        if let Some(d) = resolved {
            if d.name != node.type_name() && !d.is_any() {
                debug!(
                    offset = node.offset(),
                    expected = %d.name,
                    found = %node.type_name(),
                    "schema mismatch"
                );
                resolved = None;
            }
        }
        if resolved.is_none() {
            field_label = None;
            schema_type = None;
        }

        lines.push(RenderLine {
            indent_level: indent,
            field_label,
            schema_type,
            type_name: node.type_name().to_owned(),
            content_summary: self.summary(node, resolved),
            offset: node.offset(),
            length: node.len(),
            matched: resolved.is_some(),
        });

        let content: &[TypeDef] = resolved.map(|d| d.content.as_slice()).unwrap_or(&[]);
        let repeated = resolved.map_or(false, |d| d.repeated);
        let mut cursor = 0;
        for child in node.children() {
            let child_def = if content.is_empty() {
                None
            } else if repeated {
                content.first()
            } else {
                while cursor < content.len()
                    && content[cursor].is_skippable()
                    && !schema.accepts(&content[cursor], child.type_name())
                {
                    cursor += 1;
                }
                let entry = content.get(cursor);
                cursor += 1;
                entry
            };
            self.render_into(child, child_def, indent + 1, lines);
        }
    }

    fn summary(&self, node: &DecodedNode, def: Option<&TypeDef>) -> Option<String> {
        if node.is_constructed() {
            return None;
        }

        let number = if node.tag_class() == TagClass::Universal {
            Some(node.tag_number())
        } else {
            def.and_then(|d| d.underlying.as_deref()).and_then(universal_number)
        };
        let text = match number {
            Some(number) => Primitive::parse(number, node.content()).to_string(),
            None => hex::encode_upper(node.content()),
        };
        if text.is_empty() {
            return None;
        }

        let sep = self.config.line_break.as_str();
        let text = text.replace("\r\n", sep).replace(['\n', '\r'], sep);
        match self.config.max_summary_chars {
            Some(max) if text.chars().count() > max => {
                let mut cut: String = text.chars().take(max).collect();
                cut.push('…');
                Some(cut)
            }
            _ => Some(text),
        }
    }
}
