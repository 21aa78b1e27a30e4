use std::borrow::Cow;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{
    bb::{ByteBuffer, Length},
    error::DecodeError,
    tag::{Tag, TagClass},
};

/// Limits applied while decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Deepest nesting accepted before failing with `DepthExceeded`. The
    /// top-level value is depth 0.
    pub max_depth: usize,
}

pub const DEFAULT_MAX_DEPTH: usize = 100;

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions { max_depth: DEFAULT_MAX_DEPTH }
    }
}

/// One decoded tag-length-value unit.
///
/// Nodes borrow from the buffer they were decoded from, the same way a
/// [Tag] is only meaningful next to its bytes. Primitive content is kept raw
/// and only interpreted when rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedNode<'a> {
    tag:         Tag,
    type_name:   Cow<'static, str>,
    offset:      usize,
    header_len:  usize,
    content_len: usize,
    indefinite:  bool,
    encoded:     &'a [u8],
    children:    Vec<DecodedNode<'a>>,
}

impl<'a> DecodedNode<'a> {
    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn tag_class(&self) -> TagClass {
        self.tag.class
    }

    pub fn tag_number(&self) -> u32 {
        self.tag.number
    }

    pub fn is_constructed(&self) -> bool {
        self.tag.constructed
    }

    pub fn is_indefinite(&self) -> bool {
        self.indefinite
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Offset of the first identifier octet in the original buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Identifier plus length octets.
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Content octets, excluding any end-of-contents marker.
    pub fn content_len(&self) -> usize {
        self.content_len
    }

    /// Total encoded size, including the end-of-contents marker of an
    /// indefinite-length value.
    pub fn len(&self) -> usize {
        self.encoded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content_len == 0
    }

    pub fn byte_range(&self) -> Range<usize> {
        self.offset..self.offset + self.encoded.len()
    }

    /// The exact bytes this node was decoded from.
    pub fn encoded(&self) -> &'a [u8] {
        self.encoded
    }

    pub fn content(&self) -> &'a [u8] {
        &self.encoded[self.header_len..self.header_len + self.content_len]
    }

    pub fn children(&self) -> &[DecodedNode<'a>] {
        &self.children
    }

    /// Number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(DecodedNode::node_count).sum::<usize>()
    }
}

/// Decodes the value starting at `offset` with the default limits.
pub fn decode(buffer: &[u8], offset: usize) -> Result<DecodedNode<'_>, DecodeError> {
    decode_with(buffer, offset, &DecodeOptions::default())
}

/// Decodes the value starting at `offset`. Bytes after the value are left
/// alone; compare `node.byte_range().end` with the buffer length to detect
/// them.
pub fn decode_with<'a>(
    buffer: &'a [u8],
    offset: usize,
    options: &DecodeOptions,
) -> Result<DecodedNode<'a>, DecodeError> {
    let mut bb = ByteBuffer::at(buffer, offset);
    decode_bb(&mut bb, 0, options)
}

/// Decodes one value from `bb` starting at its current index and advances
/// the index past it. This is mainly useful as a helper routine for
/// [decode_with], which you probably want to use instead.
pub fn decode_bb<'a>(
    bb: &mut ByteBuffer<'a>,
    depth: usize,
    options: &DecodeOptions,
) -> Result<DecodedNode<'a>, DecodeError> {
    let start = bb.index();
    if depth > options.max_depth {
        return Err(DecodeError::DepthExceeded { offset: start, limit: options.max_depth });
    }

    let tag = Tag::read(bb)?;
    let length = bb.read_length()?;
    let header_len = bb.index() - start;
    let mut children = Vec::new();

    let (content_len, indefinite) = match length {
        Length::Definite(len) => {
            let mut content = bb.window(len)?;
            if tag.constructed {
                while !content.is_empty() {
                    children.push(decode_bb(&mut content, depth + 1, options)?);
                }
            }
            bb.read_bytes(len)?;
            (len, false)
        }

        Length::Indefinite => {
            if !tag.constructed {
                return Err(DecodeError::IndefinitePrimitive { offset: start });
            }
            let content_start = bb.index();
            loop {
                if bb.is_empty() {
                    return Err(DecodeError::Unterminated { offset: bb.index(), start });
                }
                if bb.at_end_of_contents() {
                    break;
                }
                children.push(decode_bb(bb, depth + 1, options)?);
            }
            let content_len = bb.index() - content_start;
            bb.read_bytes(2)?;
            (content_len, true)
        }
    };

    Ok(DecodedNode {
        tag,
        type_name: tag.type_name(),
        offset: start,
        header_len,
        content_len,
        indefinite,
        encoded: &bb.data()[start..bb.index()],
        children,
    })
}
