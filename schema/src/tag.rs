use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{bb::ByteBuffer, error::DecodeError};

/// ASN.1 tag class, from the top two bits of the identifier octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagClass {
    Universal,
    Application,
    Context,
    Private,
}

/// A parsed identifier: class, constructed bit and tag number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub class:       TagClass,
    pub constructed: bool,
    pub number:      u32,
}

pub mod universal {
    pub const EOC: u32 = 0;
    pub const BOOLEAN: u32 = 1;
    pub const INTEGER: u32 = 2;
    pub const BIT_STRING: u32 = 3;
    pub const OCTET_STRING: u32 = 4;
    pub const NULL: u32 = 5;
    pub const OBJECT_IDENTIFIER: u32 = 6;
    pub const OBJECT_DESCRIPTOR: u32 = 7;
    pub const EXTERNAL: u32 = 8;
    pub const REAL: u32 = 9;
    pub const ENUMERATED: u32 = 10;
    pub const EMBEDDED_PDV: u32 = 11;
    pub const UTF8_STRING: u32 = 12;
    pub const RELATIVE_OID: u32 = 13;
    pub const SEQUENCE: u32 = 16;
    pub const SET: u32 = 17;
    pub const NUMERIC_STRING: u32 = 18;
    pub const PRINTABLE_STRING: u32 = 19;
    pub const TELETEX_STRING: u32 = 20;
    pub const VIDEOTEX_STRING: u32 = 21;
    pub const IA5_STRING: u32 = 22;
    pub const UTC_TIME: u32 = 23;
    pub const GENERALIZED_TIME: u32 = 24;
    pub const GRAPHIC_STRING: u32 = 25;
    pub const VISIBLE_STRING: u32 = 26;
    pub const GENERAL_STRING: u32 = 27;
    pub const UNIVERSAL_STRING: u32 = 28;
    pub const CHARACTER_STRING: u32 = 29;
    pub const BMP_STRING: u32 = 30;
}

/// Display names of the universal types, indexed by tag number. These are
/// the same spellings the schema compiler gives to builtin types, so a
/// decoded node and a TypeDef can be compared by name.
pub const UNIVERSAL_NAMES: [&str; 31] = [
    "EOC",
    "BOOLEAN",
    "INTEGER",
    "BIT STRING",
    "OCTET STRING",
    "NULL",
    "OBJECT IDENTIFIER",
    "ObjectDescriptor",
    "EXTERNAL",
    "REAL",
    "ENUMERATED",
    "EMBEDDED PDV",
    "UTF8String",
    "RELATIVE-OID",
    "",
    "",
    "SEQUENCE",
    "SET",
    "NumericString",
    "PrintableString",
    "TeletexString",
    "VideotexString",
    "IA5String",
    "UTCTime",
    "GeneralizedTime",
    "GraphicString",
    "VisibleString",
    "GeneralString",
    "UniversalString",
    "CHARACTER STRING",
    "BMPString",
];

/// Maps a universal type name back to its tag number.
pub fn universal_number(name: &str) -> Option<u32> {
    UNIVERSAL_NAMES
        .iter()
        .position(|n| !n.is_empty() && *n == name)
        .map(|i| i as u32)
}

impl Tag {
    /// Read identifier octets starting at the buffer's current index.
    pub fn read(bb: &mut ByteBuffer) -> Result<Tag, DecodeError> {
        let first = bb.read_byte()?;
        let class = match first >> 6 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::Context,
            _ => TagClass::Private,
        };
        let constructed = (first & 0x20) != 0;

        let low_bits = first & 0x1F;
        let number = if low_bits < 0x1F {
            low_bits as u32
        } else {
            let start = bb.index();
            u32::try_from(bb.read_base128()?)
                .map_err(|_| DecodeError::NumberOverflow { offset: start })?
        };

        Ok(Tag { class, constructed, number })
    }

    pub fn is_universal(&self, number: u32) -> bool {
        self.class == TagClass::Universal && self.number == number
    }

    /// The human readable type name used for display and schema matching.
    pub fn type_name(&self) -> Cow<'static, str> {
        match self.class {
            TagClass::Universal => match UNIVERSAL_NAMES.get(self.number as usize) {
                Some(name) if !name.is_empty() => Cow::Borrowed(name),
                _ => Cow::Owned(format!("UNIVERSAL {}", self.number)),
            },
            TagClass::Application => Cow::Owned(format!("[APPLICATION {}]", self.number)),
            TagClass::Context => Cow::Owned(format!("[{}]", self.number)),
            TagClass::Private => Cow::Owned(format!("[PRIVATE {}]", self.number)),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}
