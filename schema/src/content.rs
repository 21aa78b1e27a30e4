use std::fmt;

use chrono::NaiveDateTime;

use crate::{oid::Oid, tag::universal};

/// The interpreted content of a primitive value.
///
/// A `Primitive` is built on demand from a node's raw content and the
/// universal type it should be read as. Anything that does not parse as
/// that type becomes [Raw](#variant.Raw) and is shown as hex.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive<'a> {
    Boolean(bool),
    Integer(i64),
    BigInteger(&'a [u8]),
    BitString { unused: u8, bits: &'a [u8] },
    OctetString(&'a [u8]),
    Null,
    ObjectIdentifier(Oid),
    RelativeOid(Oid),
    Text(String),
    Time(NaiveDateTime),
    Raw(&'a [u8]),
}

impl<'a> Primitive<'a> {
    /// Interpret `content` as the universal type `number`.
    pub fn parse(number: u32, content: &'a [u8]) -> Primitive<'a> {
        match number {
            universal::BOOLEAN => match content {
                [value] => Primitive::Boolean(*value != 0),
                _ => Primitive::Raw(content),
            },

            universal::INTEGER | universal::ENUMERATED => match content.len() {
                0 => Primitive::Raw(content),
                1..=8 => {
                    let mut value: i64 = if content[0] & 0x80 != 0 { -1 } else { 0 };
                    for byte in content {
                        value = (value << 8) | *byte as i64;
                    }
                    Primitive::Integer(value)
                }
                _ => Primitive::BigInteger(content),
            },

            universal::BIT_STRING => match content.split_first() {
                Some((&unused, bits)) if unused <= 7 && !(bits.is_empty() && unused != 0) => {
                    Primitive::BitString { unused, bits }
                }
                _ => Primitive::Raw(content),
            },

            universal::OCTET_STRING => Primitive::OctetString(content),

            universal::NULL => {
                if content.is_empty() {
                    Primitive::Null
                } else {
                    Primitive::Raw(content)
                }
            }

            universal::OBJECT_IDENTIFIER => Oid::from_content(content)
                .map(Primitive::ObjectIdentifier)
                .unwrap_or(Primitive::Raw(content)),

            universal::RELATIVE_OID => Oid::from_relative_content(content)
                .map(Primitive::RelativeOid)
                .unwrap_or(Primitive::Raw(content)),

            universal::UTF8_STRING | universal::OBJECT_DESCRIPTOR => {
                match std::str::from_utf8(content) {
                    Ok(text) => Primitive::Text(text.to_owned()),
                    Err(_) => Primitive::Raw(content),
                }
            }

            universal::NUMERIC_STRING
            | universal::PRINTABLE_STRING
            | universal::IA5_STRING
            | universal::VISIBLE_STRING => {
                if content.is_ascii() {
                    Primitive::Text(content.iter().map(|&b| b as char).collect())
                } else {
                    Primitive::Raw(content)
                }
            }

            // Latin-1 is a lossless reading for the 8-bit string types
            universal::TELETEX_STRING
            | universal::VIDEOTEX_STRING
            | universal::GRAPHIC_STRING
            | universal::GENERAL_STRING => {
                Primitive::Text(content.iter().map(|&b| b as char).collect())
            }

            universal::BMP_STRING => decode_utf16(content)
                .map(Primitive::Text)
                .unwrap_or(Primitive::Raw(content)),

            universal::UNIVERSAL_STRING => decode_utf32(content)
                .map(Primitive::Text)
                .unwrap_or(Primitive::Raw(content)),

            universal::UTC_TIME | universal::GENERALIZED_TIME => {
                match std::str::from_utf8(content) {
                    Ok(text) => match parse_time(number, text) {
                        Some(time) => Primitive::Time(time),
                        None => Primitive::Text(text.to_owned()),
                    },
                    Err(_) => Primitive::Raw(content),
                }
            }

            _ => Primitive::Raw(content),
        }
    }
}

fn decode_utf16(content: &[u8]) -> Option<String> {
    if content.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = content
        .chunks(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

fn decode_utf32(content: &[u8]) -> Option<String> {
    if content.len() % 4 != 0 {
        return None;
    }
    content
        .chunks(4)
        .map(|c| char::from_u32(u32::from_be_bytes([c[0], c[1], c[2], c[3]])))
        .collect()
}

/// UTCTime is `YYMMDDHHMM[SS]Z`, GeneralizedTime `YYYYMMDDHHMM[SS[.fff]]Z`.
/// Values with a local offset or no zone are left to be shown verbatim.
fn parse_time(number: u32, text: &str) -> Option<NaiveDateTime> {
    let text = text.strip_suffix('Z')?;
    if number == universal::UTC_TIME {
        // RFC 5280: 00-49 → 20xx, 50-99 → 19xx
        let yy: u32 = text.get(0..2)?.parse().ok()?;
        let century = if yy < 50 { "20" } else { "19" };
        let full = format!("{}{}", century, text);
        match full.len() {
            12 => NaiveDateTime::parse_from_str(&full, "%Y%m%d%H%M").ok(),
            14 => NaiveDateTime::parse_from_str(&full, "%Y%m%d%H%M%S").ok(),
            _ => None,
        }
    } else {
        match text.len() {
            12 => NaiveDateTime::parse_from_str(text, "%Y%m%d%H%M").ok(),
            14 => NaiveDateTime::parse_from_str(text, "%Y%m%d%H%M%S").ok(),
            _ => NaiveDateTime::parse_from_str(text, "%Y%m%d%H%M%S%.f").ok(),
        }
    }
}

/// Number of significant bits in a big-endian two's complement integer.
fn integer_bits(bytes: &[u8]) -> usize {
    let mut rest = bytes;
    while rest.len() > 1 && rest[0] == 0 {
        rest = &rest[1..];
    }
    match rest.first() {
        Some(&first) => (rest.len() - 1) * 8 + (8 - first.leading_zeros() as usize),
        None => 0,
    }
}

impl<'a> fmt::Display for Primitive<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Primitive::Boolean(value) => value.fmt(f),
            Primitive::Integer(value) => value.fmt(f),
            Primitive::BigInteger(bytes) => {
                write!(f, "({} bit) {}", integer_bits(bytes), hex::encode_upper(bytes))
            }
            Primitive::BitString { unused, bits } => {
                let count = bits.len() * 8 - unused as usize;
                if count == 0 {
                    write!(f, "(0 bit)")
                } else if count <= 64 {
                    let digits: String = bits
                        .iter()
                        .map(|b| format!("{:08b}", b))
                        .collect::<String>()
                        .chars()
                        .take(count)
                        .collect();
                    write!(f, "({} bit) {}", count, digits)
                } else {
                    write!(f, "({} bit) {}", count, hex::encode_upper(bits))
                }
            }
            Primitive::OctetString(bytes) => {
                if bytes.is_empty() {
                    write!(f, "(0 byte)")
                } else {
                    write!(f, "({} byte) {}", bytes.len(), hex::encode_upper(bytes))
                }
            }
            Primitive::Null => Ok(()),
            Primitive::ObjectIdentifier(ref oid) => match oid.name() {
                Some(name) => write!(f, "{} {}", oid, name),
                None => write!(f, "{}", oid),
            },
            Primitive::RelativeOid(ref oid) => write!(f, "{}", oid),
            Primitive::Text(ref text) => f.write_str(text),
            Primitive::Time(ref time) => write!(f, "{} UTC", time.format("%Y-%m-%d %H:%M:%S")),
            Primitive::Raw(bytes) => f.write_str(&hex::encode_upper(bytes)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(number: u32, content: &[u8]) -> String {
        Primitive::parse(number, content).to_string()
    }

    #[test]
    fn test_boolean() {
        assert_eq!(show(universal::BOOLEAN, &[0xFF]), "true");
        assert_eq!(show(universal::BOOLEAN, &[0x00]), "false");
        assert_eq!(show(universal::BOOLEAN, &[0x01, 0x02]), "0102");
    }

    #[test]
    fn test_integer() {
        assert_eq!(show(universal::INTEGER, &[0x05]), "5");
        assert_eq!(show(universal::INTEGER, &[0x00, 0x80]), "128");
        assert_eq!(show(universal::INTEGER, &[0xFF]), "-1");
        assert_eq!(show(universal::INTEGER, &[0xFF, 0x7F]), "-129");
        assert_eq!(show(universal::ENUMERATED, &[0x02]), "2");
        assert_eq!(show(universal::INTEGER, &[]), "");
    }

    #[test]
    fn test_big_integer() {
        let serial = [0x00, 0x80, 0, 0, 0, 0, 0, 0, 0x01];
        assert_eq!(show(universal::INTEGER, &serial), "(64 bit) 008000000000000001");
    }

    #[test]
    fn test_bit_string() {
        assert_eq!(show(universal::BIT_STRING, &[0x07, 0x80]), "(1 bit) 1");
        assert_eq!(show(universal::BIT_STRING, &[0x00, 0xA5]), "(8 bit) 10100101");
        assert_eq!(show(universal::BIT_STRING, &[0x00]), "(0 bit)");
        assert_eq!(show(universal::BIT_STRING, &[0x08, 0x00]), "0800");
        let long = [0x00, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        assert_eq!(show(universal::BIT_STRING, &long), "(72 bit) 010203040506070809");
    }

    #[test]
    fn test_octet_string_and_null() {
        assert_eq!(show(universal::OCTET_STRING, &[0xDE, 0xAD]), "(2 byte) DEAD");
        assert_eq!(show(universal::OCTET_STRING, &[]), "(0 byte)");
        assert_eq!(Primitive::parse(universal::NULL, &[]), Primitive::Null);
        assert_eq!(show(universal::NULL, &[0x01]), "01");
    }

    #[test]
    fn test_object_identifier() {
        let content = [0x2B, 0x06, 0x01, 0x04, 0x01, 0x82, 0x37, 0x02, 0x01, 0x04];
        assert_eq!(
            show(universal::OBJECT_IDENTIFIER, &content),
            "1.3.6.1.4.1.311.2.1.4 SPC_INDIRECT_DATA_OBJID"
        );
        assert_eq!(show(universal::OBJECT_IDENTIFIER, &[0x2A, 0x86]), "2A86");
    }

    #[test]
    fn test_strings() {
        assert_eq!(show(universal::PRINTABLE_STRING, b"Contoso"), "Contoso");
        assert_eq!(show(universal::UTF8_STRING, "Zoë".as_bytes()), "Zoë");
        assert_eq!(show(universal::UTF8_STRING, &[0xFF]), "FF");
        assert_eq!(show(universal::BMP_STRING, &[0x00, 0x41, 0x00, 0x42]), "AB");
        assert_eq!(show(universal::BMP_STRING, &[0x00]), "00");
        assert_eq!(show(universal::UNIVERSAL_STRING, &[0, 0, 0, 0x43]), "C");
        assert_eq!(show(universal::TELETEX_STRING, &[0xE9]), "é");
        assert_eq!(show(universal::IA5_STRING, &[0xE9]), "E9");
    }

    #[test]
    fn test_times() {
        assert_eq!(show(universal::UTC_TIME, b"260207131915Z"), "2026-02-07 13:19:15 UTC");
        assert_eq!(show(universal::UTC_TIME, b"9901010000Z"), "1999-01-01 00:00:00 UTC");
        assert_eq!(
            show(universal::GENERALIZED_TIME, b"21260114131915Z"),
            "2126-01-14 13:19:15 UTC"
        );
        assert_eq!(show(universal::UTC_TIME, b"260207131915+0100"), "260207131915+0100");
    }

    #[test]
    fn test_unknown_type_is_hex() {
        assert_eq!(show(universal::REAL, &[0x80, 0x01]), "8001");
    }
}
