use pe2pkcs7_schema::{decode, DecodeError};
use proptest::prelude::*;

/// Encodes `len` in long form using exactly `octets` length octets.
fn long_form(len: usize, octets: usize) -> Vec<u8> {
    let mut header = vec![0x04, 0x80 | octets as u8];
    for i in (0..octets).rev() {
        header.push(((len as u64) >> (8 * i)) as u8);
    }
    header
}

proptest! {
    #[test]
    fn short_form_length_is_recovered(len in 0usize..=127, fill in any::<u8>()) {
        let mut data = vec![0x04, len as u8];
        data.extend(std::iter::repeat(fill).take(len));

        let node = decode(&data, 0).unwrap();
        prop_assert_eq!(node.content_len(), len);
        prop_assert_eq!(node.content().len(), len);
        prop_assert_eq!(node.header_len(), 2);
    }

    #[test]
    fn long_form_length_is_recovered(len in 0usize..2048, extra in 0usize..=6) {
        let minimal = if len < 0x100 { 1 } else { 2 };
        let octets = minimal + extra;
        let mut data = long_form(len, octets);
        data.extend(std::iter::repeat(0xA5).take(len));

        let node = decode(&data, 0).unwrap();
        prop_assert_eq!(node.content_len(), len);
        prop_assert_eq!(node.header_len(), 2 + octets);
        prop_assert_eq!(node.len(), data.len());
    }

    #[test]
    fn overlong_lengths_report_content_offset(len in 1usize..512, missing in 1usize..16) {
        let missing = missing.min(len);
        let mut data = long_form(len, 2);
        data.extend(std::iter::repeat(0).take(len - missing));

        let err = decode(&data, 0).unwrap_err();
        prop_assert_eq!(err, DecodeError::LengthOverrun {
            offset: 4,
            length: len,
            available: len - missing,
        });
    }
}

#[test]
fn integer_without_content_fails_at_offset_two() {
    let err = decode(&[0x02, 0x01], 0).unwrap_err();
    assert_eq!(err.offset(), 2);
}
