use crate::error::DecodeError;

/// A BER length as read from the length octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Definite(usize),
    Indefinite,
}

/// A byte buffer meant for reading BER encodings.
///
/// The buffer always wraps a prefix of the original input, so `index()` is
/// an absolute offset into that input. Windows over a constructed value's
/// content keep this property.
///
/// Example usage:
///
/// ```
/// use pe2pkcs7_schema::{ByteBuffer, Length};
/// let mut bb = ByteBuffer::new(&[0x82, 0x01, 0x00]);
/// assert_eq!(bb.read_length(), Ok(Length::Definite(256)));
/// assert!(bb.is_empty());
/// ```
///
#[derive(Debug, Clone)]
pub struct ByteBuffer<'a> {
    data:  &'a [u8],
    index: usize,
}

impl<'a> ByteBuffer<'a> {
    /// Create a new ByteBuffer that wraps the provided byte slice, starting
    /// at index 0.
    pub fn new(data: &'a [u8]) -> ByteBuffer<'a> {
        ByteBuffer { data, index: 0 }
    }

    /// Create a ByteBuffer positioned at `index`. The index may point past
    /// the end; the first read will then fail with `Truncated`.
    pub fn at(data: &'a [u8], index: usize) -> ByteBuffer<'a> {
        ByteBuffer { data, index }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Retrieves the current index into the underlying byte slice.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of bytes left before the end of this buffer.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.index)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// A buffer over the next `len` bytes, sharing this buffer's origin so
    /// offsets stay absolute. Fails if fewer than `len` bytes remain.
    pub fn window(&self, len: usize) -> Result<ByteBuffer<'a>, DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::LengthOverrun {
                offset:    self.index,
                length:    len,
                available: self.remaining(),
            });
        }
        Ok(ByteBuffer {
            data:  &self.data[..self.index + len],
            index: self.index,
        })
    }

    /// True when the next two bytes are an end-of-contents marker.
    pub fn at_end_of_contents(&self) -> bool {
        self.remaining() >= 2 && self.data[self.index] == 0 && self.data[self.index + 1] == 0
    }

    /// Try to read a byte starting at the current index.
    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        if self.index >= self.data.len() {
            Err(DecodeError::Truncated { offset: self.index })
        } else {
            let value = self.data[self.index];
            self.index += 1;
            Ok(value)
        }
    }

    /// Try to read `len` bytes starting at the current index.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            Err(DecodeError::LengthOverrun {
                offset:    self.index,
                length:    len,
                available: self.remaining(),
            })
        } else {
            let value = &self.data[self.index..self.index + len];
            self.index += len;
            Ok(value)
        }
    }

    /// Try to read a base-128 number (high bit set on every octet but the
    /// last, most significant group first). Used for high tag numbers and
    /// OID arcs.
    pub fn read_base128(&mut self) -> Result<u64, DecodeError> {
        let start = self.index;
        let mut result: u64 = 0;

        loop {
            let byte = self.read_byte()?;
            if result > (u64::MAX >> 7) {
                return Err(DecodeError::NumberOverflow { offset: start });
            }
            result = (result << 7) | (byte & 0x7F) as u64;

            if (byte & 0x80) == 0 {
                return Ok(result);
            }
        }
    }

    /// Try to read BER length octets starting at the current index.
    pub fn read_length(&mut self) -> Result<Length, DecodeError> {
        let start = self.index;
        let first = self.read_byte()?;

        match first {
            0x00..=0x7F => Ok(Length::Definite(first as usize)),
            0x80 => Ok(Length::Indefinite),
            0xFF => Err(DecodeError::ReservedLength { offset: start }),
            _ => {
                let octets = (first & 0x7F) as usize;
                if octets > std::mem::size_of::<u64>() {
                    return Err(DecodeError::UnsupportedLength { offset: start, octets });
                }
                let mut length: u64 = 0;
                for _ in 0..octets {
                    length = (length << 8) | self.read_byte()? as u64;
                }
                usize::try_from(length)
                    .map(Length::Definite)
                    .map_err(|_| DecodeError::UnsupportedLength { offset: start, octets })
            }
        }
    }
}

#[test]
fn read_byte() {
    let read = |bytes| ByteBuffer::new(bytes).read_byte();
    assert_eq!(read(&[]), Err(DecodeError::Truncated { offset: 0 }));
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[1]), Ok(1));
    assert_eq!(read(&[254]), Ok(254));
    assert_eq!(read(&[255]), Ok(255));
}

#[test]
fn read_bytes() {
    let read = |bytes, len| ByteBuffer::new(bytes).read_bytes(len);
    assert_eq!(read(&[], 0), Ok(vec![].as_slice()));
    assert!(read(&[], 1).is_err());
    assert_eq!(read(&[0], 0), Ok(vec![].as_slice()));
    assert_eq!(read(&[0], 1), Ok(vec![0].as_slice()));
    assert_eq!(
        read(&[0], 2),
        Err(DecodeError::LengthOverrun { offset: 0, length: 2, available: 1 })
    );

    let mut bb = ByteBuffer::new(&[1, 2, 3, 4, 5]);
    assert_eq!(bb.read_bytes(3), Ok(vec![1, 2, 3].as_slice()));
    assert_eq!(bb.read_bytes(2), Ok(vec![4, 5].as_slice()));
    assert!(bb.read_bytes(1).is_err());
}

#[test]
fn read_base128() {
    let read = |bytes| ByteBuffer::new(bytes).read_base128();
    assert_eq!(read(&[]), Err(DecodeError::Truncated { offset: 0 }));
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[127]), Ok(127));
    assert_eq!(read(&[128]), Err(DecodeError::Truncated { offset: 1 }));
    assert_eq!(read(&[129, 0]), Ok(128));
    assert_eq!(read(&[134, 72]), Ok(840));
    assert_eq!(read(&[134, 247, 13]), Ok(113549));
    assert_eq!(
        read(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F]),
        Err(DecodeError::NumberOverflow { offset: 0 })
    );
}

#[test]
fn read_length() {
    let read = |bytes| ByteBuffer::new(bytes).read_length();
    assert_eq!(read(&[]), Err(DecodeError::Truncated { offset: 0 }));
    assert_eq!(read(&[0x00]), Ok(Length::Definite(0)));
    assert_eq!(read(&[0x7F]), Ok(Length::Definite(127)));
    assert_eq!(read(&[0x80]), Ok(Length::Indefinite));
    assert_eq!(read(&[0x81, 0x80]), Ok(Length::Definite(128)));
    assert_eq!(read(&[0x82, 0x01, 0x00]), Ok(Length::Definite(256)));
    assert_eq!(read(&[0x84, 0x00, 0x00, 0x00, 0x05]), Ok(Length::Definite(5)));
    assert_eq!(read(&[0x82, 0x01]), Err(DecodeError::Truncated { offset: 2 }));
    assert_eq!(read(&[0xFF]), Err(DecodeError::ReservedLength { offset: 0 }));
    assert_eq!(
        read(&[0x89, 1, 2, 3, 4, 5, 6, 7, 8, 9]),
        Err(DecodeError::UnsupportedLength { offset: 0, octets: 9 })
    );
}

#[test]
fn window_keeps_absolute_offsets() {
    let mut bb = ByteBuffer::new(&[9, 1, 2, 3, 4]);
    assert_eq!(bb.read_byte(), Ok(9));

    let mut window = bb.window(2).unwrap();
    assert_eq!(window.index(), 1);
    assert_eq!(window.read_bytes(2), Ok(vec![1, 2].as_slice()));
    assert!(window.is_empty());
    assert_eq!(window.read_byte(), Err(DecodeError::Truncated { offset: 3 }));

    assert!(bb.window(5).is_err());
}

#[test]
fn end_of_contents() {
    assert!(ByteBuffer::new(&[0, 0]).at_end_of_contents());
    assert!(!ByteBuffer::new(&[0]).at_end_of_contents());
    assert!(!ByteBuffer::new(&[0, 1]).at_end_of_contents());
    assert!(ByteBuffer::at(&[5, 0, 0], 1).at_end_of_contents());
}
