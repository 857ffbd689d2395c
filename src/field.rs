//! Variable-length field descriptors pointing into the payload of an NTLM message.


use crate::bytes::{read_slice, read_u16_le, read_u32_le};
use crate::error::{ParsingError, StoringError};


/// An NTLM variable field descriptor, pointing to data contained later in the message.
///
/// `buffer_offset` is counted from the start of the whole message, not from the start of the
/// payload.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct VariableField {
    pub length: u16,
    pub max_length: u16,
    pub buffer_offset: u32,
}

impl VariableField {
    /// Size of the descriptor on the wire.
    pub const SIZE: usize = 8;

    /// Generates a descriptor for the given slice of bytes located at `buffer_offset`.
    pub fn for_slice(slice: &[u8], buffer_offset: u32) -> Result<Self, StoringError> {
        let length: u16 = slice.len()
            .try_into()
            .or(Err(StoringError::FieldTooLong { length: slice.len() }))?;
        Ok(Self {
            length,
            max_length: length,
            buffer_offset,
        })
    }

    /// Reads the 8-byte descriptor stored at `offset` within `message`.
    pub fn read_at(message: &[u8], offset: usize) -> Result<Self, ParsingError> {
        // fail on the descriptor itself before looking at any of its parts
        read_slice(message, offset, Self::SIZE)?;

        Ok(Self {
            length: read_u16_le(message, offset)?,
            max_length: read_u16_le(message, offset + 2)?,
            buffer_offset: read_u32_le(message, offset + 4)?,
        })
    }

    /// Serializes the descriptor into bytes.
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut ret = [0u8; 8];
        ret[0..2].copy_from_slice(&self.length.to_le_bytes());
        ret[2..4].copy_from_slice(&self.max_length.to_le_bytes());
        ret[4..8].copy_from_slice(&self.buffer_offset.to_le_bytes());
        ret
    }

    /// Returns the part of `message` this descriptor points to.
    ///
    /// Fails with the descriptor's buffer offset if `buffer_offset + length` exceeds the message.
    /// `max_length` is not consulted.
    pub fn resolve<'a>(&self, message: &'a [u8]) -> Result<&'a [u8], ParsingError> {
        let offset: usize = self.buffer_offset.try_into()
            .or(Err(ParsingError::FieldOutOfBounds { offset: usize::MAX }))?;
        read_slice(message, offset, self.length.into())
    }
}

/// Reads the descriptor at `offset` and resolves it against `message` in one step.
pub fn resolve_field_at(message: &[u8], offset: usize) -> Result<(VariableField, &[u8]), ParsingError> {
    let field = VariableField::read_at(message, offset)?;
    let data = field.resolve(message)?;
    Ok((field, data))
}


#[cfg(test)]
mod tests {
    use super::*;

    fn message_with_descriptor(length: u16, max_length: u16, buffer_offset: u32) -> Vec<u8> {
        let mut msg = vec![0xEE; 4];
        msg.extend_from_slice(&VariableField { length, max_length, buffer_offset }.to_bytes());
        msg.extend_from_slice(b"abcdef");
        msg
    }

    #[test]
    fn test_resolve() {
        let msg = message_with_descriptor(3, 3, 13);
        let (field, data) = resolve_field_at(&msg, 4).unwrap();
        assert_eq!(field, VariableField { length: 3, max_length: 3, buffer_offset: 13 });
        assert_eq!(data, b"bcd");
    }

    #[test]
    fn test_max_length_is_informational() {
        let msg = message_with_descriptor(2, 0xFFFF, 16);
        let (_field, data) = resolve_field_at(&msg, 4).unwrap();
        assert_eq!(data, b"ef");
    }

    #[test]
    fn test_field_exactly_at_end() {
        let msg = message_with_descriptor(6, 6, 12);
        assert_eq!(resolve_field_at(&msg, 4).unwrap().1, b"abcdef");

        let msg = message_with_descriptor(0, 0, 18);
        assert_eq!(resolve_field_at(&msg, 4).unwrap().1, b"");
    }

    #[test]
    fn test_field_past_end() {
        let msg = message_with_descriptor(7, 7, 12);
        assert_eq!(resolve_field_at(&msg, 4), Err(ParsingError::FieldOutOfBounds { offset: 12 }));

        let msg = message_with_descriptor(0, 0, 19);
        assert_eq!(resolve_field_at(&msg, 4), Err(ParsingError::FieldOutOfBounds { offset: 19 }));

        let msg = message_with_descriptor(0xFFFF, 0xFFFF, 0xFFFF_FFFF);
        assert_eq!(
            resolve_field_at(&msg, 4),
            Err(ParsingError::FieldOutOfBounds { offset: 0xFFFF_FFFF }),
        );
    }

    #[test]
    fn test_truncated_descriptor() {
        let msg = [0u8; 10];
        assert_eq!(VariableField::read_at(&msg, 4), Err(ParsingError::FieldOutOfBounds { offset: 4 }));
    }

    #[test]
    fn test_for_slice() {
        let field = VariableField::for_slice(&[0u8; 12], 56).unwrap();
        assert_eq!(field.to_bytes(), [12, 0, 12, 0, 56, 0, 0, 0]);
        assert_eq!(
            VariableField::for_slice(&vec![0u8; 0x1_0000], 56),
            Err(StoringError::FieldTooLong { length: 0x1_0000 }),
        );
    }
}
