//! Errors raised while decoding or encoding NTLM challenge messages.


use thiserror::Error;


/// An error that may occur while parsing an NTLM challenge message.
///
/// Every variant is terminal for the message being decoded; the decoder never returns a partially
/// populated message.
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum ParsingError {
    /// The message does not start with `NTLMSSP\0`.
    #[error("invalid NTLMSSP signature")]
    InvalidSignature,

    /// The message type field holds an unexpected value.
    #[error("unexpected message type (expected {expected}, obtained {actual})")]
    UnexpectedMessageType { expected: u32, actual: u32 },

    /// A read or a referenced field would extend past the end of its enclosing buffer.
    #[error("field at offset {offset} extends past the end of its buffer")]
    FieldOutOfBounds { offset: usize },

    /// The AV-pair list ended without an `MsvAvEOL` record.
    #[error("AV-pair list is not terminated")]
    UnterminatedAvPairList,

    /// The `MsvAvFlags` AV-pair holds a value that is not a known flag.
    #[error("invalid MsvAvFlags value {raw:#010x}")]
    InvalidFlagValue { raw: u32 },

    /// A fixed-size AV-pair declares the wrong value length.
    #[error("AV-pair {id} has invalid length {length}")]
    InvalidAvPairLength { id: u16, length: u16 },

    /// A string field is not valid UTF-16LE.
    #[error("string at offset {offset} is not valid UTF-16LE")]
    InvalidUtf16 { offset: usize },

    /// A string field cannot be decoded using the current OEM encoding.
    #[error("failed to decode value with the current OEM encoding: {value:?}")]
    InvalidOemEncoding { value: Vec<u8> },

    /// Neither Unicode nor OEM encoding was negotiated for a non-empty string field.
    #[error("neither Unicode nor OEM encoding was selected")]
    NeitherUnicodeNorOem,
}


/// An error that may occur while writing an NTLM challenge message.
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum StoringError {
    /// The string cannot be encoded using the OEM encoding.
    #[error("failed to encode {string:?} using OEM encoding")]
    NonOemEncodable { string: String },

    /// Neither Unicode nor OEM encoding was selected.
    #[error("neither Unicode nor OEM encoding was selected")]
    NeitherUnicodeNorOem,

    /// A field does not fit into its 16-bit length prefix.
    #[error("field of {length} bytes does not fit into a 16-bit length")]
    FieldTooLong { length: usize },
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            ParsingError::UnexpectedMessageType { expected: 2, actual: 3 }.to_string(),
            "unexpected message type (expected 2, obtained 3)",
        );
        assert_eq!(
            ParsingError::InvalidFlagValue { raw: 3 }.to_string(),
            "invalid MsvAvFlags value 0x00000003",
        );
        assert_eq!(
            StoringError::FieldTooLong { length: 70000 }.to_string(),
            "field of 70000 bytes does not fit into a 16-bit length",
        );
    }
}
