//! Conversions between NTLM wire strings and Rust strings.


use crate::error::{ParsingError, StoringError};
use crate::flags::NegotiateFlags;

#[cfg(windows)]
use crate::encoding_windows::{decode_oem, encode_oem};

#[cfg(not(windows))]
use crate::encoding_utf8::{decode_oem, encode_oem};


/// Converts UTF-16 values stored as bytes in little-endian format into a string.
///
/// Odd lengths and unpaired surrogates are rejected. `offset` is only used for error reporting.
pub(crate) fn utf16_le_bytes_to_string(bytes: &[u8], offset: usize) -> Result<String, ParsingError> {
    if bytes.len() % 2 != 0 {
        return Err(ParsingError::InvalidUtf16 { offset });
    }
    let units = bytes.chunks_exact(2)
        .map(|chk| u16::from_le_bytes([chk[0], chk[1]]));
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .or(Err(ParsingError::InvalidUtf16 { offset }))
}

/// Converts a string into UTF-16 code units in little-endian byte order.
pub(crate) fn string_to_utf16_le_bytes(string: &str) -> Vec<u8> {
    string.encode_utf16()
        .flat_map(|w| w.to_le_bytes())
        .collect()
}

/// Decodes a payload string using UTF-16 or the OEM encoding, depending on the `flags`.
pub(crate) fn ntlm_bytes_to_string(flags: NegotiateFlags, bytes: &[u8], offset: usize) -> Result<String, ParsingError> {
    if bytes.is_empty() {
        return Ok(String::new());
    }

    if flags.contains(NegotiateFlags::NEGOTIATE_UNICODE) {
        utf16_le_bytes_to_string(bytes, offset)
    } else if flags.contains(NegotiateFlags::NEGOTIATE_OEM) {
        decode_oem(bytes)
            .ok_or_else(|| ParsingError::InvalidOemEncoding { value: Vec::from(bytes) })
    } else {
        Err(ParsingError::NeitherUnicodeNorOem)
    }
}

/// Encodes a payload string using UTF-16 or the OEM encoding, depending on the `flags`.
pub(crate) fn string_to_ntlm_bytes(flags: NegotiateFlags, string: &str) -> Result<Vec<u8>, StoringError> {
    if flags.contains(NegotiateFlags::NEGOTIATE_UNICODE) {
        Ok(string_to_utf16_le_bytes(string))
    } else if flags.contains(NegotiateFlags::NEGOTIATE_OEM) {
        encode_oem(string)
            .ok_or_else(|| StoringError::NonOemEncodable { string: string.to_owned() })
    } else {
        Err(StoringError::NeitherUnicodeNorOem)
    }
}
