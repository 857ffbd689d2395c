//! OEM string handling on operating systems other than Windows.
//!
//! There is no system-wide OEM code page outside Windows. Servers that negotiate OEM strings on
//! such systems almost always send UTF-8, so that is what we assume.


/// Decodes an OEM string from a challenge message payload.
pub fn decode_oem(oem_bytes: &[u8]) -> Option<String> {
    std::str::from_utf8(oem_bytes).ok().map(str::to_owned)
}


/// Encodes a string for an OEM payload field.
pub fn encode_oem(string: &str) -> Option<Vec<u8>> {
    Some(string.as_bytes().to_vec())
}
