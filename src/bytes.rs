//! Bounds-checked reads from immutable byte buffers.
//!
//! Every function takes the buffer and an absolute offset; nothing here keeps a cursor of its own.
//! A read that would extend past the end of the buffer fails with
//! [`ParsingError::FieldOutOfBounds`] carrying the offset at which the read started.


use crate::error::ParsingError;


/// Returns `length` bytes of `buf` starting at `offset`.
pub fn read_slice(buf: &[u8], offset: usize, length: usize) -> Result<&[u8], ParsingError> {
    let end = offset.checked_add(length)
        .ok_or(ParsingError::FieldOutOfBounds { offset })?;
    buf.get(offset..end)
        .ok_or(ParsingError::FieldOutOfBounds { offset })
}

/// Returns a fixed-size copy of `N` bytes of `buf` starting at `offset`.
pub fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N], ParsingError> {
    let mut ret = [0u8; N];
    ret.copy_from_slice(read_slice(buf, offset, N)?);
    Ok(ret)
}

/// Reads a little-endian `u16` at `offset`.
pub fn read_u16_le(buf: &[u8], offset: usize) -> Result<u16, ParsingError> {
    read_array(buf, offset).map(u16::from_le_bytes)
}

/// Reads a little-endian `u32` at `offset`.
pub fn read_u32_le(buf: &[u8], offset: usize) -> Result<u32, ParsingError> {
    read_array(buf, offset).map(u32::from_le_bytes)
}

/// Checks whether `buf` contains `expected` at `offset`.
///
/// A range that does not fit into `buf` compares unequal.
pub fn range_equals(buf: &[u8], offset: usize, expected: &[u8]) -> bool {
    match read_slice(buf, offset, expected.len()) {
        Ok(actual) => actual == expected,
        Err(_) => false,
    }
}
