//! The VERSION structure optionally carried in NTLM messages.


use crate::bytes::{read_array, read_u16_le};
use crate::error::ParsingError;


/// The version of the sender's operating system as well as the NTLM revision used.
///
/// Only meant for debugging; it never influences message processing.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct OsVersion {
    pub major_version: u8,
    pub minor_version: u8,
    pub build_number: u16,
    pub reserved: [u8; 3],
    pub ntlm_revision: u8,
}
impl OsVersion {
    /// Size of the structure on the wire.
    pub const SIZE: usize = 8;

    /// Reads the structure located at `offset` within `message`.
    pub fn read_at(message: &[u8], offset: usize) -> Result<Self, ParsingError> {
        let raw: [u8; 8] = read_array(message, offset)?;
        Ok(Self {
            major_version: raw[0],
            minor_version: raw[1],
            build_number: read_u16_le(&raw, 2)?,
            reserved: [raw[4], raw[5], raw[6]],
            ntlm_revision: raw[7],
        })
    }

    /// Serializes the structure into bytes.
    pub fn to_bytes(&self) -> [u8; 8] {
        let build = self.build_number.to_le_bytes();
        [
            self.major_version,
            self.minor_version,
            build[0],
            build[1],
            self.reserved[0],
            self.reserved[1],
            self.reserved[2],
            self.ntlm_revision,
        ]
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_server_2019() {
        let msg = [0xFF, 0x0A, 0x00, 0x63, 0x45, 0x00, 0x00, 0x00, 0x0F];
        let version = OsVersion::read_at(&msg, 1).unwrap();
        assert_eq!(version, OsVersion {
            major_version: 10,
            minor_version: 0,
            build_number: 17763,
            reserved: [0, 0, 0],
            ntlm_revision: 15,
        });
        assert_eq!(version.to_bytes(), msg[1..]);
    }

    #[test]
    fn test_truncated() {
        assert_eq!(OsVersion::read_at(&[0u8; 10], 4), Err(ParsingError::FieldOutOfBounds { offset: 4 }));
    }
}
