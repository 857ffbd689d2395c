//! The NTLM CHALLENGE_MESSAGE, sent by the server in response to the client's Negotiate message.
//!
//! Layout of the fixed part (all integers little-endian, all offsets absolute from the start of
//! the message):
//!
//! ```plain
//!  0..8   signature "NTLMSSP\0"
//!  8..12  message type (2)
//! 12..20  TargetName field descriptor
//! 20..24  negotiate flags
//! 24..32  server challenge
//! 32..40  reserved
//! 40..48  TargetInfo field descriptor
//! 48..56  version (only meaningful with NEGOTIATE_VERSION)
//! 56..    payload
//! ```


use tracing::debug;

use crate::{MessageType, NTLMSSP_MAGIC};
use crate::av_pair::{AvFlag, AvPairList};
use crate::bytes::{range_equals, read_array, read_slice, read_u32_le};
use crate::error::{ParsingError, StoringError};
use crate::field::{resolve_field_at, VariableField};
use crate::flags::NegotiateFlags;
use crate::strings::{ntlm_bytes_to_string, string_to_ntlm_bytes};
use crate::timestamp::Timestamp;
use crate::version::OsVersion;


const MESSAGE_TYPE_OFFSET: usize = 8;
const TARGET_NAME_FIELDS_OFFSET: usize = 12;
const NEGOTIATE_FLAGS_OFFSET: usize = 20;
const SERVER_CHALLENGE_OFFSET: usize = 24;
const TARGET_INFO_FIELDS_OFFSET: usize = 40;
const VERSION_OFFSET: usize = 48;

/// Offset of the first payload byte in messages we write.
const PAYLOAD_OFFSET: usize = 56;


/// The TargetInfo field of a challenge message: where it was found and what it contained.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct TargetInfo {
    field: VariableField,
    pairs: AvPairList,
}
impl TargetInfo {
    /// The descriptor of the field, as read from the message header.
    pub fn field(&self) -> VariableField {
        self.field
    }

    /// The decoded AV-pairs.
    pub fn pairs(&self) -> &AvPairList {
        &self.pairs
    }
}


/// Parses the AV-pairs of a resolved TargetInfo field.
///
/// Some peers leave the terminating `MsvAvEOL` record out of the declared field length. If the
/// pairs fill the field exactly and an `MsvAvEOL` header follows directly in the message, that
/// header terminates the list. The field must hold at least one record, and the whole terminator
/// must still lie inside the message.
fn parse_target_info(raw: &[u8], field: VariableField, blob: &[u8]) -> Result<AvPairList, ParsingError> {
    // the field has been resolved, so its offset fits into usize
    let start = field.buffer_offset as usize;

    match AvPairList::parse_at(blob, start) {
        Err(ParsingError::UnterminatedAvPairList) => {
            let end = start + blob.len();
            // an empty field has no record the terminator could follow
            let trailing_eol = !blob.is_empty()
                && read_slice(raw, end, 4)
                    .map(|header| header[0..2] == [0x00, 0x00])
                    .unwrap_or(false);
            if !trailing_eol {
                return Err(ParsingError::UnterminatedAvPairList);
            }
            debug!("AV-pair terminator at offset {} lies outside the TargetInfo field", end);
            AvPairList::parse_at(read_slice(raw, start, blob.len() + 4)?, start)
        },
        other => other,
    }
}


/// A decoded NTLM Challenge message.
///
/// The message keeps the buffer it was decoded from; the raw TargetInfo blob and the raw message
/// are needed again when computing the NTLMv2 response and the message integrity code. Once
/// decoded, the message cannot be modified.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ChallengeMessage {
    raw: Vec<u8>,
    flags: NegotiateFlags,
    server_challenge: [u8; 8],
    target_info: Option<TargetInfo>,
    timestamp: Option<Timestamp>,
    av_flags: Option<AvFlag>,
}

impl ChallengeMessage {
    /// Decodes a challenge message, taking ownership of the buffer.
    ///
    /// Decoding either succeeds completely or fails with the first problem found.
    pub fn decode(raw: Vec<u8>) -> Result<Self, ParsingError> {
        Self::decode_owned(raw)
            .map_err(|e| {
                debug!("rejecting NTLM challenge message: {}", e);
                e
            })
    }

    fn decode_owned(raw: Vec<u8>) -> Result<Self, ParsingError> {
        if !range_equals(&raw, 0, &NTLMSSP_MAGIC) {
            return Err(ParsingError::InvalidSignature);
        }

        let message_type = read_u32_le(&raw, MESSAGE_TYPE_OFFSET)?;
        let expected: u32 = MessageType::Challenge.into();
        if message_type != expected {
            return Err(ParsingError::UnexpectedMessageType { expected, actual: message_type });
        }

        let flags = NegotiateFlags::from_wire(read_u32_le(&raw, NEGOTIATE_FLAGS_OFFSET)?);
        let server_challenge: [u8; 8] = read_array(&raw, SERVER_CHALLENGE_OFFSET)?;

        let target_info = if flags.has_target_info() {
            let (field, blob) = resolve_field_at(&raw, TARGET_INFO_FIELDS_OFFSET)?;
            let pairs = parse_target_info(&raw, field, blob)?;
            Some(TargetInfo { field, pairs })
        } else {
            None
        };

        let timestamp = target_info.as_ref().and_then(|ti| ti.pairs.timestamp());
        let av_flags = target_info.as_ref().and_then(|ti| ti.pairs.flags());

        debug!(
            "decoded NTLM challenge message: flags={:?}, AV-pairs={}, timestamp={}, av_flags={:?}",
            flags,
            target_info.as_ref().map_or(0, |ti| ti.pairs.len()),
            timestamp.is_some(),
            av_flags,
        );

        Ok(Self {
            raw,
            flags,
            server_challenge,
            target_info,
            timestamp,
            av_flags,
        })
    }

    /// The negotiate flags selected by the server.
    pub fn flags(&self) -> NegotiateFlags {
        self.flags
    }

    /// The 8-byte server nonce.
    pub fn server_challenge(&self) -> [u8; 8] {
        self.server_challenge
    }

    /// The TargetInfo field, if the server set NEGOTIATE_TARGET_INFO.
    pub fn target_info(&self) -> Option<&TargetInfo> {
        self.target_info.as_ref()
    }

    /// The AV-pairs of the TargetInfo field, if present.
    pub fn av_pairs(&self) -> Option<&AvPairList> {
        self.target_info.as_ref().map(|ti| &ti.pairs)
    }

    /// The undecoded TargetInfo blob as delimited by its field descriptor. This is what the
    /// NTLMv2 response is computed over.
    pub fn target_info_bytes(&self) -> Option<&[u8]> {
        self.target_info.as_ref()
            .and_then(|ti| ti.field.resolve(&self.raw).ok())
    }

    /// The server's `MsvAvTimestamp`, if it sent one.
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }

    /// The server's `MsvAvFlags`, if it sent them.
    pub fn av_flags(&self) -> Option<AvFlag> {
        self.av_flags
    }

    /// Decodes the target name.
    ///
    /// Returns `None` if the server did not set REQUEST_TARGET. The TargetName field is only
    /// validated here, so a broken name does not prevent the rest of the message from being used.
    pub fn target_name(&self) -> Result<Option<String>, ParsingError> {
        if !self.flags.contains(NegotiateFlags::REQUEST_TARGET) {
            return Ok(None);
        }
        let (field, bytes) = resolve_field_at(&self.raw, TARGET_NAME_FIELDS_OFFSET)?;
        ntlm_bytes_to_string(self.flags, bytes, field.buffer_offset as usize)
            .map(Some)
    }

    /// Decodes the server's version information, if NEGOTIATE_VERSION is set.
    pub fn os_version(&self) -> Result<Option<OsVersion>, ParsingError> {
        if !self.flags.has_version() {
            return Ok(None);
        }
        OsVersion::read_at(&self.raw, VERSION_OFFSET)
            .map(Some)
    }

    /// The message as it was received.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Returns the buffer the message was decoded from.
    pub fn into_bytes(self) -> Vec<u8> {
        self.raw
    }
}
impl TryFrom<Vec<u8>> for ChallengeMessage {
    type Error = ParsingError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::decode(value)
    }
}
impl TryFrom<&[u8]> for ChallengeMessage {
    type Error = ParsingError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::decode(Vec::from(value))
    }
}


/// The contents of a challenge message to be sent.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ChallengeContents {
    /// The name of the server or domain. Only written if REQUEST_TARGET is set.
    pub target_name: String,

    /// The negotiate flags selected by the server.
    pub flags: NegotiateFlags,

    /// The server nonce.
    pub challenge: [u8; 8],

    /// The AV-pairs, without terminator. Only written if NEGOTIATE_TARGET_INFO is set.
    pub target_information: AvPairList,

    /// Version information. Only written if NEGOTIATE_VERSION is set; zeroes otherwise.
    pub os_version: OsVersion,
}

/// Appends a field descriptor to the header and its data to the payload.
///
/// `payload_offset` is the absolute offset in the message at which the next payload data will
/// land; it is advanced past `data`.
fn append_field(header: &mut Vec<u8>, payload: &mut Vec<u8>, payload_offset: &mut u32, data: &[u8]) -> Result<(), StoringError> {
    let field = VariableField::for_slice(data, *payload_offset)?;
    header.extend_from_slice(&field.to_bytes());
    payload.extend_from_slice(data);
    *payload_offset += u32::from(field.length);
    Ok(())
}

impl ChallengeContents {
    /// Serializes the challenge message into bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoringError> {
        let flags = self.flags;
        let mut payload_offset = PAYLOAD_OFFSET as u32;
        let mut ret = Vec::with_capacity(PAYLOAD_OFFSET);
        let mut payload = Vec::new();

        let target_name = if flags.contains(NegotiateFlags::REQUEST_TARGET) {
            string_to_ntlm_bytes(flags, &self.target_name)?
        } else {
            Vec::new()
        };
        let target_info = if flags.has_target_info() {
            self.target_information.to_bytes()?
        } else {
            Vec::new()
        };
        let version = if flags.has_version() {
            self.os_version.to_bytes()
        } else {
            [0u8; OsVersion::SIZE]
        };

        ret.extend_from_slice(&NTLMSSP_MAGIC);
        ret.extend_from_slice(&u32::from(MessageType::Challenge).to_le_bytes());
        append_field(&mut ret, &mut payload, &mut payload_offset, &target_name)?;
        ret.extend_from_slice(&flags.bits().to_le_bytes());
        ret.extend_from_slice(&self.challenge);
        ret.extend_from_slice(&[0u8; 8]); // reserved
        append_field(&mut ret, &mut payload, &mut payload_offset, &target_info)?;
        ret.extend_from_slice(&version);
        ret.append(&mut payload);
        Ok(ret)
    }
}
