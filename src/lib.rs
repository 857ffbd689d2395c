//! A strict decoder for NTLM challenge messages.
//!
//! The server's CHALLENGE_MESSAGE carries the nonce, the negotiated flags and a list of AV-pairs
//! whose timestamp and flags decide how the client computes its NTLMv2 response. All of this comes
//! from the peer, so every offset and length in the message is checked before it is followed, and
//! any inconsistency rejects the whole message.
//!
//! Sample usage, decoding the challenge out of an HTTP `WWW-Authenticate` header:
//! ```
//! use base64::prelude::{BASE64_STANDARD, Engine};
//! use ntlmchallenge::{AvFlag, AvPair, ChallengeContents, ChallengeMessage, NegotiateFlags, Timestamp};
//!
//! # let server_side = ChallengeContents {
//! #     target_name: "EXAMPLE".to_owned(),
//! #     flags: NegotiateFlags::NEGOTIATE_UNICODE
//! #         | NegotiateFlags::REQUEST_TARGET
//! #         | NegotiateFlags::NEGOTIATE_NTLM
//! #         | NegotiateFlags::NEGOTIATE_TARGET_INFO,
//! #     challenge: *b"\x01\x23\x45\x67\x89\xab\xcd\xef",
//! #     target_information: vec![
//! #         AvPair::NbDomainName("EXAMPLE".to_owned()),
//! #         AvPair::Flags(AvFlag::MessageIntegrityCode),
//! #         AvPair::Timestamp(Timestamp::from_ticks(133_000_000_000_000_000)),
//! #     ].into(),
//! #     os_version: Default::default(),
//! # };
//! # let header_value = format!("NTLM {}", BASE64_STANDARD.encode(server_side.to_bytes().unwrap()));
//! let challenge_b64 = header_value
//!     .split(' ')
//!     .nth(1).expect("second chunk of challenge header missing");
//! let challenge_bytes = BASE64_STANDARD.decode(challenge_b64)
//!     .expect("base64 decoding challenge message failed");
//! let challenge = ChallengeMessage::decode(challenge_bytes)
//!     .expect("decoding challenge message failed");
//!
//! assert_eq!(challenge.server_challenge(), *b"\x01\x23\x45\x67\x89\xab\xcd\xef");
//! assert_eq!(challenge.target_name().unwrap().as_deref(), Some("EXAMPLE"));
//!
//! // these feed into the NTLMv2 response
//! let time = challenge.timestamp().unwrap_or_else(Timestamp::now);
//! let target_info = challenge.target_info_bytes().unwrap_or_default();
//! let mic_required = challenge.av_flags() == Some(AvFlag::MessageIntegrityCode);
//! # assert_eq!(time.ticks(), 133_000_000_000_000_000);
//! # assert!(!target_info.is_empty());
//! # assert!(mic_required);
//! ```


#[cfg(windows)]
mod encoding_windows;

#[cfg(not(windows))]
mod encoding_utf8;

pub mod av_pair;
pub mod bytes;
pub mod challenge;
pub mod error;
pub mod field;
pub mod flags;
mod strings;
pub mod timestamp;
pub mod version;


pub use crate::av_pair::{AvFlag, AvId, AvPair, AvPairList};
pub use crate::challenge::{ChallengeContents, ChallengeMessage, TargetInfo};
pub use crate::error::{ParsingError, StoringError};
pub use crate::field::VariableField;
pub use crate::flags::NegotiateFlags;
pub use crate::timestamp::Timestamp;
pub use crate::version::OsVersion;


/// The magic value at the start of every NTLMSSP data packet.
pub const NTLMSSP_MAGIC: [u8; 8] = *b"NTLMSSP\0";


/// The type of an NTLM message.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum MessageType {
    Negotiate,
    Challenge,
    Authenticate,
    Other(u32),
}
impl MessageType {
    /// Checks the signature of an NTLM message and returns its type without decoding anything
    /// else.
    pub fn peek(message: &[u8]) -> Result<Self, ParsingError> {
        if !bytes::range_equals(message, 0, &NTLMSSP_MAGIC) {
            return Err(ParsingError::InvalidSignature);
        }
        bytes::read_u32_le(message, NTLMSSP_MAGIC.len())
            .map(Self::from)
    }
}
impl From<MessageType> for u32 {
    fn from(t: MessageType) -> Self {
        match t {
            MessageType::Negotiate => 0x0000_0001,
            MessageType::Challenge => 0x0000_0002,
            MessageType::Authenticate => 0x0000_0003,
            MessageType::Other(n) => n,
        }
    }
}
impl From<u32> for MessageType {
    fn from(n: u32) -> Self {
        match n {
            0x0000_0001 => MessageType::Negotiate,
            0x0000_0002 => MessageType::Challenge,
            0x0000_0003 => MessageType::Authenticate,
            other => MessageType::Other(other),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek() {
        assert_eq!(MessageType::peek(b"NTLMSSP\0\x01\0\0\0"), Ok(MessageType::Negotiate));
        assert_eq!(MessageType::peek(b"NTLMSSP\0\x02\0\0\0rest"), Ok(MessageType::Challenge));
        assert_eq!(MessageType::peek(b"NTLMSSP\0\x03\0\0\0"), Ok(MessageType::Authenticate));
        assert_eq!(MessageType::peek(b"NTLMSSP\0\x09\0\0\0"), Ok(MessageType::Other(9)));
    }

    #[test]
    fn test_peek_rejects() {
        assert_eq!(MessageType::peek(b"NTLMSSQ\0\x02\0\0\0"), Err(ParsingError::InvalidSignature));
        assert_eq!(MessageType::peek(b"NTLM"), Err(ParsingError::InvalidSignature));
        assert_eq!(MessageType::peek(b"NTLMSSP\0\x02\0"), Err(ParsingError::FieldOutOfBounds { offset: 8 }));
    }
}
