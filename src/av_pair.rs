//! AV-pairs: the attribute-value list carried in the TargetInfo field of a challenge message.
//!
//! On the wire, the list is a sequence of records of the form
//!
//! ```plain
//! ┌──────────┬───────────┬───────────────┐       ┌──────────┬───────────┐
//! │ id (u16) │ len (u16) │ value (len B) │  ...  │  0x0000  │ len (u16) │
//! └──────────┴───────────┴───────────────┘       └──────────┴───────────┘
//! ```
//!
//! terminated by a record with id `MsvAvEOL` (0). The list is supplied by the server and must be
//! treated as hostile: every record is bounds-checked against the enclosing TargetInfo buffer
//! before any of its bytes are looked at.


use tracing::trace;

use crate::bytes::{read_array, read_slice, read_u16_le};
use crate::error::{ParsingError, StoringError};
use crate::strings::{string_to_utf16_le_bytes, utf16_le_bytes_to_string};
use crate::timestamp::Timestamp;


/// Size of the id and length prefix of every AV-pair.
const HEADER_LEN: usize = 4;


/// The identifier of an AV-pair.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum AvId {
    Eol,
    NbComputerName,
    NbDomainName,
    DnsComputerName,
    DnsDomainName,
    DnsTreeName,
    Flags,
    Timestamp,
    SingleHost,
    TargetName,
    ChannelBindings,
    Unknown(u16),
}
impl From<AvId> for u16 {
    fn from(id: AvId) -> Self {
        match id {
            AvId::Eol => 0x0000,
            AvId::NbComputerName => 0x0001,
            AvId::NbDomainName => 0x0002,
            AvId::DnsComputerName => 0x0003,
            AvId::DnsDomainName => 0x0004,
            AvId::DnsTreeName => 0x0005,
            AvId::Flags => 0x0006,
            AvId::Timestamp => 0x0007,
            AvId::SingleHost => 0x0008,
            AvId::TargetName => 0x0009,
            AvId::ChannelBindings => 0x000A,
            AvId::Unknown(w) => w,
        }
    }
}
impl From<u16> for AvId {
    fn from(w: u16) -> Self {
        match w {
            0x0000 => AvId::Eol,
            0x0001 => AvId::NbComputerName,
            0x0002 => AvId::NbDomainName,
            0x0003 => AvId::DnsComputerName,
            0x0004 => AvId::DnsDomainName,
            0x0005 => AvId::DnsTreeName,
            0x0006 => AvId::Flags,
            0x0007 => AvId::Timestamp,
            0x0008 => AvId::SingleHost,
            0x0009 => AvId::TargetName,
            0x000A => AvId::ChannelBindings,
            other => AvId::Unknown(other),
        }
    }
}


/// The value of an `MsvAvFlags` AV-pair.
///
/// The value decides whether the client has to supply a message integrity code, so a value that
/// is not listed here is rejected instead of being mapped to some default.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum AvFlag {
    /// The server's account authentication is constrained.
    AccountAuthenticationConstrained,

    /// The client provides a message integrity code in the Authenticate message.
    MessageIntegrityCode,

    /// The target SPN was supplied by an untrusted source.
    UntrustedSpnSource,
}
impl AvFlag {
    /// Maps the raw 32-bit value onto a flag.
    pub fn from_raw(raw: u32) -> Result<Self, ParsingError> {
        match raw {
            0x0000_0001 => Ok(Self::AccountAuthenticationConstrained),
            0x0000_0002 => Ok(Self::MessageIntegrityCode),
            0x0000_0004 => Ok(Self::UntrustedSpnSource),
            other => Err(ParsingError::InvalidFlagValue { raw: other }),
        }
    }

    /// Returns the raw 32-bit value of this flag.
    pub fn to_raw(self) -> u32 {
        match self {
            Self::AccountAuthenticationConstrained => 0x0000_0001,
            Self::MessageIntegrityCode => 0x0000_0002,
            Self::UntrustedSpnSource => 0x0000_0004,
        }
    }
}


/// A decoded AV-pair.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum AvPair {
    NbComputerName(String),
    NbDomainName(String),
    DnsComputerName(String),
    DnsDomainName(String),
    DnsTreeName(String),
    Flags(AvFlag),
    Timestamp(Timestamp),
    SingleHost(Vec<u8>),
    TargetName(String),
    ChannelBindings(Vec<u8>),
}
impl AvPair {
    /// Returns the identifier of this pair.
    pub fn id(&self) -> AvId {
        match self {
            Self::NbComputerName(_) => AvId::NbComputerName,
            Self::NbDomainName(_) => AvId::NbDomainName,
            Self::DnsComputerName(_) => AvId::DnsComputerName,
            Self::DnsDomainName(_) => AvId::DnsDomainName,
            Self::DnsTreeName(_) => AvId::DnsTreeName,
            Self::Flags(_) => AvId::Flags,
            Self::Timestamp(_) => AvId::Timestamp,
            Self::SingleHost(_) => AvId::SingleHost,
            Self::TargetName(_) => AvId::TargetName,
            Self::ChannelBindings(_) => AvId::ChannelBindings,
        }
    }

    /// Decodes the value of a pair whose header has already been bounds-checked.
    ///
    /// `value_offset` is only used for error reporting. Returns `None` for ids whose value is not
    /// kept.
    fn decode(id: AvId, value: &[u8], value_offset: usize) -> Result<Option<Self>, ParsingError> {
        let pair = match id {
            AvId::NbComputerName => Self::NbComputerName(utf16_le_bytes_to_string(value, value_offset)?),
            AvId::NbDomainName => Self::NbDomainName(utf16_le_bytes_to_string(value, value_offset)?),
            AvId::DnsComputerName => Self::DnsComputerName(utf16_le_bytes_to_string(value, value_offset)?),
            AvId::DnsDomainName => Self::DnsDomainName(utf16_le_bytes_to_string(value, value_offset)?),
            AvId::DnsTreeName => Self::DnsTreeName(utf16_le_bytes_to_string(value, value_offset)?),
            AvId::TargetName => Self::TargetName(utf16_le_bytes_to_string(value, value_offset)?),
            AvId::Flags => {
                let raw = u32::from_le_bytes(fixed_value(id, value)?);
                Self::Flags(AvFlag::from_raw(raw)?)
            },
            AvId::Timestamp => Self::Timestamp(Timestamp::from_bytes(fixed_value(id, value)?)),
            AvId::SingleHost => Self::SingleHost(Vec::from(value)),
            AvId::ChannelBindings => Self::ChannelBindings(Vec::from(value)),
            AvId::Eol | AvId::Unknown(_) => return Ok(None),
        };
        Ok(Some(pair))
    }

    /// Returns the value of this pair as it is stored on the wire.
    fn value_bytes(&self) -> Vec<u8> {
        match self {
            Self::NbComputerName(s)
                | Self::NbDomainName(s)
                | Self::DnsComputerName(s)
                | Self::DnsDomainName(s)
                | Self::DnsTreeName(s)
                | Self::TargetName(s)
                => string_to_utf16_le_bytes(s),
            Self::Flags(f) => f.to_raw().to_le_bytes().to_vec(),
            Self::Timestamp(t) => t.as_bytes().to_vec(),
            Self::SingleHost(b) | Self::ChannelBindings(b) => b.clone(),
        }
    }

    /// Serializes the pair, including its id and length prefix.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoringError> {
        let value = self.value_bytes();
        let length: u16 = value.len()
            .try_into()
            .or(Err(StoringError::FieldTooLong { length: value.len() }))?;
        let id: u16 = self.id().into();

        let mut ret = Vec::with_capacity(HEADER_LEN + value.len());
        ret.extend_from_slice(&id.to_le_bytes());
        ret.extend_from_slice(&length.to_le_bytes());
        ret.extend_from_slice(&value);
        Ok(ret)
    }
}

/// Checks that a fixed-size value has exactly `N` bytes.
fn fixed_value<const N: usize>(id: AvId, value: &[u8]) -> Result<[u8; N], ParsingError> {
    if value.len() != N {
        return Err(ParsingError::InvalidAvPairLength {
            id: id.into(),
            // value was cut out using a u16 length
            length: value.len() as u16,
        });
    }
    read_array(value, 0)
}


/// An ordered list of AV-pairs, without the terminating `MsvAvEOL` record.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AvPairList(Vec<AvPair>);

impl AvPairList {
    /// Creates a list from pairs, which must not include the terminator.
    pub fn new(pairs: Vec<AvPair>) -> Self {
        Self(pairs)
    }

    /// Parses an AV-pair list from a buffer, reporting error offsets relative to the buffer.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParsingError> {
        Self::parse_at(bytes, 0)
    }

    /// Parses an AV-pair list from `bytes`, which start at offset `base` of the enclosing message.
    ///
    /// The list must end with an `MsvAvEOL` record before `bytes` runs out. Records with unknown
    /// ids are checked against the bounds and skipped.
    pub(crate) fn parse_at(bytes: &[u8], base: usize) -> Result<Self, ParsingError> {
        let mut pairs = Vec::new();
        let mut cursor: usize = 0;

        loop {
            if cursor == bytes.len() {
                return Err(ParsingError::UnterminatedAvPairList);
            }

            let record_offset = base.saturating_add(cursor);
            let out_of_bounds = ParsingError::FieldOutOfBounds { offset: record_offset };

            let header = read_slice(bytes, cursor, HEADER_LEN)
                .or(Err(out_of_bounds.clone()))?;
            let id = AvId::from(read_u16_le(header, 0)?);
            let length = read_u16_le(header, 2)?;

            if id == AvId::Eol {
                break;
            }

            let value = read_slice(bytes, cursor + HEADER_LEN, length.into())
                .or(Err(out_of_bounds))?;
            let value_offset = record_offset.saturating_add(HEADER_LEN);

            match AvPair::decode(id, value, value_offset)? {
                Some(pair) => {
                    trace!("AV-pair {:?} at offset {}", pair, record_offset);
                    pairs.push(pair);
                },
                None => {
                    trace!("skipping AV-pair {:?} ({} bytes) at offset {}", id, length, record_offset);
                },
            }

            // always moves forward: HEADER_LEN > 0
            cursor += HEADER_LEN + usize::from(length);
        }

        Ok(Self(pairs))
    }

    /// Serializes the list, including the terminating `MsvAvEOL` record.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoringError> {
        let mut ret = Vec::new();
        for pair in &self.0 {
            ret.append(&mut pair.to_bytes()?);
        }
        let eol: u16 = AvId::Eol.into();
        ret.extend_from_slice(&eol.to_le_bytes());
        ret.extend_from_slice(&0u16.to_le_bytes());
        Ok(ret)
    }

    /// The pairs in wire order.
    pub fn pairs(&self) -> &[AvPair] {
        &self.0
    }

    /// Iterates over the pairs in wire order.
    pub fn iter(&self) -> std::slice::Iter<'_, AvPair> {
        self.0.iter()
    }

    /// Number of pairs, not counting the terminator.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list holds nothing but the terminator.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the first pair with the given id.
    pub fn get(&self, id: AvId) -> Option<&AvPair> {
        self.0.iter().find(|p| p.id() == id)
    }

    /// Returns the value of the first `MsvAvTimestamp` pair.
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.0.iter().find_map(|p| match p {
            AvPair::Timestamp(t) => Some(*t),
            _ => None,
        })
    }

    /// Returns the value of the first `MsvAvFlags` pair.
    pub fn flags(&self) -> Option<AvFlag> {
        self.0.iter().find_map(|p| match p {
            AvPair::Flags(f) => Some(*f),
            _ => None,
        })
    }
}
impl TryFrom<&[u8]> for AvPairList {
    type Error = ParsingError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
impl From<Vec<AvPair>> for AvPairList {
    fn from(pairs: Vec<AvPair>) -> Self {
        Self(pairs)
    }
}
impl FromIterator<AvPair> for AvPairList {
    fn from_iter<I: IntoIterator<Item = AvPair>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
impl IntoIterator for AvPairList {
    type Item = AvPair;
    type IntoIter = std::vec::IntoIter<AvPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
impl<'a> IntoIterator for &'a AvPairList {
    type Item = &'a AvPair;
    type IntoIter = std::slice::Iter<'a, AvPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u16, value: &[u8]) -> Vec<u8> {
        let mut ret = Vec::new();
        ret.extend_from_slice(&id.to_le_bytes());
        ret.extend_from_slice(&(value.len() as u16).to_le_bytes());
        ret.extend_from_slice(value);
        ret
    }

    fn eol() -> Vec<u8> {
        vec![0, 0, 0, 0]
    }

    #[test]
    fn test_id_mapping() {
        for w in 0..=0x000Au16 {
            assert_eq!(u16::from(AvId::from(w)), w);
            assert_ne!(AvId::from(w), AvId::Unknown(w));
        }
        assert_eq!(AvId::from(0x000B), AvId::Unknown(0x000B));
        assert_eq!(u16::from(AvId::Unknown(0x1234)), 0x1234);
    }

    #[test]
    fn test_flag_mapping() {
        assert_eq!(AvFlag::from_raw(1), Ok(AvFlag::AccountAuthenticationConstrained));
        assert_eq!(AvFlag::from_raw(2), Ok(AvFlag::MessageIntegrityCode));
        assert_eq!(AvFlag::from_raw(4), Ok(AvFlag::UntrustedSpnSource));
        for raw in [0, 3, 5, 8, 0xFFFF_FFFF] {
            assert_eq!(AvFlag::from_raw(raw), Err(ParsingError::InvalidFlagValue { raw }));
        }
    }

    #[test]
    fn test_parse_typical_list() {
        let timestamp = [0x00, 0x4A, 0x63, 0x52, 0x1A, 0x6B, 0xDA, 0x01];
        let blob = [
            record(2, b"C\0O\0R\0P\0"),
            record(1, b"D\0C\x001\0"),
            record(4, b"c\0o\0r\0p\0.\0l\0a\0n\0"),
            record(3, b"d\0c\x001\0.\0c\0o\0r\0p\0.\0l\0a\0n\0"),
            record(5, b"c\0o\0r\0p\0.\0l\0a\0n\0"),
            record(7, &timestamp),
            eol(),
        ].concat();

        let list = AvPairList::parse(&blob).unwrap();
        assert_eq!(list.pairs(), &[
            AvPair::NbDomainName("CORP".to_owned()),
            AvPair::NbComputerName("DC1".to_owned()),
            AvPair::DnsDomainName("corp.lan".to_owned()),
            AvPair::DnsComputerName("dc1.corp.lan".to_owned()),
            AvPair::DnsTreeName("corp.lan".to_owned()),
            AvPair::Timestamp(Timestamp::from_bytes(timestamp)),
        ]);
        assert_eq!(list.timestamp().unwrap().as_bytes(), &timestamp);
        assert_eq!(list.flags(), None);
        assert_eq!(list.get(AvId::NbComputerName), Some(&AvPair::NbComputerName("DC1".to_owned())));
    }

    #[test]
    fn test_empty_list() {
        let list = AvPairList::parse(&eol()).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_eol_length_ignored() {
        let blob = [record(6, &2u32.to_le_bytes()), vec![0, 0, 5, 0]].concat();
        let list = AvPairList::parse(&blob).unwrap();
        assert_eq!(list.flags(), Some(AvFlag::MessageIntegrityCode));
    }

    #[test]
    fn test_bytes_after_eol_ignored() {
        let blob = [eol(), vec![0xDE, 0xAD]].concat();
        assert!(AvPairList::parse(&blob).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_ids_skipped() {
        let blob = [
            record(0x00FF, b"whatever"),
            record(6, &1u32.to_le_bytes()),
            eol(),
        ].concat();
        let list = AvPairList::parse(&blob).unwrap();
        assert_eq!(list.pairs(), &[AvPair::Flags(AvFlag::AccountAuthenticationConstrained)]);
    }

    #[test]
    fn test_opaque_values() {
        let blob = [
            record(8, &[0x30; 48]),
            record(10, &[0xCB; 16]),
            eol(),
        ].concat();
        let list = AvPairList::parse(&blob).unwrap();
        assert_eq!(list.pairs(), &[
            AvPair::SingleHost(vec![0x30; 48]),
            AvPair::ChannelBindings(vec![0xCB; 16]),
        ]);
    }

    #[test]
    fn test_missing_eol() {
        assert_eq!(AvPairList::parse(&[]), Err(ParsingError::UnterminatedAvPairList));

        let blob = record(2, b"C\0O\0R\0P\0");
        assert_eq!(AvPairList::parse(&blob), Err(ParsingError::UnterminatedAvPairList));
    }

    #[test]
    fn test_truncated_header() {
        let blob = [record(2, b"C\0O\0R\0P\0"), vec![0, 0]].concat();
        assert_eq!(AvPairList::parse(&blob), Err(ParsingError::FieldOutOfBounds { offset: 12 }));
    }

    #[test]
    fn test_value_past_end() {
        let mut blob = [record(2, b"C\0O\0R\0P\0"), record(1, b"D\0C\0"), eol()].concat();
        // second record claims 0x40 bytes
        blob[14] = 0x40;
        assert_eq!(AvPairList::parse(&blob), Err(ParsingError::FieldOutOfBounds { offset: 12 }));
        assert_eq!(AvPairList::parse_at(&blob, 100), Err(ParsingError::FieldOutOfBounds { offset: 112 }));
    }

    #[test]
    fn test_unknown_id_past_end() {
        let blob = [vec![0x34, 0x12, 0x10, 0x00], vec![0; 8]].concat();
        assert_eq!(AvPairList::parse(&blob), Err(ParsingError::FieldOutOfBounds { offset: 0 }));
    }

    #[test]
    fn test_invalid_flag_value() {
        let blob = [record(6, &3u32.to_le_bytes()), eol()].concat();
        assert_eq!(AvPairList::parse(&blob), Err(ParsingError::InvalidFlagValue { raw: 3 }));
    }

    #[test]
    fn test_fixed_size_values() {
        let blob = [record(6, &[1, 0]), eol()].concat();
        assert_eq!(AvPairList::parse(&blob), Err(ParsingError::InvalidAvPairLength { id: 6, length: 2 }));

        let blob = [record(7, &[0; 4]), eol()].concat();
        assert_eq!(AvPairList::parse(&blob), Err(ParsingError::InvalidAvPairLength { id: 7, length: 4 }));
    }

    #[test]
    fn test_invalid_string() {
        let blob = [record(4, b"x\0y"), eol()].concat();
        assert_eq!(AvPairList::parse_at(&blob, 56), Err(ParsingError::InvalidUtf16 { offset: 60 }));
    }

    #[test]
    fn test_encode() {
        let list: AvPairList = vec![
            AvPair::NbDomainName("AB".to_owned()),
            AvPair::Flags(AvFlag::MessageIntegrityCode),
        ].into();
        assert_eq!(list.to_bytes().unwrap(), vec![
            0x02, 0x00, 0x04, 0x00, b'A', 0x00, b'B', 0x00,
            0x06, 0x00, 0x04, 0x00, 0x02, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ]);
    }

    #[test]
    fn test_encode_too_long() {
        let pair = AvPair::ChannelBindings(vec![0; 0x1_0000]);
        assert_eq!(pair.to_bytes(), Err(StoringError::FieldTooLong { length: 0x1_0000 }));
    }
}
