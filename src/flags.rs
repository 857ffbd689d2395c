//! Negotiation flags exchanged in every NTLM message.


use bitflags::bitflags;


bitflags! {
    /// NTLM negotiation flags.
    ///
    /// Bits without a name are retained when decoding so that the value can be passed on
    /// unchanged.
    #[derive(Clone, Copy, Debug, Default, Hash, Eq, Ord, PartialEq, PartialOrd)]
    pub struct NegotiateFlags: u32 {
        const NEGOTIATE_UNICODE = 0x0000_0001;
        const NEGOTIATE_OEM = 0x0000_0002;
        const REQUEST_TARGET = 0x0000_0004;
        const UNKNOWN_8 = 0x0000_0008;
        const NEGOTIATE_SIGN = 0x0000_0010;
        const NEGOTIATE_SEAL = 0x0000_0020;
        const NEGOTIATE_DATAGRAM = 0x0000_0040;
        const NEGOTIATE_LANMAN_KEY = 0x0000_0080;
        const NEGOTIATE_NETWARE = 0x0000_0100;
        const NEGOTIATE_NTLM = 0x0000_0200;
        const UNKNOWN_400 = 0x0000_0400;
        const NEGOTIATE_ANONYMOUS = 0x0000_0800;
        const NEGOTIATE_DOMAIN_SUPPLIED = 0x0000_1000;
        const NEGOTIATE_WORKSTATION_SUPPLIED = 0x0000_2000;
        const NEGOTIATE_LOCAL_CALL = 0x0000_4000;
        const NEGOTIATE_ALWAYS_SIGN = 0x0000_8000;
        const TARGET_TYPE_DOMAIN = 0x0001_0000;
        const TARGET_TYPE_SERVER = 0x0002_0000;
        const TARGET_TYPE_SHARE = 0x0004_0000;
        const NEGOTIATE_EXTENDED_SESSIONSECURITY = 0x0008_0000;
        const NEGOTIATE_IDENTIFY = 0x0010_0000;
        const UNKNOWN_200000 = 0x0020_0000;
        const REQUEST_NON_NT_SESSION_KEY = 0x0040_0000;
        const NEGOTIATE_TARGET_INFO = 0x0080_0000;
        const UNKNOWN_1000000 = 0x0100_0000;
        const NEGOTIATE_VERSION = 0x0200_0000;
        const UNKNOWN_4000000 = 0x0400_0000;
        const UNKNOWN_8000000 = 0x0800_0000;
        const UNKNOWN_10000000 = 0x1000_0000;
        const NEGOTIATE_128BIT = 0x2000_0000;
        const NEGOTIATE_KEY_EXCHANGE = 0x4000_0000;
        const NEGOTIATE_56BIT = 0x8000_0000;
    }
}
impl NegotiateFlags {
    /// Interprets a 32-bit value read from the wire, keeping every bit.
    pub fn from_wire(value: u32) -> Self {
        Self::from_bits_retain(value)
    }

    /// Whether the peer negotiated UTF-16LE strings.
    pub fn is_unicode(&self) -> bool {
        self.contains(Self::NEGOTIATE_UNICODE)
    }

    /// Whether the message carries an AV-pair list.
    pub fn has_target_info(&self) -> bool {
        self.contains(Self::NEGOTIATE_TARGET_INFO)
    }

    /// Whether the message carries a VERSION structure.
    pub fn has_version(&self) -> bool {
        self.contains(Self::NEGOTIATE_VERSION)
    }
}
