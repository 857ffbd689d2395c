//! Windows FILETIME values carried in the `MsvAvTimestamp` AV-pair.


use chrono::{DateTime, Duration, NaiveDate, Utc};


/// Ticks (tenths of a microsecond) per second.
const TICKS_PER_SECOND: u64 = 10_000_000;


/// The start of the FILETIME epoch, 1601-01-01T00:00:00Z.
fn windows_epoch() -> Option<DateTime<Utc>> {
    Some(
        NaiveDate::from_ymd_opt(1601, 1, 1)?
            .and_hms_opt(0, 0, 0)?
            .and_utc()
    )
}


/// A server timestamp as sent in the challenge message.
///
/// The eight bytes are kept exactly as received; NTLMv2 responses must echo them bit-for-bit.
/// Interpreting them as a point in time is only a convenience.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Timestamp([u8; 8]);

impl Timestamp {
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn from_ticks(ticks: u64) -> Self {
        Self(ticks.to_le_bytes())
    }

    /// The raw bytes, unchanged.
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Number of 100ns intervals since 1601-01-01T00:00:00Z.
    pub fn ticks(&self) -> u64 {
        u64::from_le_bytes(self.0)
    }

    /// Converts the timestamp into a UTC date and time.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let ticks = self.ticks();
        let seconds = i64::try_from(ticks / TICKS_PER_SECOND).ok()?;
        let nanos = i64::try_from((ticks % TICKS_PER_SECOND) * 100).ok()?;
        windows_epoch()?
            .checked_add_signed(Duration::seconds(seconds))?
            .checked_add_signed(Duration::nanoseconds(nanos))
    }

    /// Converts a UTC date and time into a timestamp. Fails for times before 1601.
    pub fn from_datetime(datetime: DateTime<Utc>) -> Option<Self> {
        let delta = datetime.signed_duration_since(windows_epoch()?);
        let micros = u64::try_from(delta.num_microseconds()?).ok()?;
        micros.checked_mul(10).map(Self::from_ticks)
    }

    /// The current time.
    pub fn now() -> Self {
        // only fails some 29,000 years from now
        Self::from_datetime(Utc::now()).unwrap_or_default()
    }
}
impl From<[u8; 8]> for Timestamp {
    fn from(bytes: [u8; 8]) -> Self {
        Self::from_bytes(bytes)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_bytes_kept() {
        let raw = [0x9A, 0x3C, 0x21, 0x5B, 0xF0, 0x4E, 0xD4, 0x01];
        let ts = Timestamp::from_bytes(raw);
        assert_eq!(ts.as_bytes(), &raw);
        assert_eq!(ts.ticks(), 0x01D4_4EF0_5B21_3C9A);
    }

    #[test]
    fn test_unix_epoch() {
        // 1970-01-01 is 11644473600 seconds after 1601-01-01
        let ts = Timestamp::from_ticks(11_644_473_600 * TICKS_PER_SECOND);
        assert_eq!(ts.to_datetime(), Some(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(Timestamp::from_datetime(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap()), Some(ts));
    }

    #[test]
    fn test_sub_second_ticks() {
        let ts = Timestamp::from_ticks(11_644_473_600 * TICKS_PER_SECOND + 1234567);
        let dt = ts.to_datetime().unwrap();
        assert_eq!(dt.timestamp(), 0);
        assert_eq!(dt.timestamp_subsec_nanos(), 123_456_700);
    }

    #[test]
    fn test_before_epoch() {
        assert_eq!(Timestamp::from_datetime(Utc.with_ymd_and_hms(1600, 12, 31, 23, 59, 59).unwrap()), None);
    }

    #[test]
    fn test_now_is_recent() {
        let now = Timestamp::now().to_datetime().unwrap();
        assert!(now > Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
    }
}
