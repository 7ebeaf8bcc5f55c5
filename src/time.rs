//! Timestamps (PTS/DTS) and clock references (PCR/OPCR/ESCR).
use crate::{ErrorKind, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Timestamp for PTS/DTS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(u64);
impl Timestamp {
    /// 90 kHz.
    pub const RESOLUTION: u64 = 90_000;

    /// Maximum timestamp value.
    pub const MAX: u64 = (1 << 33) - 1;

    /// Makes a new `Timestamp` instance.
    ///
    /// # Errors
    ///
    /// If `n` exceeds `Timestamp::MAX`, it will return an `ErrorKind::InvalidInput` error.
    pub fn new(n: u64) -> Result<Self> {
        track_assert!(
            n <= Self::MAX,
            ErrorKind::InvalidInput,
            "Too large value: {}",
            n
        );
        Ok(Timestamp(n))
    }

    /// Returns the value of the timestamp.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub(crate) fn read_from<R: Read>(mut reader: R, check_bits: u8) -> Result<Self> {
        let n0 = track_io!(reader.read_u8())?;
        let n1 = track_io!(reader.read_u16::<BigEndian>())?;
        let n2 = track_io!(reader.read_u16::<BigEndian>())?;

        track_assert_eq!(
            n0 >> 4,
            check_bits,
            ErrorKind::InvalidInput,
            "Unexpected check bits: actual={}, expected={}",
            n0 >> 4,
            check_bits
        );
        track_assert_eq!(n0 & 1, 1, ErrorKind::InvalidInput, "Unexpected marker bit");
        track_assert_eq!(n1 & 1, 1, ErrorKind::InvalidInput, "Unexpected marker bit");
        track_assert_eq!(n2 & 1, 1, ErrorKind::InvalidInput, "Unexpected marker bit");

        let t = (u64::from(n0 & 0b0000_1110) << 29)
            | (u64::from(n1 >> 1) << 15)
            | u64::from(n2 >> 1);
        Ok(Timestamp(t))
    }

    pub(crate) fn write_to<W: Write>(&self, mut writer: W, check_bits: u8) -> Result<()> {
        let n0 = (check_bits << 4) | (((self.0 >> 30) as u8 & 0b111) << 1) | 1;
        let n1 = ((((self.0 >> 15) & 0x7FFF) as u16) << 1) | 1;
        let n2 = (((self.0 & 0x7FFF) as u16) << 1) | 1;
        track_io!(writer.write_u8(n0))?;
        track_io!(writer.write_u16::<BigEndian>(n1))?;
        track_io!(writer.write_u16::<BigEndian>(n2))?;
        Ok(())
    }
}

/// Clock reference for PCR/OPCR/ESCR.
///
/// The value is `base * 300 + extension` in units of the 27 MHz system clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockReference(u64);
impl ClockReference {
    /// 27 MHz.
    pub const RESOLUTION: u64 = 27_000_000;

    /// Maximum clock reference value.
    pub const MAX: u64 = ((1 << 33) - 1) * 300 + 299;

    const ESCR_MARKER_BITS: u64 = (1 << 42) | (1 << 26) | (1 << 10) | 1;

    /// Makes a new `ClockReference` instance.
    ///
    /// # Errors
    ///
    /// If `n` exceeds `ClockReference::MAX`, it will return an `ErrorKind::InvalidInput` error.
    pub fn new(n: u64) -> Result<Self> {
        track_assert!(
            n <= Self::MAX,
            ErrorKind::InvalidInput,
            "Too large value: {}",
            n
        );
        Ok(ClockReference(n))
    }

    /// Returns the value of the clock reference.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    fn base(&self) -> u64 {
        self.0 / 300
    }

    fn extension(&self) -> u64 {
        self.0 % 300
    }

    pub(crate) fn read_pcr_from<R: Read>(mut reader: R) -> Result<Self> {
        let n = track_io!(reader.read_uint::<BigEndian>(6))?;
        let base = n >> 15;
        let extension = n & 0b1_1111_1111;
        track_assert!(
            extension < 300,
            ErrorKind::InvalidInput,
            "Too large PCR extension: {}",
            extension
        );
        Ok(ClockReference(base * 300 + extension))
    }

    pub(crate) fn write_pcr_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let n = (self.base() << 15) | (0b11_1111 << 9) | self.extension();
        track_io!(writer.write_uint::<BigEndian>(n, 6))?;
        Ok(())
    }

    pub(crate) fn read_escr_from<R: Read>(mut reader: R) -> Result<Self> {
        let n = track_io!(reader.read_uint::<BigEndian>(6))?;
        track_assert_eq!(
            n & Self::ESCR_MARKER_BITS,
            Self::ESCR_MARKER_BITS,
            ErrorKind::InvalidInput,
            "Unexpected marker bits"
        );
        let base = (((n >> 43) & 0b111) << 30)
            | (((n >> 27) & 0x7FFF) << 15)
            | ((n >> 11) & 0x7FFF);
        let extension = (n >> 1) & 0b1_1111_1111;
        track_assert!(
            extension < 300,
            ErrorKind::InvalidInput,
            "Too large ESCR extension: {}",
            extension
        );
        Ok(ClockReference(base * 300 + extension))
    }

    pub(crate) fn write_escr_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let base = self.base();
        let n = (0b11 << 46)
            | (((base >> 30) & 0b111) << 43)
            | (1 << 42)
            | (((base >> 15) & 0x7FFF) << 27)
            | (1 << 26)
            | ((base & 0x7FFF) << 11)
            | (1 << 10)
            | (self.extension() << 1)
            | 1;
        track_io!(writer.write_uint::<BigEndian>(n, 6))?;
        Ok(())
    }
}
impl From<u32> for ClockReference {
    fn from(n: u32) -> Self {
        ClockReference(u64::from(n))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn pack(t: Timestamp, check_bits: u8) -> Vec<u8> {
        let mut buf = Vec::new();
        track_try_unwrap!(t.write_to(&mut buf, check_bits));
        buf
    }

    #[test]
    fn timestamp_boundaries() {
        for &n in &[0, 1, 1 << 32, Timestamp::MAX] {
            let t = track_try_unwrap!(Timestamp::new(n));
            for &check_bits in &[0b0010, 0b0011, 0b0001] {
                let buf = pack(t, check_bits);
                assert_eq!(buf.len(), 5);
                assert_eq!(buf[0] >> 4, check_bits);
                let actual = track_try_unwrap!(Timestamp::read_from(&buf[..], check_bits));
                assert_eq!(actual.as_u64(), n);
            }
        }
        assert!(Timestamp::new(Timestamp::MAX + 1).is_err());
    }

    #[quickcheck]
    fn timestamp_packing_is_lossless(n: u64) -> bool {
        let t = track_try_unwrap!(Timestamp::new(n & Timestamp::MAX));
        let buf = pack(t, 0b0010);
        Timestamp::read_from(&buf[..], 0b0010).ok() == Some(t)
    }

    #[test]
    fn timestamp_marker_errors() {
        let t = track_try_unwrap!(Timestamp::new(123_456_789));
        let buf = pack(t, 0b0010);

        let e = Timestamp::read_from(&buf[..], 0b0011).err().unwrap();
        assert_eq!(*e.kind(), ErrorKind::InvalidInput);

        for &(i, mask) in &[(0, 0x01), (2, 0x01), (4, 0x01)] {
            let mut broken = buf.clone();
            broken[i] &= !mask;
            let e = Timestamp::read_from(&broken[..], 0b0010).err().unwrap();
            assert_eq!(*e.kind(), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn pcr_works() {
        let pcr = track_try_unwrap!(ClockReference::new(ClockReference::MAX));
        let mut buf = Vec::new();
        track_try_unwrap!(pcr.write_pcr_to(&mut buf));
        assert_eq!(buf.len(), 6);
        assert_eq!(track_try_unwrap!(ClockReference::read_pcr_from(&buf[..])), pcr);

        let pcr = track_try_unwrap!(ClockReference::new(27_000_000 * 10 + 7));
        let mut buf = Vec::new();
        track_try_unwrap!(pcr.write_pcr_to(&mut buf));
        assert_eq!(buf[4] & 0b0111_1110, 0b0111_1110);
        assert_eq!(track_try_unwrap!(ClockReference::read_pcr_from(&buf[..])), pcr);

        assert!(ClockReference::new(ClockReference::MAX + 1).is_err());
    }

    #[test]
    fn escr_works() {
        let escr = track_try_unwrap!(ClockReference::new(1234 * 300 + 56));
        let mut buf = Vec::new();
        track_try_unwrap!(escr.write_escr_to(&mut buf));
        assert_eq!(track_try_unwrap!(ClockReference::read_escr_from(&buf[..])), escr);

        buf[5] &= 0xFE;
        assert!(ClockReference::read_escr_from(&buf[..]).is_err());
    }
}
