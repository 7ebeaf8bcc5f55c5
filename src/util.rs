use crate::{ErrorKind, Result};
use byteorder::WriteBytesExt;
use std::io::{Read, Write};

pub fn consume_stuffing_bytes<R: Read>(mut reader: R) -> Result<()> {
    let mut buf = [0];
    while 1 == track_io!(reader.read(&mut buf))? {
        track_assert_eq!(buf[0], 0xFF, ErrorKind::InvalidInput);
    }
    Ok(())
}

pub fn write_stuffing_bytes<W: Write>(mut writer: W, len: usize) -> Result<()> {
    for _ in 0..len {
        track_io!(writer.write_u8(0xFF))?;
    }
    Ok(())
}

/// MPEG-2 CRC-32 (polynomial 0x04C11DB7, initial value 0xFFFFFFFF, no reflection).
pub struct Crc32 {
    crc: u32,
}
impl Crc32 {
    const POLYNOMIAL: u32 = 0x04C1_1DB7;

    pub fn new() -> Self {
        Crc32 { crc: 0xFFFF_FFFF }
    }

    pub fn update(&mut self, buf: &[u8]) {
        for &b in buf {
            self.crc ^= u32::from(b) << 24;
            for _ in 0..8 {
                self.crc = if self.crc & 0x8000_0000 != 0 {
                    (self.crc << 1) ^ Self::POLYNOMIAL
                } else {
                    self.crc << 1
                };
            }
        }
    }

    pub fn value(&self) -> u32 {
        self.crc
    }

    pub fn calculate(buf: &[u8]) -> u32 {
        let mut crc = Crc32::new();
        crc.update(buf);
        crc.value()
    }
}

/// A reader which computes the CRC-32 of all bytes read through it.
pub struct WithCrc32<R> {
    inner: R,
    crc: Crc32,
}
impl<R: Read> WithCrc32<R> {
    pub fn new(inner: R) -> Self {
        WithCrc32 {
            inner,
            crc: Crc32::new(),
        }
    }

    pub fn crc32(&self) -> u32 {
        self.crc.value()
    }
}
impl<R: Read> Read for WithCrc32<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let size = self.inner.read(buf)?;
        self.crc.update(&buf[..size]);
        Ok(size)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn crc32_works() {
        // PAT section of a real stream: table id .. last entry.
        let section = [0, 176, 13, 0, 0, 195, 0, 0, 0, 1, 225, 224];
        assert_eq!(Crc32::calculate(&section), 0xE85F_74EC);

        let mut reader = WithCrc32::new(&section[..]);
        let mut buf = Vec::new();
        track_try_unwrap!(track_io!(reader.read_to_end(&mut buf)));
        assert_eq!(reader.crc32(), 0xE85F_74EC);
    }

    #[test]
    fn stuffing_bytes_works() {
        let mut buf = Vec::new();
        track_try_unwrap!(write_stuffing_bytes(&mut buf, 3));
        assert_eq!(buf, [0xFF, 0xFF, 0xFF]);
        assert!(consume_stuffing_bytes(&buf[..]).is_ok());
        assert!(consume_stuffing_bytes(&[0xFF, 0x00][..]).is_err());
    }
}
