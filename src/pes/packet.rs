use crate::es::StreamId;
use crate::time::{ClockReference, Timestamp};
use crate::util;
use crate::{ErrorKind, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

const PACKET_START_CODE_PREFIX: u64 = 0x00_0001;

/// PES packet.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PesPacket<B> {
    pub header: PesHeader,
    pub data: B,
}
impl PesPacket<Vec<u8>> {
    /// Reads a PES packet.
    ///
    /// If the packet length field is `0`, the data extends to the end of `reader`.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let (header, data_len) = track!(PesHeader::read_from(&mut reader))?;
        let data = if let Some(len) = data_len {
            let mut data = vec![0; len];
            track_io!(reader.read_exact(&mut data))?;
            data
        } else {
            let mut data = Vec::new();
            track_io!(reader.read_to_end(&mut data))?;
            data
        };
        Ok(PesPacket { header, data })
    }
}
impl<B: AsRef<[u8]>> PesPacket<B> {
    /// Writes the PES packet.
    ///
    /// The packet length field is set to the exact size of the packet.
    /// Video packets too large for the 16-bit field are written with the length `0` (unbounded).
    ///
    /// # Errors
    ///
    /// If a non-video packet is too large for the packet length field,
    /// it will return an `ErrorKind::InvalidSize` error.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let data = self.data.as_ref();
        let packet_len = data.len() + usize::from(self.header.optional_header_len());
        let data_len = if packet_len <= PesHeader::MAX_PACKET_LEN {
            Some(data.len())
        } else {
            track_assert!(
                self.header.stream_id.is_video(),
                ErrorKind::InvalidSize,
                "Too large PES packet: {} bytes",
                packet_len
            );
            None
        };
        track!(self.header.write_to(&mut writer, data_len))?;
        track_io!(writer.write_all(data))?;
        Ok(())
    }
}

/// PES packet header.
///
/// Note that `PesHeader` contains the fields that belong to the optional PES header.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PesHeader {
    pub stream_id: StreamId,
    pub priority: bool,

    /// `true` indicates that the PES packet header is immediately followed by
    /// the video start code or audio syncword.
    pub data_alignment_indicator: bool,

    /// `true` implies copyrighted.
    pub copyright: bool,

    /// `true` implies original.
    pub original_or_copy: bool,

    pub pts: Option<Timestamp>,

    /// Decode timestamp (only present together with `pts`).
    pub dts: Option<Timestamp>,

    /// Elementary stream clock reference.
    pub escr: Option<ClockReference>,
}
impl PesHeader {
    const MAX_PACKET_LEN: usize = 0xFFFF;

    /// Makes a new `PesHeader` instance that has no optional fields.
    pub fn new(stream_id: StreamId) -> Self {
        PesHeader {
            stream_id,
            priority: false,
            data_alignment_indicator: false,
            copyright: false,
            original_or_copy: false,
            pts: None,
            dts: None,
            escr: None,
        }
    }

    /// Number of bytes following the packet length field, excluding the data.
    pub(crate) fn optional_header_len(&self) -> u16 {
        if !self.stream_id.has_optional_header() {
            return 0;
        }
        3 + self.pts.map_or(0, |_| 5) + self.dts.map_or(0, |_| 5) + self.escr.map_or(0, |_| 6)
    }

    /// Reads a PES packet header.
    ///
    /// The second element of the result is the length of the data following the header,
    /// or `None` if the packet length field is `0` (unbounded).
    ///
    /// # Errors
    ///
    /// If the start code, the marker bits or the lengths are malformed,
    /// it will return an `ErrorKind::InvalidInput` error.
    pub fn read_from<R: Read>(mut reader: R) -> Result<(Self, Option<usize>)> {
        let packet_start_code_prefix = track_io!(reader.read_uint::<BigEndian>(3))?;
        track_assert_eq!(
            packet_start_code_prefix,
            PACKET_START_CODE_PREFIX,
            ErrorKind::InvalidInput,
            "Unexpected PES start code"
        );

        let stream_id = StreamId::new(track_io!(reader.read_u8())?);
        let packet_len = usize::from(track_io!(reader.read_u16::<BigEndian>())?);
        if !stream_id.has_optional_header() {
            let data_len = if packet_len == 0 {
                None
            } else {
                Some(packet_len)
            };
            return Ok((PesHeader::new(stream_id), data_len));
        }

        let b = track_io!(reader.read_u8())?;
        track_assert_eq!(
            b & 0b1100_0000,
            0b1000_0000,
            ErrorKind::InvalidInput,
            "Unexpected marker bits"
        );
        let scrambling_control = (b & 0b0011_0000) >> 4;
        let priority = (b & 0b0000_1000) != 0;
        let data_alignment_indicator = (b & 0b0000_0100) != 0;
        let copyright = (b & 0b0000_0010) != 0;
        let original_or_copy = (b & 0b0000_0001) != 0;
        track_assert_eq!(scrambling_control, 0, ErrorKind::Unsupported);

        let b = track_io!(reader.read_u8())?;
        let pts_flag = (b & 0b1000_0000) != 0;
        let dts_flag = (b & 0b0100_0000) != 0;
        track_assert_ne!((pts_flag, dts_flag), (false, true), ErrorKind::InvalidInput);
        let escr_flag = (b & 0b0010_0000) != 0;
        let other_flags = (b & 0b0001_1111) != 0;

        let pes_header_len = track_io!(reader.read_u8())?;
        let data_len = if packet_len == 0 {
            None
        } else {
            let optional_header_len = 3 + usize::from(pes_header_len);
            track_assert!(
                packet_len >= optional_header_len,
                ErrorKind::InvalidInput,
                "packet_len={}, optional_header_len={}",
                packet_len,
                optional_header_len
            );
            Some(packet_len - optional_header_len)
        };

        let mut reader = reader.take(u64::from(pes_header_len));
        let pts = if pts_flag {
            let check_bits = if dts_flag { 0b0011 } else { 0b0010 };
            Some(track!(Timestamp::read_from(&mut reader, check_bits))?)
        } else {
            None
        };
        let dts = if dts_flag {
            let check_bits = 0b0001;
            Some(track!(Timestamp::read_from(&mut reader, check_bits))?)
        } else {
            None
        };
        let escr = if escr_flag {
            Some(track!(ClockReference::read_escr_from(&mut reader))?)
        } else {
            None
        };
        if other_flags {
            // ES rate, trick mode, copy info, CRC and extension fields are not interpreted.
            track_io!(io::copy(&mut reader, &mut io::sink()))?;
        } else {
            track!(util::consume_stuffing_bytes(&mut reader))?;
        }
        track_assert_eq!(
            reader.limit(),
            0,
            ErrorKind::InvalidInput,
            "Truncated PES header"
        );

        let header = PesHeader {
            stream_id,
            priority,
            data_alignment_indicator,
            copyright,
            original_or_copy,
            pts,
            dts,
            escr,
        };
        Ok((header, data_len))
    }

    /// Writes the PES packet header.
    ///
    /// `data_len` is the length of the data that will follow the header,
    /// or `None` to leave the packet length unspecified (`0`).
    ///
    /// # Errors
    ///
    /// If the packet is too large for the packet length field,
    /// it will return an `ErrorKind::InvalidSize` error.
    pub fn write_to<W: Write>(&self, mut writer: W, data_len: Option<usize>) -> Result<()> {
        let packet_len = if let Some(data_len) = data_len {
            let packet_len = data_len + usize::from(self.optional_header_len());
            track_assert!(
                packet_len <= Self::MAX_PACKET_LEN,
                ErrorKind::InvalidSize,
                "Too large PES packet: {} bytes",
                packet_len
            );
            packet_len as u16
        } else {
            0
        };

        track_io!(writer.write_uint::<BigEndian>(PACKET_START_CODE_PREFIX, 3))?;
        track_io!(writer.write_u8(self.stream_id.as_u8()))?;
        track_io!(writer.write_u16::<BigEndian>(packet_len))?;
        if !self.stream_id.has_optional_header() {
            return Ok(());
        }

        let n = 0b1000_0000
            | ((self.priority as u8) << 3)
            | ((self.data_alignment_indicator as u8) << 2)
            | ((self.copyright as u8) << 1)
            | self.original_or_copy as u8;
        track_io!(writer.write_u8(n))?;

        if self.dts.is_some() {
            track_assert!(self.pts.is_some(), ErrorKind::InvalidInput);
        }
        let n = ((self.pts.is_some() as u8) << 7)
            | ((self.dts.is_some() as u8) << 6)
            | ((self.escr.is_some() as u8) << 5);
        track_io!(writer.write_u8(n))?;

        let pes_header_len = self.optional_header_len() as u8 - 3;
        track_io!(writer.write_u8(pes_header_len))?;
        if let Some(x) = self.pts {
            let check_bits = if self.dts.is_some() { 0b0011 } else { 0b0010 };
            track!(x.write_to(&mut writer, check_bits))?;
        }
        if let Some(x) = self.dts {
            let check_bits = 0b0001;
            track!(x.write_to(&mut writer, check_bits))?;
        }
        if let Some(x) = self.escr {
            track!(x.write_escr_to(&mut writer))?;
        }

        Ok(())
    }
}
