use super::adaptation_field::AdaptationFieldControl;
use crate::time::ClockReference;
use crate::ts::{AdaptationField, Bytes, ContinuityCounter, Pid, TransportScramblingControl};
use crate::{ErrorKind, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

/// Transport stream packet.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsPacket {
    pub header: TsHeader,
    pub adaptation_field: Option<AdaptationField>,
    pub payload: Option<Bytes>,
}
impl TsPacket {
    /// Size of a packet in bytes.
    pub const SIZE: usize = 188;

    /// Synchronization byte.
    ///
    /// Each packet starts with this byte.
    pub const SYNC_BYTE: u8 = 0x47;

    /// Size of the space shared by the adaptation field and the payload.
    pub const BODY_SIZE: usize = TsPacket::SIZE - 4;

    /// Decodes a packet.
    ///
    /// # Errors
    ///
    /// If `buf` is not exactly `TsPacket::SIZE` bytes long, starts with a byte other than
    /// `TsPacket::SYNC_BYTE` or has a malformed adaptation field,
    /// it will return an `ErrorKind::InvalidInput` error.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        track_assert_eq!(
            buf.len(),
            TsPacket::SIZE,
            ErrorKind::InvalidInput,
            "Unexpected packet size"
        );
        let mut reader = buf;
        let (header, adaptation_field_control) = track!(TsHeader::read_from(&mut reader))?;

        let adaptation_field = if adaptation_field_control.has_adaptation_field() {
            track!(AdaptationField::read_from(&mut reader))?
        } else {
            None
        };
        let payload = if adaptation_field_control.has_payload() {
            Some(track!(Bytes::read_from(&mut reader))?)
        } else {
            None
        };
        Ok(TsPacket {
            header,
            adaptation_field,
            payload,
        })
    }

    /// Encodes the packet.
    ///
    /// The space not used by the payload is filled by the adaptation field.
    /// If `padding` is `true`, the adaptation field is extended with stuffing bytes as needed.
    ///
    /// # Errors
    ///
    /// If the adaptation field does not fit in the packet, or `padding` is `false` and
    /// the payload and the adaptation field do not exactly fill the packet,
    /// it will return an `ErrorKind::InvalidSize` error.
    pub fn to_bytes(&self, padding: bool) -> Result<[u8; TsPacket::SIZE]> {
        let payload_len = self.payload.as_ref().map_or(0, |p| p.len());
        let required_len = self
            .adaptation_field
            .as_ref()
            .map_or(0, |a| a.external_size());
        let free_len = TsPacket::BODY_SIZE - payload_len;
        track_assert!(
            required_len <= free_len,
            ErrorKind::InvalidSize,
            "No space for adaptation field: required={}, free={}",
            required_len,
            free_len,
        );
        if !padding {
            track_assert_eq!(
                required_len,
                free_len,
                ErrorKind::InvalidSize,
                "Payload does not fill the packet: payload={}, adaptation_field={}",
                payload_len,
                required_len
            );
        }

        let adaptation_field_control = match (
            self.adaptation_field.is_some() || free_len > 0,
            self.payload.is_some(),
        ) {
            (true, true) => AdaptationFieldControl::AdaptationFieldAndPayload,
            (true, false) => AdaptationFieldControl::AdaptationFieldOnly,
            (false, true) => AdaptationFieldControl::PayloadOnly,
            (false, false) => track_panic!(ErrorKind::InvalidInput, "Reserved for future use"),
        };

        let mut buf = [0; TsPacket::SIZE];
        {
            let mut writer = Cursor::new(&mut buf[..]);
            track!(self.header.write_to(&mut writer, adaptation_field_control))?;
            if let Some(ref adaptation_field) = self.adaptation_field {
                let adaptation_field_len = (free_len - 1) as u8;
                track!(adaptation_field.write_to(&mut writer, adaptation_field_len))?;
            } else if free_len > 0 {
                let adaptation_field_len = (free_len - 1) as u8;
                track!(AdaptationField::write_stuffing_bytes(
                    &mut writer,
                    adaptation_field_len
                ))?;
            }
            if let Some(ref payload) = self.payload {
                track_io!(writer.write_all(payload))?;
            }
            track_assert_eq!(writer.position(), TsPacket::SIZE as u64, ErrorKind::Other);
        }
        Ok(buf)
    }

    /// Returns the PCR carried in the adaptation field, if any.
    pub fn pcr(&self) -> Option<ClockReference> {
        self.adaptation_field.as_ref().and_then(|a| a.pcr)
    }

    /// Returns `true` if the adaptation field signals a random access point.
    pub fn random_access_indicator(&self) -> bool {
        self.adaptation_field
            .as_ref()
            .map_or(false, |a| a.random_access_indicator)
    }

    /// Returns `true` if the adaptation field signals a discontinuity.
    pub fn discontinuity_indicator(&self) -> bool {
        self.adaptation_field
            .as_ref()
            .map_or(false, |a| a.discontinuity_indicator)
    }

    /// Returns the payload bytes (empty if the packet has no payload).
    pub fn payload_bytes(&self) -> &[u8] {
        self.payload.as_ref().map_or(&[][..], |p| &p[..])
    }
}

/// TS packet header.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TsHeader {
    pub transport_error_indicator: bool,

    /// Set `true` when the payload starts a PES packet or a PSI section.
    pub payload_unit_start_indicator: bool,

    pub transport_priority: bool,
    pub pid: Pid,
    pub transport_scrambling_control: TransportScramblingControl,
    pub continuity_counter: ContinuityCounter,
}
impl TsHeader {
    /// Makes a new `TsHeader` instance for an unscrambled packet of `pid`.
    pub fn new(
        pid: Pid,
        payload_unit_start_indicator: bool,
        continuity_counter: ContinuityCounter,
    ) -> Self {
        TsHeader {
            transport_error_indicator: false,
            payload_unit_start_indicator,
            transport_priority: false,
            pid,
            transport_scrambling_control: TransportScramblingControl::NotScrambled,
            continuity_counter,
        }
    }

    fn read_from<R: Read>(mut reader: R) -> Result<(Self, AdaptationFieldControl)> {
        let sync_byte = track_io!(reader.read_u8())?;
        track_assert_eq!(
            sync_byte,
            TsPacket::SYNC_BYTE,
            ErrorKind::InvalidInput,
            "Unexpected sync byte"
        );

        let n = track_io!(reader.read_u16::<BigEndian>())?;
        let transport_error_indicator = (n & 0b1000_0000_0000_0000) != 0;
        let payload_unit_start_indicator = (n & 0b0100_0000_0000_0000) != 0;
        let transport_priority = (n & 0b0010_0000_0000_0000) != 0;
        let pid = track!(Pid::new(n & 0b0001_1111_1111_1111))?;

        let n = track_io!(reader.read_u8())?;
        let transport_scrambling_control = track!(TransportScramblingControl::from_u8(n >> 6))?;
        let adaptation_field_control = track!(AdaptationFieldControl::from_u8((n >> 4) & 0b11))?;
        let continuity_counter = track!(ContinuityCounter::from_u8(n & 0b1111))?;

        let header = TsHeader {
            transport_error_indicator,
            payload_unit_start_indicator,
            transport_priority,
            pid,
            transport_scrambling_control,
            continuity_counter,
        };
        Ok((header, adaptation_field_control))
    }

    fn write_to<W: Write>(
        &self,
        mut writer: W,
        adaptation_field_control: AdaptationFieldControl,
    ) -> Result<()> {
        track_io!(writer.write_u8(TsPacket::SYNC_BYTE))?;

        let n = ((self.transport_error_indicator as u16) << 15)
            | ((self.payload_unit_start_indicator as u16) << 14)
            | ((self.transport_priority as u16) << 13)
            | self.pid.as_u16();
        track_io!(writer.write_u16::<BigEndian>(n))?;

        let n = ((self.transport_scrambling_control as u8) << 6)
            | ((adaptation_field_control as u8) << 4)
            | self.continuity_counter.as_u8();
        track_io!(writer.write_u8(n))?;

        Ok(())
    }
}
