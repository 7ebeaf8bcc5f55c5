use crate::time::ClockReference;
use crate::ts::{
    AdaptationField, Bytes, ContinuityCounter, Pid, TsHeader, TsPacket, TsPacketWriter,
};
use crate::{ErrorKind, Result};
use std::io::Write;

/// Packetizer of the payload units carried by a PID.
#[derive(Debug, Clone)]
pub struct PidWriter {
    pid: Pid,
    pcr: Option<ClockReference>,
    padding: bool,
    continuity_counter: ContinuityCounter,
}
impl PidWriter {
    /// Makes a new `PidWriter` instance.
    ///
    /// Padding is enabled and the continuity counter starts at `0`.
    pub fn new(pid: Pid) -> Self {
        PidWriter {
            pid,
            pcr: None,
            padding: true,
            continuity_counter: ContinuityCounter::new(),
        }
    }

    /// Sets whether the last packet of a payload unit may be filled with stuffing bytes.
    ///
    /// If `padding` is `false`, payload units must exactly fill their packets.
    pub fn with_padding(mut self, padding: bool) -> Self {
        self.padding = padding;
        self
    }

    /// Sets the continuity counter of the next packet.
    pub fn with_continuity_counter(mut self, continuity_counter: ContinuityCounter) -> Self {
        self.continuity_counter = continuity_counter;
        self
    }

    /// Sets the PCR stamped in the first packet of the following payload units.
    pub fn set_pcr(&mut self, pcr: Option<ClockReference>) {
        self.pcr = pcr;
    }

    /// Returns the PID of the written packets.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Returns the continuity counter of the next packet.
    pub fn continuity_counter(&self) -> ContinuityCounter {
        self.continuity_counter
    }

    /// Writes `payload` as a sequence of TS packets.
    ///
    /// Only the first packet has the payload unit start indicator set,
    /// and only it carries the PCR and the random access indicator.
    ///
    /// # Errors
    ///
    /// If padding is disabled and the payload does not exactly fill its packets,
    /// it will return an `ErrorKind::InvalidSize` error without writing anything.
    /// If the byte stream fails, it will return an `ErrorKind::WriteFailed` error.
    pub fn write<W: Write>(
        &mut self,
        writer: &mut TsPacketWriter<W>,
        payload: &[u8],
        random_access: bool,
    ) -> Result<()> {
        let packets = track!(self.packetize(payload, random_access))?;
        let mut bytes = Vec::with_capacity(packets.len() * TsPacket::SIZE);
        for packet in &packets {
            bytes.extend_from_slice(&track!(packet.to_bytes(self.padding))?);
        }
        track!(writer.write_bytes(&bytes))?;

        for _ in 0..packets.len() {
            self.continuity_counter = self.continuity_counter.next();
        }
        Ok(())
    }

    fn packetize(&self, payload: &[u8], random_access: bool) -> Result<Vec<TsPacket>> {
        let adaptation_field = if self.pcr.is_some() || random_access {
            Some(AdaptationField {
                random_access_indicator: random_access,
                pcr: self.pcr,
                ..AdaptationField::default()
            })
        } else {
            None
        };
        let first_chunk_len = TsPacket::BODY_SIZE
            - adaptation_field
                .as_ref()
                .map_or(0, |a| a.external_size());

        let (first, mut rest) = payload.split_at(payload.len().min(first_chunk_len));
        let mut counter = self.continuity_counter;
        let mut packets = vec![TsPacket {
            header: TsHeader::new(self.pid, true, counter),
            adaptation_field,
            payload: Some(track!(Bytes::new(first))?),
        }];
        while !rest.is_empty() {
            let (chunk, remaining) = rest.split_at(rest.len().min(TsPacket::BODY_SIZE));
            counter = counter.next();
            packets.push(TsPacket {
                header: TsHeader::new(self.pid, false, counter),
                adaptation_field: None,
                payload: Some(track!(Bytes::new(chunk))?),
            });
            rest = remaining;
        }

        if !self.padding {
            let last = packets.last().expect("Never fails");
            let used = last.payload_bytes().len()
                + last
                    .adaptation_field
                    .as_ref()
                    .map_or(0, |a| a.external_size());
            track_assert_eq!(
                used,
                TsPacket::BODY_SIZE,
                ErrorKind::InvalidSize,
                "Payload does not fill the packet: pid={}",
                self.pid
            );
        }
        Ok(packets)
    }
}
