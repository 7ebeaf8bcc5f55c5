//! Multiplexing of elementary stream samples into transport streams.
pub use self::pid_writer::PidWriter;

use crate::es::Sample;
use crate::pes::{PesHeader, PesPacket};
use crate::ts::{Pat, Pid, Pmt, TsPacket, TsPacketWriter};
use crate::{ErrorKind, Result};
use std::collections::BTreeMap;
use std::io::Write;

mod pid_writer;

/// Transport stream multiplexer.
///
/// Each PID is written through its own `PidWriter`, so continuity counters
/// are maintained independently.
#[derive(Debug)]
pub struct TsMuxer<W> {
    writer: TsPacketWriter<W>,
    pid_writers: BTreeMap<Pid, PidWriter>,
}
impl<W: Write> TsMuxer<W> {
    /// Makes a new `TsMuxer` instance.
    pub fn new(stream: W) -> Self {
        TsMuxer {
            writer: TsPacketWriter::new(stream),
            pid_writers: BTreeMap::new(),
        }
    }

    /// Returns a reference to the underlaying byte stream.
    pub fn stream(&self) -> &W {
        self.writer.stream()
    }

    /// Converts `TsMuxer` into the underlaying byte stream.
    pub fn into_stream(self) -> W {
        self.writer.into_stream()
    }

    /// Writes a PAT in a single packet.
    ///
    /// # Errors
    ///
    /// If the table does not fit in a packet, it will return an `ErrorKind::InvalidSize` error.
    pub fn write_pat(&mut self, pat: &Pat) -> Result<()> {
        let mut payload = Vec::new();
        track!(pat.write_to(&mut payload))?;
        track!(self.write_psi(Pid::PAT, payload))
    }

    /// Writes a PMT in a single packet of `pid`.
    ///
    /// # Errors
    ///
    /// If the table does not fit in a packet, it will return an `ErrorKind::InvalidSize` error.
    pub fn write_pmt(&mut self, pid: Pid, pmt: &Pmt) -> Result<()> {
        let mut payload = Vec::new();
        track!(pmt.write_to(&mut payload))?;
        track!(self.write_psi(pid, payload))
    }

    /// Writes a sample as a PES packet on `sample.pid`.
    ///
    /// The DTS is omitted if it equals to the PTS.
    /// The PCR of the sample is stamped in the first TS packet.
    pub fn write_sample(&mut self, sample: &Sample) -> Result<()> {
        let mut header = PesHeader::new(sample.stream_id);
        header.pts = sample.pts;
        header.dts = sample.dts.filter(|dts| sample.pts != Some(*dts));
        let packet = PesPacket {
            header,
            data: &sample.data[..],
        };
        let mut payload = Vec::with_capacity(sample.data.len() + 19);
        track!(packet.write_to(&mut payload))?;

        let pid_writer = pid_writer(&mut self.pid_writers, sample.pid, true);
        pid_writer.set_pcr(sample.pcr);
        track!(pid_writer.write(&mut self.writer, &payload, sample.random_access_indicator))
    }

    fn write_psi(&mut self, pid: Pid, mut payload: Vec<u8>) -> Result<()> {
        track_assert!(
            payload.len() <= TsPacket::BODY_SIZE,
            ErrorKind::InvalidSize,
            "Too large PSI: {} bytes",
            payload.len()
        );
        payload.resize(TsPacket::BODY_SIZE, 0xFF);
        let pid_writer = pid_writer(&mut self.pid_writers, pid, false);
        track!(pid_writer.write(&mut self.writer, &payload, false))
    }
}

fn pid_writer(
    pid_writers: &mut BTreeMap<Pid, PidWriter>,
    pid: Pid,
    padding: bool,
) -> &mut PidWriter {
    pid_writers
        .entry(pid)
        .or_insert_with(|| PidWriter::new(pid).with_padding(padding))
}
