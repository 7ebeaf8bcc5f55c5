use crate::ts::TsPacket;
use crate::{ErrorKind, Result};
use std::io::Write;
use trackable::error::ErrorKindExt;

/// The `WriteTsPacket` trait allows for writing TS packets to a destination.
pub trait WriteTsPacket {
    /// Writes a TS packet.
    ///
    /// The adaptation field of the packet is padded with stuffing bytes as needed.
    fn write_ts_packet(&mut self, packet: &TsPacket) -> Result<()>;
}

/// TS packet writer.
#[derive(Debug)]
pub struct TsPacketWriter<W> {
    stream: W,
}
impl<W: Write> TsPacketWriter<W> {
    /// Makes a new `TsPacketWriter` instance.
    pub fn new(stream: W) -> Self {
        TsPacketWriter { stream }
    }

    /// Returns a reference to the underlaying byte stream.
    pub fn stream(&self) -> &W {
        &self.stream
    }

    /// Converts `TsPacketWriter` into the underlaying byte stream.
    pub fn into_stream(self) -> W {
        self.stream
    }

    /// Writes already encoded bytes to the underlaying byte stream.
    ///
    /// # Errors
    ///
    /// If the byte stream fails, it will return an `ErrorKind::WriteFailed` error.
    pub(crate) fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.stream
            .write_all(buf)
            .map_err(|e| track!(crate::Error::from(ErrorKind::WriteFailed.cause(e))))
    }
}
impl<W: Write> WriteTsPacket for TsPacketWriter<W> {
    fn write_ts_packet(&mut self, packet: &TsPacket) -> Result<()> {
        let bytes = track!(packet.to_bytes(true))?;
        track!(self.write_bytes(&bytes))
    }
}
