use crate::ts::TsPacket;
use crate::{ErrorKind, Result};
use std::io::{ErrorKind as IoErrorKind, Read};

/// The `ReadTsPacket` trait allows for reading TS packets from a source.
pub trait ReadTsPacket {
    /// Reads a TS packet.
    ///
    /// If the end of the stream is reached, it will return `Ok(None)`.
    fn read_ts_packet(&mut self) -> Result<Option<TsPacket>>;
}

/// TS packet reader.
#[derive(Debug)]
pub struct TsPacketReader<R> {
    stream: R,
}
impl<R: Read> TsPacketReader<R> {
    /// Makes a new `TsPacketReader` instance.
    pub fn new(stream: R) -> Self {
        TsPacketReader { stream }
    }

    /// Returns a reference to the underlaying byte stream.
    pub fn stream(&self) -> &R {
        &self.stream
    }

    /// Converts `TsPacketReader` into the underlaying byte stream `R`.
    pub fn into_stream(self) -> R {
        self.stream
    }
}
impl<R: Read> ReadTsPacket for TsPacketReader<R> {
    fn read_ts_packet(&mut self) -> Result<Option<TsPacket>> {
        let mut buf = [0; TsPacket::SIZE];
        if track_io!(self.stream.read(&mut buf[..1]))? == 0 {
            return Ok(None);
        }
        match self.stream.read_exact(&mut buf[1..]) {
            Ok(()) => {}
            Err(ref e) if e.kind() == IoErrorKind::UnexpectedEof => {
                track_panic!(ErrorKind::InvalidInput, "Truncated TS packet");
            }
            Err(e) => return track_io!(Err(e)),
        }
        track!(TsPacket::from_bytes(&buf)).map(Some)
    }
}
