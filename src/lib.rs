//! MPEG2-TS demultiplexing and remultiplexing library.
//!
//! The crate reads transport stream packets, recovers the program structure from
//! PAT/PMT tables, reassembles PES packets into elementary stream samples
//! and writes such samples back into a transport stream.
//!
//! # References
//!
//! - [MPEG transport stream](https://en.wikipedia.org/wiki/MPEG_transport_stream)
#![warn(missing_docs)]
#[macro_use]
extern crate log;
#[macro_use]
extern crate trackable;

pub use crate::error::{Error, ErrorKind};

// Running out of bytes inside a packet means the input is malformed.
macro_rules! track_io {
    ($expr:expr) => {
        $expr.map_err(|e: ::std::io::Error| {
            use trackable::error::ErrorKindExt;
            let kind = if e.kind() == ::std::io::ErrorKind::UnexpectedEof {
                crate::ErrorKind::InvalidInput
            } else {
                crate::ErrorKind::Other
            };
            track!(crate::Error::from(kind.cause(e)))
        })
    };
}

pub mod demux;
pub mod es;
pub mod mux;
pub mod pes;
pub mod time;
pub mod ts;

mod error;
mod util;

/// This crate specific `Result` type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::*;
    use crate::demux::{Demuxer, ReadSample};
    use crate::es::{Sample, StreamId, StreamType};
    use crate::mux::TsMuxer;
    use crate::time::{ClockReference, Timestamp};
    use crate::ts::{EsInfo, Pat, Pid, Pmt, ProgramAssociation, TsPacketReader, VersionNumber};

    fn pat() -> Pat {
        Pat {
            transport_stream_id: 1,
            version_number: VersionNumber::default(),
            table: vec![ProgramAssociation {
                program_num: 1,
                program_map_pid: track_try_unwrap!(Pid::new(0x1000)),
            }],
        }
    }

    fn pmt() -> Pmt {
        Pmt {
            program_num: 1,
            pcr_pid: Some(track_try_unwrap!(Pid::new(0x100))),
            version_number: VersionNumber::default(),
            program_info: Vec::new(),
            es_info: vec![EsInfo {
                stream_type: StreamType::H264,
                elementary_pid: track_try_unwrap!(Pid::new(0x100)),
                descriptors: Vec::new(),
            }],
        }
    }

    fn sample(i: u8, len: usize) -> Sample {
        Sample {
            pid: track_try_unwrap!(Pid::new(0x100)),
            stream_type: StreamType::H264,
            stream_id: StreamId::new(StreamId::VIDEO_MIN),
            pcr: Some(track_try_unwrap!(ClockReference::new(
                27_000_000 * u64::from(i)
            ))),
            pts: Some(track_try_unwrap!(Timestamp::new(90_000 + 3000 * u64::from(i)))),
            dts: Some(track_try_unwrap!(Timestamp::new(87_000 + 3000 * u64::from(i)))),
            data: (0..len).map(|n| (n as u8).wrapping_add(i)).collect(),
            random_access_indicator: i % 2 == 0,
        }
    }

    #[test]
    fn remux_round_trip() {
        let samples = vec![sample(0, 10), sample(1, 500), sample(2, 184), sample(3, 3000)];

        let mut muxer = TsMuxer::new(Vec::new());
        track_try_unwrap!(muxer.write_pat(&pat()));
        track_try_unwrap!(muxer.write_pmt(track_try_unwrap!(Pid::new(0x1000)), &pmt()));
        for s in &samples {
            track_try_unwrap!(muxer.write_sample(s));
        }
        let bytes = muxer.into_stream();
        assert_eq!(bytes.len() % ts::TsPacket::SIZE, 0);

        let mut demuxer = Demuxer::new(TsPacketReader::new(&bytes[..]));
        for expected in &samples {
            let actual = track_try_unwrap!(demuxer.read_sample()).unwrap();
            assert_eq!(&actual, expected);
        }
        assert_eq!(track_try_unwrap!(demuxer.read_sample()), None);
    }
}
