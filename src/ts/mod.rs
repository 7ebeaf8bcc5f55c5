//! Transport stream packets and PSI tables.
//!
//! # References
//!
//! - [MPEG transport stream](https://en.wikipedia.org/wiki/MPEG_transport_stream)
//! - [Program-specific information](https://en.wikipedia.org/wiki/Program-specific_information)
pub use self::adaptation_field::AdaptationField;
pub use self::packet::{TsHeader, TsPacket};
pub use self::pat::{Pat, ProgramAssociation};
pub use self::pmt::{Descriptor, EsInfo, Pmt};
pub use self::reader::{ReadTsPacket, TsPacketReader};
pub use self::types::{Bytes, ContinuityCounter, Pid, TransportScramblingControl, VersionNumber};
pub use self::writer::{TsPacketWriter, WriteTsPacket};

mod adaptation_field;
mod packet;
mod pat;
mod pmt;
mod psi;
mod reader;
mod types;
mod writer;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pat() {
        let mut reader = TsPacketReader::new(pat_packet_bytes());
        let packet = track_try_unwrap!(reader.read_ts_packet()).unwrap();
        assert_eq!(packet, pat_packet());
        assert_eq!(track_try_unwrap!(reader.read_ts_packet()), None);

        let pat = track_try_unwrap!(Pat::read_from(packet.payload_bytes()));
        assert_eq!(pat.table[0].program_map_pid, track_try_unwrap!(Pid::new(480)));

        let mut writer = TsPacketWriter::new(Vec::new());
        track_try_unwrap!(writer.write_ts_packet(&packet));
        assert_eq!(&writer.stream()[..], pat_packet_bytes());
    }

    fn pat_packet_bytes() -> &'static [u8] {
        &[
            71, 64, 0, 17, 0, 0, 176, 13, 0, 0, 195, 0, 0, 0, 1, 225, 224, 232, 95, 116, 236, 255,
            255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
            255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
            255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
            255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
            255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
            255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
            255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
            255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
            255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
            255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
        ][..]
    }

    fn pat_packet() -> TsPacket {
        let payload = &pat_packet_bytes()[4..];
        TsPacket {
            header: TsHeader {
                transport_error_indicator: false,
                payload_unit_start_indicator: true,
                transport_priority: false,
                pid: Pid::from(0),
                transport_scrambling_control: TransportScramblingControl::NotScrambled,
                continuity_counter: ContinuityCounter::from_u8(1).unwrap(),
            },
            adaptation_field: None,
            payload: Some(track_try_unwrap!(Bytes::new(payload))),
        }
    }
}
