//! Demultiplexing of transport streams into elementary stream samples.
//!
//! The PID of each elementary stream is resolved through the PAT and the PMT,
//! and the PES packets of each stream are reassembled into [`Sample`]s.
//!
//! [`Sample`]: ../es/struct.Sample.html
pub use self::session::{spawn, SampleReceiver};

use self::stream::Stream;
use crate::es::Sample;
use crate::ts::{Pat, Pid, Pmt, ReadTsPacket, TransportScramblingControl, TsPacket};
use crate::Result;
use std::collections::{BTreeMap, VecDeque};

mod session;
mod stream;

/// The `ReadSample` trait allows for reading elementary stream samples from a source.
pub trait ReadSample {
    /// Reads a sample.
    ///
    /// If the end of the stream is reached, it will return `Ok(None)`.
    fn read_sample(&mut self) -> Result<Option<Sample>>;
}

/// Transport stream demultiplexer.
///
/// Samples are emitted in the order their last TS packet arrived.
///
/// Errors of the TS packet reader and PAT/PMT decoding errors terminate the demultiplexer,
/// after which `read_sample` always returns `Ok(None)`.
/// A malformed PES header only discards the sample being assembled on its PID.
///
/// PAT/PMT sections spanning several TS packets are reassembled before decoding.
#[derive(Debug)]
pub struct Demuxer<R> {
    ts_packet_reader: R,
    pat: Option<Pat>,
    pmt: Option<Pmt>,
    psi_buffers: BTreeMap<Pid, Vec<u8>>,
    streams: BTreeMap<Pid, Stream>,
    samples: VecDeque<Sample>,
    eos: bool,
}
impl<R: ReadTsPacket> Demuxer<R> {
    /// Makes a new `Demuxer` instance.
    ///
    /// No PAT/PMT is known at this point, so packets are ignored until both arrive.
    pub fn new(ts_packet_reader: R) -> Self {
        Demuxer {
            ts_packet_reader,
            pat: None,
            pmt: None,
            psi_buffers: BTreeMap::new(),
            streams: BTreeMap::new(),
            samples: VecDeque::new(),
            eos: false,
        }
    }

    /// Returns the most recently decoded PAT.
    pub fn pat(&self) -> Option<&Pat> {
        self.pat.as_ref()
    }

    /// Returns the most recently decoded PMT.
    pub fn pmt(&self) -> Option<&Pmt> {
        self.pmt.as_ref()
    }

    /// Returns a reference to the underlaying TS packet reader.
    pub fn ts_packet_reader(&self) -> &R {
        &self.ts_packet_reader
    }

    /// Converts `Demuxer` into the underlaying TS packet reader.
    pub fn into_ts_packet_reader(self) -> R {
        self.ts_packet_reader
    }

    fn is_pmt_pid(&self, pid: Pid) -> bool {
        self.pat.as_ref().map_or(false, |pat| {
            pat.table
                .iter()
                .any(|pa| pa.program_num != 0 && pa.program_map_pid == pid)
        })
    }

    fn handle_psi_packet(&mut self, packet: &TsPacket) -> Result<()> {
        let pid = packet.header.pid;
        if packet.header.payload_unit_start_indicator {
            self.psi_buffers.insert(pid, packet.payload_bytes().to_vec());
        } else if let Some(buf) = self.psi_buffers.get_mut(&pid) {
            buf.extend_from_slice(packet.payload_bytes());
        } else {
            trace!("PSI continuation without a section start is ignored: pid={}", pid);
            return Ok(());
        }

        let section_end = match self.psi_buffers.get(&pid).and_then(|buf| psi_section_end(buf)) {
            Some(end) => end,
            None => return Ok(()),
        };
        let buf = self.psi_buffers.remove(&pid).expect("Never fails");
        let payload = &buf[..section_end];
        if pid == Pid::PAT {
            let pat = track!(Pat::read_from(payload))?;
            if self.pat.as_ref() != Some(&pat) {
                debug!("PAT: {:?}", pat);
            }
            self.pat = Some(pat);
        } else {
            let pmt = track!(Pmt::read_from(payload))?;
            if self.pmt.as_ref() != Some(&pmt) {
                debug!("PMT (pid={}): {:?}", pid, pmt);
            }
            self.pmt = Some(pmt);
        }
        Ok(())
    }

    fn handle_es_packet(&mut self, packet: &TsPacket) -> Result<()> {
        let pid = packet.header.pid;
        let stream_type = match self.pmt.as_ref().and_then(|pmt| pmt.find_es_info(pid)) {
            Some(es) => es.stream_type,
            None => return Ok(()),
        };
        if packet.header.transport_scrambling_control != TransportScramblingControl::NotScrambled {
            warn!("Scrambled packet is skipped: pid={}", pid);
            return Ok(());
        }

        let stream = self.streams.entry(pid).or_insert_with(|| {
            debug!("New stream: pid={}, type={}", pid, stream_type);
            Stream::new(pid, stream_type)
        });
        stream.set_stream_type(stream_type);
        track!(stream.handle_packet(packet, &mut self.samples))
    }

    fn handle_eos(&mut self) {
        self.eos = true;
        for stream in self.streams.values_mut() {
            stream.flush(&mut self.samples);
        }
    }

    fn terminate(&mut self) {
        self.eos = true;
        self.samples.clear();
    }
}
impl<R: ReadTsPacket> ReadSample for Demuxer<R> {
    fn read_sample(&mut self) -> Result<Option<Sample>> {
        loop {
            if let Some(sample) = self.samples.pop_front() {
                trace!(
                    "Sample: pid={}, type={}, {} bytes, pts={:?}, dts={:?}",
                    sample.pid,
                    sample.stream_type,
                    sample.data.len(),
                    sample.pts,
                    sample.dts
                );
                return Ok(Some(sample));
            }
            if self.eos {
                return Ok(None);
            }

            let packet = match self.ts_packet_reader.read_ts_packet() {
                Ok(Some(packet)) => packet,
                Ok(None) => {
                    self.handle_eos();
                    continue;
                }
                Err(e) => {
                    self.terminate();
                    return Err(track!(e));
                }
            };

            let pid = packet.header.pid;
            if pid == Pid::PAT || self.is_pmt_pid(pid) {
                if let Err(e) = self.handle_psi_packet(&packet) {
                    self.terminate();
                    return Err(track!(e));
                }
            } else {
                track!(self.handle_es_packet(&packet))?;
            }
        }
    }
}

/// Returns the end offset of the PSI section in `buf` (pointer field included),
/// or `None` if more bytes are needed.
fn psi_section_end(buf: &[u8]) -> Option<usize> {
    const MAX_SECTION_LEN: usize = 1021;

    let start = 1 + usize::from(*buf.first()?);
    if buf.len() < start + 3 {
        return None;
    }
    let section_len = (usize::from(buf[start + 1] & 0x0F) << 8) | usize::from(buf[start + 2]);
    if section_len > MAX_SECTION_LEN {
        // Malformed; the decoder reports it.
        return Some(buf.len());
    }
    let end = start + 3 + section_len;
    if buf.len() < end {
        None
    } else {
        Some(end)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::es::{StreamId, StreamType};
    use crate::pes::PesHeader;
    use crate::time::{ClockReference, Timestamp};
    use crate::ts::{
        AdaptationField, Bytes, ContinuityCounter, EsInfo, ProgramAssociation, TsHeader,
        TsPacketReader, VersionNumber,
    };
    use crate::ErrorKind;

    const PMT_PID: u16 = 0x1000;
    const VIDEO_PID: u16 = 0x100;
    const AUDIO_PID: u16 = 0x101;

    fn pid(n: u16) -> Pid {
        track_try_unwrap!(Pid::new(n))
    }

    fn counter(n: u8) -> ContinuityCounter {
        track_try_unwrap!(ContinuityCounter::from_u8(n % 16))
    }

    fn timestamp(n: u64) -> Timestamp {
        track_try_unwrap!(Timestamp::new(n))
    }

    fn packet(
        pid_: u16,
        start: bool,
        cc: u8,
        adaptation_field: Option<AdaptationField>,
        payload: &[u8],
    ) -> Vec<u8> {
        let packet = TsPacket {
            header: TsHeader::new(pid(pid_), start, counter(cc)),
            adaptation_field,
            payload: Some(track_try_unwrap!(Bytes::new(payload))),
        };
        track_try_unwrap!(packet.to_bytes(true)).to_vec()
    }

    fn psi_packets() -> Vec<u8> {
        let pat = Pat {
            transport_stream_id: 1,
            version_number: VersionNumber::new(),
            table: vec![ProgramAssociation {
                program_num: 1,
                program_map_pid: pid(PMT_PID),
            }],
        };
        let pmt = Pmt {
            program_num: 1,
            pcr_pid: Some(pid(VIDEO_PID)),
            version_number: VersionNumber::new(),
            program_info: Vec::new(),
            es_info: vec![
                EsInfo {
                    stream_type: StreamType::H264,
                    elementary_pid: pid(VIDEO_PID),
                    descriptors: Vec::new(),
                },
                EsInfo {
                    stream_type: StreamType::ADTS_AAC,
                    elementary_pid: pid(AUDIO_PID),
                    descriptors: Vec::new(),
                },
            ],
        };
        let mut pat_payload = Vec::new();
        track_try_unwrap!(pat.write_to(&mut pat_payload));
        let mut pmt_payload = Vec::new();
        track_try_unwrap!(pmt.write_to(&mut pmt_payload));

        let mut bytes = packet(0, true, 0, None, &pat_payload);
        bytes.extend(packet(PMT_PID, true, 0, None, &pmt_payload));
        bytes
    }

    fn pes_bytes(header: &PesHeader, data: &[u8], bounded: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        let data_len = if bounded { Some(data.len()) } else { None };
        track_try_unwrap!(header.write_to(&mut buf, data_len));
        buf.extend_from_slice(data);
        buf
    }

    fn video_header() -> PesHeader {
        PesHeader {
            pts: Some(timestamp(183_000)),
            dts: Some(timestamp(180_000)),
            ..PesHeader::new(StreamId::new(0xE0))
        }
    }

    fn read_all<R: ReadTsPacket>(demuxer: &mut Demuxer<R>) -> Vec<Sample> {
        let mut samples = Vec::new();
        while let Some(sample) = track_try_unwrap!(demuxer.read_sample()) {
            samples.push(sample);
        }
        samples
    }

    #[test]
    fn reassemble_sample_from_three_packets() {
        let data: Vec<u8> = (0..500).map(|i| i as u8).collect();
        let pes = pes_bytes(&video_header(), &data, true);
        assert_eq!(pes.len(), 519);

        let pcr = track_try_unwrap!(ClockReference::new(54_000_000));
        let adaptation_field = AdaptationField {
            random_access_indicator: true,
            pcr: Some(pcr),
            ..AdaptationField::default()
        };
        let mut bytes = psi_packets();
        bytes.extend(packet(VIDEO_PID, true, 0, Some(adaptation_field), &pes[..176]));
        bytes.extend(packet(VIDEO_PID, false, 1, None, &pes[176..360]));
        bytes.extend(packet(VIDEO_PID, false, 2, None, &pes[360..]));

        let mut demuxer = Demuxer::new(TsPacketReader::new(&bytes[..]));
        let samples = read_all(&mut demuxer);
        assert_eq!(samples.len(), 1);

        let sample = &samples[0];
        assert_eq!(sample.pid, pid(VIDEO_PID));
        assert_eq!(sample.stream_type, StreamType::H264);
        assert_eq!(sample.stream_id, StreamId::new(0xE0));
        assert_eq!(sample.data, data);
        assert_eq!(sample.pts, Some(timestamp(183_000)));
        assert_eq!(sample.dts, Some(timestamp(180_000)));
        assert_eq!(sample.pcr, Some(pcr));
        assert!(sample.random_access_indicator);

        assert!(demuxer.pat().is_some());
        assert_eq!(demuxer.pmt().map(|pmt| pmt.es_info.len()), Some(2));
    }

    #[test]
    fn samples_follow_arrival_order() {
        let audio_header = PesHeader {
            pts: Some(timestamp(1000)),
            ..PesHeader::new(StreamId::new(0xC0))
        };
        let video = pes_bytes(&video_header(), &[1; 300], true);
        let audio = pes_bytes(&audio_header, &[2; 100], true);

        let mut bytes = psi_packets();
        bytes.extend(packet(VIDEO_PID, true, 0, None, &video[..184]));
        bytes.extend(packet(AUDIO_PID, true, 0, None, &audio));
        bytes.extend(packet(VIDEO_PID, false, 1, None, &video[184..]));

        let mut demuxer = Demuxer::new(TsPacketReader::new(&bytes[..]));
        let samples = read_all(&mut demuxer);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].pid, pid(AUDIO_PID));
        assert_eq!(samples[0].stream_type, StreamType::ADTS_AAC);
        assert_eq!(samples[0].data, vec![2; 100]);
        assert_eq!(samples[0].dts, None);
        assert!(!samples[0].random_access_indicator);
        assert_eq!(samples[1].pid, pid(VIDEO_PID));
        assert_eq!(samples[1].data, vec![1; 300]);
    }

    #[test]
    fn unclassified_pids_are_ignored() {
        let pes = pes_bytes(&video_header(), &[0; 50], true);

        // Before any PAT/PMT.
        let mut bytes = packet(VIDEO_PID, true, 0, None, &pes);
        bytes.extend(psi_packets());
        // Not listed in the PMT.
        bytes.extend(packet(0x200, true, 0, None, &pes));
        bytes.extend(packet(0x200, false, 1, None, &[0xFF; 184]));
        bytes.extend(packet(Pid::NULL.as_u16(), false, 0, None, &[0xFF; 184]));

        let mut demuxer = Demuxer::new(TsPacketReader::new(&bytes[..]));
        assert!(read_all(&mut demuxer).is_empty());
    }

    #[test]
    fn payload_before_unit_start_is_dropped() {
        let pes = pes_bytes(&video_header(), &[7; 50], true);

        let mut bytes = psi_packets();
        bytes.extend(packet(VIDEO_PID, false, 0, None, &[0xAA; 184]));
        bytes.extend(packet(VIDEO_PID, true, 1, None, &pes));

        let mut demuxer = Demuxer::new(TsPacketReader::new(&bytes[..]));
        let samples = read_all(&mut demuxer);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].data, vec![7; 50]);
    }

    #[test]
    fn unbounded_samples_are_flushed() {
        let first = pes_bytes(&video_header(), &[1; 250], false);
        let second = pes_bytes(&video_header(), &[2; 20], false);

        let mut bytes = psi_packets();
        bytes.extend(packet(VIDEO_PID, true, 0, None, &first[..184]));
        bytes.extend(packet(VIDEO_PID, false, 1, None, &first[184..]));
        bytes.extend(packet(VIDEO_PID, true, 2, None, &second));

        let mut demuxer = Demuxer::new(TsPacketReader::new(&bytes[..]));
        let samples = read_all(&mut demuxer);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].data, vec![1; 250]);
        assert_eq!(samples[1].data, vec![2; 20]);
    }

    #[test]
    fn incomplete_bounded_sample_is_discarded_at_eos() {
        let pes = pes_bytes(&video_header(), &[1; 400], true);

        let mut bytes = psi_packets();
        bytes.extend(packet(VIDEO_PID, true, 0, None, &pes[..184]));

        let mut demuxer = Demuxer::new(TsPacketReader::new(&bytes[..]));
        assert!(read_all(&mut demuxer).is_empty());
    }

    #[test]
    fn corrupted_packet_terminates_session() {
        let pes = pes_bytes(&video_header(), &[1; 10], true);

        let mut bytes = psi_packets();
        bytes.extend(packet(VIDEO_PID, true, 0, None, &pes));
        let mut broken = packet(VIDEO_PID, true, 1, None, &pes);
        broken[0] = 0x00;
        bytes.extend(broken);
        bytes.extend(packet(VIDEO_PID, true, 2, None, &pes));

        let mut demuxer = Demuxer::new(TsPacketReader::new(&bytes[..]));
        assert!(track_try_unwrap!(demuxer.read_sample()).is_some());
        let e = demuxer.read_sample().err().unwrap();
        assert_eq!(*e.kind(), ErrorKind::InvalidInput);
        assert_eq!(track_try_unwrap!(demuxer.read_sample()), None);
    }

    #[test]
    fn malformed_pes_header_only_affects_its_stream() {
        let good = pes_bytes(&video_header(), &[3; 10], true);
        let mut bad = good.clone();
        bad[2] = 0x02;

        let mut bytes = psi_packets();
        bytes.extend(packet(VIDEO_PID, true, 0, None, &bad));
        bytes.extend(packet(VIDEO_PID, true, 1, None, &good));

        let mut demuxer = Demuxer::new(TsPacketReader::new(&bytes[..]));
        let e = demuxer.read_sample().err().unwrap();
        assert_eq!(*e.kind(), ErrorKind::InvalidInput);
        let sample = track_try_unwrap!(demuxer.read_sample()).unwrap();
        assert_eq!(sample.data, vec![3; 10]);
        assert_eq!(track_try_unwrap!(demuxer.read_sample()), None);
    }

    #[test]
    fn pmt_spanning_two_packets() {
        let pat = Pat {
            transport_stream_id: 1,
            version_number: VersionNumber::new(),
            table: vec![ProgramAssociation {
                program_num: 1,
                program_map_pid: pid(PMT_PID),
            }],
        };
        let pmt = Pmt {
            program_num: 1,
            pcr_pid: None,
            version_number: VersionNumber::new(),
            program_info: Vec::new(),
            es_info: (0..40)
                .map(|i| EsInfo {
                    stream_type: StreamType::ADTS_AAC,
                    elementary_pid: pid(0x200 + i),
                    descriptors: Vec::new(),
                })
                .collect(),
        };
        let mut pat_payload = Vec::new();
        track_try_unwrap!(pat.write_to(&mut pat_payload));
        let mut pmt_payload = Vec::new();
        track_try_unwrap!(pmt.write_to(&mut pmt_payload));
        assert!(pmt_payload.len() > TsPacket::BODY_SIZE);

        let audio_header = PesHeader {
            pts: Some(timestamp(1000)),
            ..PesHeader::new(StreamId::new(0xC0))
        };
        let pes = pes_bytes(&audio_header, &[5; 30], true);

        let mut bytes = packet(0, true, 0, None, &pat_payload);
        bytes.extend(packet(PMT_PID, true, 0, None, &pmt_payload[..TsPacket::BODY_SIZE]));
        bytes.extend(packet(0x227, true, 0, None, &pes));
        bytes.extend(packet(PMT_PID, false, 1, None, &pmt_payload[TsPacket::BODY_SIZE..]));
        bytes.extend(packet(0x227, true, 1, None, &pes));

        let mut demuxer = Demuxer::new(TsPacketReader::new(&bytes[..]));
        let samples = read_all(&mut demuxer);
        assert_eq!(demuxer.pmt(), Some(&pmt));
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].pid, pid(0x227));
        assert_eq!(samples[0].data, vec![5; 30]);
    }

    #[test]
    fn psi_section_end_works() {
        let section = [0, 0x00, 0xB0, 0x0D, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13];
        assert_eq!(psi_section_end(&[]), None);
        assert_eq!(psi_section_end(&section[..3]), None);
        assert_eq!(psi_section_end(&section[..16]), None);
        assert_eq!(psi_section_end(&section), Some(17));

        let mut stuffed = section.to_vec();
        stuffed.extend_from_slice(&[0xFF; 10]);
        assert_eq!(psi_section_end(&stuffed), Some(17));

        let mut pointed = vec![2, 0xAA, 0xBB];
        pointed.extend_from_slice(&section[1..]);
        assert_eq!(psi_section_end(&pointed), Some(19));

        // Section length beyond the limit is left to the decoder.
        let broken = [0, 0x00, 0xB7, 0xFF, 0];
        assert_eq!(psi_section_end(&broken), Some(5));
    }
}
