use crate::es::{Sample, StreamType};
use crate::pes::PesHeader;
use crate::time::ClockReference;
use crate::ts::{ContinuityCounter, Pid, TsPacket};
use crate::Result;
use std::collections::VecDeque;
use std::mem;

/// Reassembly state of an elementary stream.
#[derive(Debug)]
pub(super) struct Stream {
    pid: Pid,
    stream_type: StreamType,
    last_counter: Option<ContinuityCounter>,
    state: State,
}
impl Stream {
    pub fn new(pid: Pid, stream_type: StreamType) -> Self {
        Stream {
            pid,
            stream_type,
            last_counter: None,
            state: State::WaitingForStart,
        }
    }

    pub fn set_stream_type(&mut self, stream_type: StreamType) {
        self.stream_type = stream_type;
    }

    /// Handles a TS packet carrying this stream and pushes completed samples to `samples`.
    ///
    /// If the packet starts a PES packet with a malformed header, the partial sample
    /// is discarded and the stream waits for the next unit start.
    pub fn handle_packet(
        &mut self,
        packet: &TsPacket,
        samples: &mut VecDeque<Sample>,
    ) -> Result<()> {
        let payload = if let Some(ref payload) = packet.payload {
            payload
        } else {
            return Ok(());
        };
        self.check_continuity(packet);

        if packet.header.payload_unit_start_indicator {
            self.flush(samples);

            let mut reader = &payload[..];
            let (header, data_len) = track!(PesHeader::read_from(&mut reader))?;
            let mut data = Vec::with_capacity(data_len.unwrap_or_else(|| reader.len()));
            data.extend_from_slice(reader);
            self.state = State::Accumulating(PartialSample {
                header,
                data_len,
                pcr: packet.pcr(),
                random_access_indicator: packet.random_access_indicator(),
                data,
            });
        } else if let State::Accumulating(ref mut partial) = self.state {
            partial.data.extend_from_slice(payload);
        } else {
            trace!(
                "Payload before the first unit start is dropped: pid={}, {} bytes",
                self.pid,
                payload.len()
            );
            return Ok(());
        }

        let completed = match self.state {
            State::Accumulating(ref partial) => partial.is_completed(),
            State::WaitingForStart => false,
        };
        if completed {
            let partial = self.take_partial().expect("Never fails");
            if partial.is_overrun() {
                warn!(
                    "Too large PES packet data is discarded: pid={}, actual={}, expected={:?}",
                    self.pid,
                    partial.data.len(),
                    partial.data_len
                );
            } else {
                samples.push_back(partial.into_sample(self.pid, self.stream_type));
            }
        }
        Ok(())
    }

    /// Emits the in-progress sample if its length is unbounded.
    ///
    /// Incomplete bounded samples are discarded.
    pub fn flush(&mut self, samples: &mut VecDeque<Sample>) {
        if let Some(partial) = self.take_partial() {
            if partial.data_len.is_none() {
                samples.push_back(partial.into_sample(self.pid, self.stream_type));
            } else {
                debug!(
                    "Incomplete PES packet is discarded: pid={}, actual={}, expected={:?}",
                    self.pid,
                    partial.data.len(),
                    partial.data_len
                );
            }
        }
    }

    fn take_partial(&mut self) -> Option<PartialSample> {
        match mem::replace(&mut self.state, State::WaitingForStart) {
            State::Accumulating(partial) => Some(partial),
            State::WaitingForStart => None,
        }
    }

    fn check_continuity(&mut self, packet: &TsPacket) {
        let counter = packet.header.continuity_counter;
        if let Some(last) = self.last_counter {
            let expected = last.next();
            if counter != expected && counter != last && !packet.discontinuity_indicator() {
                warn!(
                    "Continuity counter gap: pid={}, expected={}, actual={}",
                    self.pid,
                    expected.as_u8(),
                    counter.as_u8()
                );
            }
        }
        self.last_counter = Some(counter);
    }
}

#[derive(Debug)]
enum State {
    WaitingForStart,
    Accumulating(PartialSample),
}

#[derive(Debug)]
struct PartialSample {
    header: PesHeader,
    data_len: Option<usize>,
    pcr: Option<ClockReference>,
    random_access_indicator: bool,
    data: Vec<u8>,
}
impl PartialSample {
    fn is_completed(&self) -> bool {
        self.data_len.map_or(false, |n| self.data.len() >= n)
    }

    fn is_overrun(&self) -> bool {
        self.data_len.map_or(false, |n| self.data.len() > n)
    }

    fn into_sample(self, pid: Pid, stream_type: StreamType) -> Sample {
        Sample {
            pid,
            stream_type,
            stream_id: self.header.stream_id,
            pcr: self.pcr,
            pts: self.header.pts,
            dts: self.header.dts,
            data: self.data,
            random_access_indicator: self.random_access_indicator,
        }
    }
}
