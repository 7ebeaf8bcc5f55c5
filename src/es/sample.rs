use crate::es::{StreamId, StreamType};
use crate::time::{ClockReference, Timestamp};
use crate::ts::Pid;

/// An access unit of an elementary stream (e.g., a video frame) with its timing information.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sample {
    /// PID of the TS packets that carried the sample.
    pub pid: Pid,

    /// Stream type declared for `pid` in the PMT.
    pub stream_type: StreamType,

    /// Stream identifier of the PES packet.
    pub stream_id: StreamId,

    /// PCR carried by the TS packet that started the sample.
    pub pcr: Option<ClockReference>,

    /// Presentation timestamp.
    pub pts: Option<Timestamp>,

    /// Decode timestamp.
    pub dts: Option<Timestamp>,

    /// Payload of the PES packet.
    pub data: Vec<u8>,

    /// Random access indicator of the TS packet that started the sample.
    pub random_access_indicator: bool,
}
