use std::fmt;

/// Stream type of an elementary stream, as declared in a PMT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamType(u8);
impl StreamType {
    /// ISO/IEC 11172-2 (MPEG-1) video.
    pub const MPEG1_VIDEO: StreamType = StreamType(0x01);

    /// ISO/IEC 13818-2 (MPEG-2) video.
    pub const MPEG2_VIDEO: StreamType = StreamType(0x02);

    /// ISO/IEC 11172-3 (MPEG-1) audio.
    pub const MPEG1_AUDIO: StreamType = StreamType(0x03);

    /// ISO/IEC 13818-3 (MPEG-2) audio.
    pub const MPEG2_AUDIO: StreamType = StreamType(0x04);

    /// PES packets containing private data.
    pub const PES_PRIVATE_DATA: StreamType = StreamType(0x06);

    /// ISO/IEC 13818-7 audio with ADTS transport syntax.
    pub const ADTS_AAC: StreamType = StreamType(0x0F);

    /// ISO/IEC 14496-2 (MPEG-4 part 2) video.
    pub const MPEG4_VIDEO: StreamType = StreamType(0x10);

    /// ISO/IEC 14496-3 audio with LATM transport syntax.
    pub const LATM_AAC: StreamType = StreamType(0x11);

    /// ITU-T H.264 / ISO/IEC 14496-10 video.
    pub const H264: StreamType = StreamType(0x1B);

    /// ITU-T H.265 / ISO/IEC 23008-2 video.
    pub const H265: StreamType = StreamType(0x24);

    /// Dolby Digital (AC-3) audio.
    pub const AC3: StreamType = StreamType(0x81);

    /// Makes a new `StreamType` instance.
    pub fn new(n: u8) -> Self {
        StreamType(n)
    }

    /// Returns the value of the stream type.
    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// Returns `true` if it is a video stream type.
    pub fn is_video(&self) -> bool {
        match *self {
            StreamType::MPEG1_VIDEO
            | StreamType::MPEG2_VIDEO
            | StreamType::MPEG4_VIDEO
            | StreamType::H264
            | StreamType::H265 => true,
            _ => false,
        }
    }

    /// Returns `true` if it is an audio stream type.
    pub fn is_audio(&self) -> bool {
        match *self {
            StreamType::MPEG1_AUDIO
            | StreamType::MPEG2_AUDIO
            | StreamType::ADTS_AAC
            | StreamType::LATM_AAC
            | StreamType::AC3 => true,
            _ => false,
        }
    }

    /// Returns a short codec name of the stream type (e.g., `"h264"`, `"aac"`).
    pub fn title(&self) -> Option<&'static str> {
        match *self {
            StreamType::MPEG1_VIDEO => Some("mpeg1video"),
            StreamType::MPEG2_VIDEO => Some("mpeg2video"),
            StreamType::MPEG1_AUDIO | StreamType::MPEG2_AUDIO => Some("mp3"),
            StreamType::ADTS_AAC | StreamType::LATM_AAC => Some("aac"),
            StreamType::MPEG4_VIDEO => Some("mpeg4"),
            StreamType::H264 => Some("h264"),
            StreamType::H265 => Some("hevc"),
            StreamType::AC3 => Some("ac3"),
            _ => None,
        }
    }
}
impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.title() {
            Some(title) => write!(f, "{}", title),
            None => write!(f, "{:#04x}", self.0),
        }
    }
}
