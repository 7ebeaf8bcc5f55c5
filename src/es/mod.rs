//! Elementary streams.
pub use self::sample::Sample;
pub use self::stream_id::StreamId;
pub use self::stream_type::StreamType;

mod sample;
mod stream_id;
mod stream_type;
