//! Audio subsystem module

pub mod buffer;
pub mod format;
pub mod output;
pub mod playback;

pub use buffer::ChannelRingBuffer;
pub use format::{SampleFormat, SampleFormatter};
pub use output::{ChunkSource, OutputFormat};
pub use playback::HostPlayback;
