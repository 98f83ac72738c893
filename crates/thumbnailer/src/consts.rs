/// Length in pixels of the longer side of a generated thumbnail.
pub const THUMB_SIZE: u32 = 150;

/// The maximum amount of frames sampled from an animated or video source.
///
/// Also the only bound on containers that never report end of stream.
pub const MAX_FRAMES: usize = 100;

/// Size of the read buffer handed to FFmpeg's custom I/O context.
pub const IO_BUFFER_SIZE: usize = 4 << 10;

/// Bytes per pixel of the canonical RGBA output.
pub const RGBA_CHANNELS: usize = 4;

/// Intensity levels counted per color channel.
pub(crate) const LEVELS: usize = 256;

/// Color channels counted by a histogram.
pub(crate) const HISTOGRAM_CHANNELS: usize = 3;
