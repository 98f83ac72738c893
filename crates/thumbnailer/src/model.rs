use std::{fmt, time::Duration};

/// What was learned about the thumbnailed file while decoding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Source {
	pub width: u32,
	pub height: u32,
	/// Container duration, zero for still images and for containers that don't report one.
	pub duration: Duration,
}

/// A thumbnail in packed RGBA, 4 bytes per pixel with a stride of `4 * width`.
#[derive(Clone, PartialEq, Eq)]
pub struct Thumb {
	pub data: Vec<u8>,
	pub width: u32,
	pub height: u32,
}

impl fmt::Debug for Thumb {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Thumb")
			.field("data", &format_args!("<{} bytes>", self.data.len()))
			.field("width", &self.width)
			.field("height", &self.height)
			.finish()
	}
}

/// A successful thumbnailing result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
	pub source: Source,
	pub thumb: Thumb,
}
