use crate::error::{Result, ThumbnailerError};

use std::ptr;

use ffmpeg_sys_next::{av_packet_alloc, av_packet_free, av_packet_unref, AVPacket};

pub(crate) struct FFmpegPacket(*mut AVPacket);

impl FFmpegPacket {
	pub(crate) fn new() -> Result<Self> {
		let ptr = unsafe { av_packet_alloc() };
		if ptr.is_null() {
			return Err(ThumbnailerError::Allocation("packet"));
		}

		Ok(Self(ptr))
	}

	pub(crate) fn as_ref(&self) -> &AVPacket {
		unsafe { &*self.0 }
	}

	pub(crate) fn as_mut_ptr(&mut self) -> *mut AVPacket {
		self.0
	}

	pub(crate) fn stream_index(&self) -> i32 {
		self.as_ref().stream_index
	}

	/// Drops the payload so the packet can be read into again.
	pub(crate) fn reset(&mut self) -> &mut Self {
		unsafe { av_packet_unref(self.0) };
		self
	}
}

impl Drop for FFmpegPacket {
	fn drop(&mut self) {
		if !self.0.is_null() {
			unsafe { av_packet_free(&mut self.0) };
			self.0 = ptr::null_mut();
		}
	}
}
