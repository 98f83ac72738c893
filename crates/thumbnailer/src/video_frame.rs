use crate::error::{Result, ThumbnailerError};

use std::{ffi::c_int, mem, ptr};

use ffmpeg_sys_next::{av_frame_alloc, av_frame_free, AVFrame, AVPixelFormat};

/// A decoded frame, exclusively owned by the session that decoded it.
pub(crate) struct FFmpegFrame(*mut AVFrame);

impl FFmpegFrame {
	pub(crate) fn new() -> Result<Self> {
		let ptr = unsafe { av_frame_alloc() };
		if ptr.is_null() {
			return Err(ThumbnailerError::Allocation("frame"));
		}

		Ok(Self(ptr))
	}

	pub(crate) fn as_ref(&self) -> &AVFrame {
		unsafe { &*self.0 }
	}

	pub(crate) fn as_mut_ptr(&mut self) -> *mut AVFrame {
		self.0
	}

	pub(crate) fn width(&self) -> u32 {
		u32::try_from(self.as_ref().width).unwrap_or_default()
	}

	pub(crate) fn height(&self) -> u32 {
		u32::try_from(self.as_ref().height).unwrap_or_default()
	}

	pub(crate) fn pixel_format(&self) -> Option<AVPixelFormat> {
		let format: c_int = self.as_ref().format;
		if format < 0 || format >= AVPixelFormat::AV_PIX_FMT_NB as c_int {
			return None;
		}

		// SAFETY: `AVPixelFormat` is `repr(i32)` and the value was range checked above
		Some(unsafe { mem::transmute::<c_int, AVPixelFormat>(format) })
	}
}

impl Drop for FFmpegFrame {
	fn drop(&mut self) {
		if !self.0.is_null() {
			unsafe { av_frame_free(&mut self.0) };
			self.0 = ptr::null_mut();
		}
	}
}
