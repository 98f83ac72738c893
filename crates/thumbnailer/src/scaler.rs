use crate::{
	consts::RGBA_CHANNELS,
	error::{Result, ThumbnailerError},
	model::Thumb,
	video_frame::FFmpegFrame,
};

use std::{ffi::c_int, ptr};

use ffmpeg_sys_next::{
	sws_freeContext, sws_getCachedContext, sws_scale, AVPixelFormat, SwsContext, SWS_BICUBIC,
};

/// Output dimensions that keep the aspect ratio and set the longer side to `thumb_size`.
///
/// Smaller sources are scaled up the same way larger ones are scaled down.
#[must_use]
#[allow(
	clippy::cast_possible_truncation,
	clippy::cast_sign_loss,
	clippy::as_conversions
)]
pub fn thumb_dimensions(width: u32, height: u32, thumb_size: u32) -> (u32, u32) {
	let longer = width.max(height);
	if longer == 0 {
		return (1, 1);
	}

	let scaled = |side: u32| {
		let exact = f64::from(side) * f64::from(thumb_size) / f64::from(longer);
		(exact.round() as u32).clamp(1, thumb_size)
	};

	(scaled(width), scaled(height))
}

/// Converts frames to packed pixel buffers, reusing one `SwsContext` while the
/// conversion parameters stay the same.
pub(crate) struct FFmpegScaler {
	ptr: *mut SwsContext,
}

impl FFmpegScaler {
	pub(crate) const fn new() -> Self {
		Self {
			ptr: ptr::null_mut(),
		}
	}

	/// Converts `frame` into `out` as packed `format` pixels of `width` x `height`, with
	/// a stride of `channels * width` bytes.
	pub(crate) fn convert_into(
		&mut self,
		frame: &FFmpegFrame,
		(width, height): (u32, u32),
		format: AVPixelFormat,
		channels: usize,
		out: &mut Vec<u8>,
	) -> Result<()> {
		let src_format = frame.pixel_format().ok_or_else(|| {
			ThumbnailerError::FrameDecode(format!(
				"frame has an unknown pixel format: {}",
				frame.as_ref().format
			))
		})?;
		let src = frame.as_ref();
		if src.width <= 0 || src.height <= 0 {
			return Err(ThumbnailerError::FrameDecode(format!(
				"frame has invalid dimensions {}x{}",
				src.width, src.height
			)));
		}

		let dst_width =
			c_int::try_from(width).map_err(|_| ThumbnailerError::InvalidThumbSize(width))?;
		let dst_height =
			c_int::try_from(height).map_err(|_| ThumbnailerError::InvalidThumbSize(height))?;
		let stride = channels * usize::try_from(width).unwrap_or(usize::MAX);
		let c_stride =
			c_int::try_from(stride).map_err(|_| ThumbnailerError::InvalidThumbSize(width))?;

		// On failure the previous context has already been released by FFmpeg
		self.ptr = unsafe {
			sws_getCachedContext(
				self.ptr,
				src.width,
				src.height,
				src_format,
				dst_width,
				dst_height,
				format,
				SWS_BICUBIC,
				ptr::null_mut(),
				ptr::null_mut(),
				ptr::null(),
			)
		};
		if self.ptr.is_null() {
			return Err(ThumbnailerError::Allocation("scaling context"));
		}

		out.clear();
		out.resize(stride * usize::try_from(height).unwrap_or_default(), 0);

		let dst_data = [
			out.as_mut_ptr(),
			ptr::null_mut(),
			ptr::null_mut(),
			ptr::null_mut(),
		];
		let dst_linesize = [c_stride, 0, 0, 0];

		let written = unsafe {
			sws_scale(
				self.ptr,
				src.data.as_ptr().cast::<*const u8>(),
				src.linesize.as_ptr(),
				0,
				src.height,
				dst_data.as_ptr(),
				dst_linesize.as_ptr(),
			)
		};
		if written != dst_height {
			return Err(ThumbnailerError::FrameDecode(format!(
				"scaler produced {written} of {dst_height} rows"
			)));
		}

		Ok(())
	}

	/// Scales `frame` to a thumbnail bounded by `thumb_size`, in packed RGBA.
	pub(crate) fn thumbnail(&mut self, frame: &FFmpegFrame, thumb_size: u32) -> Result<Thumb> {
		let (width, height) = thumb_dimensions(frame.width(), frame.height(), thumb_size);

		let mut data = Vec::new();
		self.convert_into(
			frame,
			(width, height),
			AVPixelFormat::AV_PIX_FMT_RGBA,
			RGBA_CHANNELS,
			&mut data,
		)?;

		Ok(Thumb {
			data,
			width,
			height,
		})
	}
}

impl Drop for FFmpegScaler {
	fn drop(&mut self) {
		if !self.ptr.is_null() {
			unsafe { sws_freeContext(self.ptr) };
			self.ptr = ptr::null_mut();
		}
	}
}
