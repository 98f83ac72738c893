use crate::{
	error::{check_error, FfmpegError, Result, ThumbnailerError},
	io_ctx::FFmpegIoContext,
	packet::FFmpegPacket,
};

use std::{ffi::CStr, ptr, time::Duration};

use ffmpeg_sys_next::{
	av_find_best_stream, av_read_frame, avformat_alloc_context, avformat_close_input,
	avformat_find_stream_info, avformat_open_input, AVFormatContext, AVMediaType, AVStream,
	AVERROR_EOF, AVERROR_STREAM_NOT_FOUND, AVFMT_FLAG_CUSTOM_IO, AV_NOPTS_VALUE,
};

/// An opened demuxer reading from an in-memory buffer.
///
/// The I/O context is declared after the format context pointer and is only released
/// once `avformat_close_input` ran in `Drop`.
pub(crate) struct FFmpegFormatContext<'a> {
	data: *mut AVFormatContext,
	_io: FFmpegIoContext<'a>,
}

impl<'a> FFmpegFormatContext<'a> {
	pub(crate) fn open_memory(mut io: FFmpegIoContext<'a>) -> Result<Self> {
		let mut data = unsafe { avformat_alloc_context() };
		if data.is_null() {
			return Err(ThumbnailerError::Allocation("format context"));
		}

		unsafe {
			(*data).pb = io.as_mut_ptr();
			(*data).flags |= AVFMT_FLAG_CUSTOM_IO;
		}

		// On failure FFmpeg frees the context itself and nulls our pointer
		check_error(
			unsafe { avformat_open_input(&mut data, ptr::null(), ptr::null(), ptr::null_mut()) },
			"Fail to open an input stream and read the header",
		)?;

		if data.is_null() {
			return Err(ThumbnailerError::Allocation("format context"));
		}

		Ok(Self { data, _io: io })
	}

	pub(crate) fn as_ref(&self) -> &AVFormatContext {
		unsafe { &*self.data }
	}

	/// Reads packets to fill in stream metadata. Opens codecs internally, so callers
	/// must hold the process wide codec lock.
	pub(crate) fn find_stream_info(&mut self) -> Result<()> {
		check_error(
			unsafe { avformat_find_stream_info(self.data, ptr::null_mut()) },
			"Fail to read packets of a media file to get stream information",
		)?;

		Ok(())
	}

	/// The video stream FFmpeg itself ranks highest.
	pub(crate) fn best_video_stream(&self) -> Result<&AVStream> {
		let index = unsafe {
			av_find_best_stream(
				self.data,
				AVMediaType::AVMEDIA_TYPE_VIDEO,
				-1,
				-1,
				ptr::null_mut(),
				0,
			)
		};

		match index {
			AVERROR_STREAM_NOT_FOUND => Err(ThumbnailerError::NoVideoStream),
			index if index < 0 => Err(ThumbnailerError::FfmpegWithReason(
				FfmpegError::from(index),
				"Failed to find a video stream".to_string(),
			)),
			index => u32::try_from(index)
				.ok()
				.and_then(|index| self.stream(index))
				.ok_or(ThumbnailerError::NoVideoStream),
		}
	}

	pub(crate) fn stream(&self, index: u32) -> Option<&AVStream> {
		let ctx = self.as_ref();
		if index >= ctx.nb_streams || ctx.streams.is_null() {
			return None;
		}

		unsafe { (*ctx.streams.add(usize::try_from(index).ok()?)).as_ref() }
	}

	/// Container duration, `None` when the container does not report one.
	pub(crate) fn duration(&self) -> Option<Duration> {
		let duration = self.as_ref().duration;
		if duration == AV_NOPTS_VALUE {
			return None;
		}

		u64::try_from(duration).ok().map(Duration::from_micros)
	}

	pub(crate) fn format_name(&self) -> Option<String> {
		let format = unsafe { self.as_ref().iformat.as_ref() }?;
		let name = unsafe { format.name.as_ref() }?;

		Some(
			unsafe { CStr::from_ptr(name) }
				.to_string_lossy()
				.into_owned(),
		)
	}

	/// Reads the next packet of any stream into `packet`.
	///
	/// `Ok(false)` means the container is exhausted.
	pub(crate) fn read_frame(&mut self, packet: &mut FFmpegPacket) -> Result<bool> {
		match unsafe { av_read_frame(self.data, packet.as_mut_ptr()) } {
			AVERROR_EOF => Ok(false),
			ret if ret < 0 => Err(ThumbnailerError::FfmpegWithReason(
				FfmpegError::from(ret),
				"Failed to read packet from container".to_string(),
			)),
			_ => Ok(true),
		}
	}
}

impl Drop for FFmpegFormatContext<'_> {
	fn drop(&mut self) {
		if !self.data.is_null() {
			unsafe { avformat_close_input(&mut self.data) };
			self.data = ptr::null_mut();
		}
	}
}
