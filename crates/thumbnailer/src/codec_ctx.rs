use crate::{
	error::{check_error, FfmpegError, Result, ThumbnailerError},
	packet::FFmpegPacket,
	video_frame::FFmpegFrame,
};

use std::{
	ffi::{c_int, CStr},
	ptr,
};

use ffmpeg_sys_next::{
	avcodec_alloc_context3, avcodec_free_context, avcodec_get_name, avcodec_open2,
	avcodec_parameters_to_context, avcodec_receive_frame, avcodec_send_packet, AVCodec,
	AVCodecContext, AVCodecID, AVCodecParameters, AVERROR, AVERROR_EOF,
};
use libc::EAGAIN;

/// Outcome of one exchange with the decoder that is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodeStatus {
	/// The packet was accepted or a frame was produced.
	Ready,
	/// The decoder needs more input before it can produce output, or is full.
	Again,
	/// The decoder has been fully drained.
	Eof,
}

fn decode_status(ret: c_int, error_message: &str) -> Result<DecodeStatus> {
	match ret {
		AVERROR_EOF => Ok(DecodeStatus::Eof),
		ret if ret == AVERROR(EAGAIN) => Ok(DecodeStatus::Again),
		ret if ret < 0 => Err(ThumbnailerError::FrameDecode(format!(
			"{error_message}: {}",
			FfmpegError::from(ret)
		))),
		_ => Ok(DecodeStatus::Ready),
	}
}

pub(crate) struct FFmpegCodecContext {
	ptr: *mut AVCodecContext,
}

impl FFmpegCodecContext {
	pub(crate) fn new(codec: &AVCodec) -> Result<Self> {
		let ptr = unsafe { avcodec_alloc_context3(codec) };
		if ptr.is_null() {
			return Err(ThumbnailerError::Allocation("codec context"));
		}

		Ok(Self { ptr })
	}

	pub(crate) fn parameters_to_context(
		&mut self,
		codec_params: &AVCodecParameters,
	) -> Result<&mut Self> {
		check_error(
			unsafe { avcodec_parameters_to_context(self.ptr, codec_params) },
			"Fail to fill the codec context with codec parameters",
		)?;

		Ok(self)
	}

	/// Not thread safe on FFmpeg's side, callers must hold the process wide codec lock.
	pub(crate) fn open2(&mut self, codec: &AVCodec) -> Result<&mut Self> {
		check_error(
			unsafe { avcodec_open2(self.ptr, codec, ptr::null_mut()) },
			"Failed to open video codec",
		)?;

		Ok(self)
	}

	/// Feeds a packet to the decoder, `None` enters draining mode.
	pub(crate) fn send_packet(&mut self, packet: Option<&FFmpegPacket>) -> Result<DecodeStatus> {
		let packet = packet.map_or(ptr::null(), |packet| ptr::from_ref(packet.as_ref()));

		decode_status(
			unsafe { avcodec_send_packet(self.ptr, packet) },
			"Failed to send packet to decoder",
		)
	}

	pub(crate) fn receive_frame(&mut self, frame: &mut FFmpegFrame) -> Result<DecodeStatus> {
		decode_status(
			unsafe { avcodec_receive_frame(self.ptr, frame.as_mut_ptr()) },
			"Failed to receive frame from decoder",
		)
	}
}

impl Drop for FFmpegCodecContext {
	fn drop(&mut self) {
		if !self.ptr.is_null() {
			unsafe { avcodec_free_context(&mut self.ptr) };
			self.ptr = ptr::null_mut();
		}
	}
}

pub(crate) fn codec_name(codec_id: AVCodecID) -> String {
	unsafe { avcodec_get_name(codec_id).as_ref() }.map_or_else(
		|| format!("{codec_id:?}"),
		|name| {
			unsafe { CStr::from_ptr(name) }
				.to_string_lossy()
				.into_owned()
		},
	)
}
