//! Opens a buffer as a container and resolves the decoder for its best video stream.

use crate::{
	codec_ctx::{codec_name, FFmpegCodecContext},
	error::{Result, ThumbnailerError},
	format_ctx::FFmpegFormatContext,
	io_ctx::FFmpegIoContext,
};

use std::{
	ffi::CStr,
	sync::{Mutex, MutexGuard, Once, PoisonError},
};

use ffmpeg_sys_next::{
	av_log_set_level, avcodec_find_decoder, avcodec_find_decoder_by_name, AVCodec, AVCodecID,
	AVCodecParameters, AVStream, AV_LOG_ERROR,
};
use tracing::{debug, trace};

/// Serializes FFmpeg routines that touch its global codec state: stream probing and
/// codec opening. Shared by every session in the process.
static CODEC_LOCK: Mutex<()> = Mutex::new(());

static INIT: Once = Once::new();

/// Codecs routed to a specific decoder instead of FFmpeg's default one.
///
/// The native VP8/VP9 decoders drop the alpha channel, libvpx keeps it.
const DECODER_OVERRIDES: [(AVCodecID, &CStr); 2] = [
	(AVCodecID::AV_CODEC_ID_VP8, c"libvpx"),
	(AVCodecID::AV_CODEC_ID_VP9, c"libvpx-vp9"),
];

/// Codecs we know how to thumbnail.
const SUPPORTED_CODECS: [AVCodecID; 11] = [
	AVCodecID::AV_CODEC_ID_MJPEG,
	AVCodecID::AV_CODEC_ID_PNG,
	AVCodecID::AV_CODEC_ID_APNG,
	AVCodecID::AV_CODEC_ID_WEBP,
	AVCodecID::AV_CODEC_ID_GIF,
	AVCodecID::AV_CODEC_ID_VP8,
	AVCodecID::AV_CODEC_ID_VP9,
	AVCodecID::AV_CODEC_ID_H264,
	AVCodecID::AV_CODEC_ID_HEVC,
	AVCodecID::AV_CODEC_ID_AV1,
	AVCodecID::AV_CODEC_ID_MPEG4,
];

/// Runs FFmpeg's one time process setup. Cheap after the first call.
pub(crate) fn init() {
	INIT.call_once(|| {
		unsafe { av_log_set_level(AV_LOG_ERROR) };
		debug!("FFmpeg initialized");
	});
}

fn codec_lock() -> MutexGuard<'static, ()> {
	// The guarded state lives inside FFmpeg, a panicking holder cannot corrupt it
	CODEC_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn decoder_override(codec_id: AVCodecID) -> Option<&'static CStr> {
	DECODER_OVERRIDES
		.iter()
		.find(|(id, _)| *id == codec_id)
		.map(|(_, name)| *name)
}

pub(crate) fn is_supported(codec_id: AVCodecID) -> bool {
	SUPPORTED_CODECS.contains(&codec_id)
}

/// Overridden codecs are looked up by decoder name first, everything else by id.
fn find_decoder(codec_id: AVCodecID) -> Option<&'static AVCodec> {
	decoder_override(codec_id)
		.and_then(|name| {
			let codec = unsafe { avcodec_find_decoder_by_name(name.as_ptr()).as_ref() };
			if codec.is_none() {
				debug!(?name, "Preferred decoder unavailable, using the default one");
			}
			codec
		})
		.or_else(|| unsafe { avcodec_find_decoder(codec_id).as_ref() })
}

/// A stream the demuxer could not describe has nothing to decode.
fn codec_parameters(stream: &AVStream) -> Result<&AVCodecParameters> {
	unsafe { stream.codecpar.as_ref() }.ok_or(ThumbnailerError::NoVideoStream)
}

/// A demuxer and an opened decoder for its chosen video stream.
pub(crate) struct ResolvedStream<'a> {
	// Drop order: the decoder goes before the demuxer it reads from
	pub(crate) codec_ctx: FFmpegCodecContext,
	pub(crate) format_ctx: FFmpegFormatContext<'a>,
	pub(crate) stream_index: i32,
}

pub(crate) fn resolve(data: &[u8], io_buffer_size: usize) -> Result<ResolvedStream<'_>> {
	init();

	let io = FFmpegIoContext::new(data, io_buffer_size)?;
	let mut format_ctx = FFmpegFormatContext::open_memory(io)?;
	trace!(format = ?format_ctx.format_name(), "Opened container");

	{
		let _guard = codec_lock();
		format_ctx.find_stream_info()?;
	}

	let stream = format_ctx.best_video_stream()?;
	let stream_index = stream.index;
	let codec_params = codec_parameters(stream)?;
	let codec_id = codec_params.codec_id;

	if !is_supported(codec_id) {
		return Err(ThumbnailerError::Unimplemented(format!(
			"no thumbnailing path for codec {}",
			codec_name(codec_id)
		)));
	}

	let codec = find_decoder(codec_id)
		.ok_or_else(|| ThumbnailerError::DecoderNotFound(codec_name(codec_id)))?;

	let mut codec_ctx = FFmpegCodecContext::new(codec)?;
	codec_ctx.parameters_to_context(codec_params)?;

	{
		let _guard = codec_lock();
		codec_ctx.open2(codec)?;
	}

	debug!(
		stream_index,
		codec = codec_name(codec_id),
		"Resolved video stream"
	);

	Ok(ResolvedStream {
		codec_ctx,
		format_ctx,
		stream_index,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn vp8_and_vp9_prefer_libvpx() {
		assert_eq!(decoder_override(AVCodecID::AV_CODEC_ID_VP8), Some(c"libvpx"));
		assert_eq!(
			decoder_override(AVCodecID::AV_CODEC_ID_VP9),
			Some(c"libvpx-vp9")
		);
		assert_eq!(decoder_override(AVCodecID::AV_CODEC_ID_H264), None);
	}

	#[test]
	fn overridden_codecs_still_resolve_a_decoder() {
		// Falls back to the native decoder when FFmpeg was built without libvpx
		assert!(find_decoder(AVCodecID::AV_CODEC_ID_VP8).is_some());
		assert!(find_decoder(AVCodecID::AV_CODEC_ID_PNG).is_some());
	}

	#[test]
	fn only_known_codecs_are_supported() {
		assert!(is_supported(AVCodecID::AV_CODEC_ID_GIF));
		assert!(!is_supported(AVCodecID::AV_CODEC_ID_BMP));
	}

	#[test]
	fn stream_without_codec_parameters_has_no_video() {
		let stream: AVStream = unsafe { std::mem::zeroed() };
		assert!(matches!(
			codec_parameters(&stream),
			Err(ThumbnailerError::NoVideoStream)
		));
	}

	#[test]
	fn garbage_is_rejected_while_opening() {
		let data = [0x42_u8; 128];
		assert!(resolve(&data, 4096).is_err());
	}
}
