use crate::consts::MAX_FRAMES;

use std::ffi::{c_int, CStr};

use thiserror::Error;

use ffmpeg_sys_next::{
	av_strerror, AVERROR_BUFFER_TOO_SMALL, AVERROR_BUG, AVERROR_BUG2, AVERROR_DECODER_NOT_FOUND,
	AVERROR_DEMUXER_NOT_FOUND, AVERROR_EOF, AVERROR_EXIT, AVERROR_EXPERIMENTAL, AVERROR_EXTERNAL,
	AVERROR_INPUT_CHANGED, AVERROR_INVALIDDATA, AVERROR_OUTPUT_CHANGED, AVERROR_PATCHWELCOME,
	AVERROR_STREAM_NOT_FOUND, AVERROR_UNKNOWN,
};

pub type Result<T> = std::result::Result<T, ThumbnailerError>;

/// Error type for the library.
#[derive(Error, Debug)]
pub enum ThumbnailerError {
	#[error("unimplemented: {0}")]
	Unimplemented(String),
	#[error("Unknown file type: {0}")]
	UnknownFileType(String),
	#[error("Empty input buffer")]
	EmptyInput,
	#[error("FFmpeg internal error: {0}; Reason: {1}")]
	FfmpegWithReason(FfmpegError, String),
	#[error("No video stream found in container")]
	NoVideoStream,
	#[error("No decoder available for codec: {0}")]
	DecoderNotFound(String),
	#[error("Failed to decode frame: {0}")]
	FrameDecode(String),
	#[error("Container yielded no decodable frames")]
	NoFrames,
	#[error("Allocation failed: {0}")]
	Allocation(&'static str),
	#[error("Received an invalid thumbnail size: {0}")]
	InvalidThumbSize(u32),
	#[error("Received an invalid frame cap, expected 1 to {}, received: {0}", MAX_FRAMES)]
	InvalidMaxFrames(usize),
	#[error("Received an invalid I/O buffer size: {0}")]
	InvalidIoBufferSize(usize),
	#[error("Thumbnailing panicked: {0}")]
	Panicked(String),
}

/// Errors reported by FFmpeg itself, translated from its `AVERROR` codes.
///
/// Extracted from https://ffmpeg.org/doxygen/trunk/group__lavu__error.html
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FfmpegError {
	#[error("Internal bug, also see AVERROR_BUG2")]
	InternalBug,
	#[error("Buffer too small")]
	BufferTooSmall,
	#[error("Decoder not found")]
	DecoderNotFound,
	#[error("Demuxer not found")]
	DemuxerNotFound,
	#[error("End of file")]
	Eof,
	#[error("Immediate exit was requested; the called function should not be restarted")]
	Exit,
	#[error("Generic error in an external library")]
	External,
	#[error("Invalid data found when processing input")]
	InvalidData,
	#[error("Not yet implemented in FFmpeg, patches welcome")]
	NotImplemented,
	#[error("Stream not found")]
	StreamNotFound,
	#[error("Internal bug")]
	InternalBug2,
	#[error("Unknown error, typically from an external library")]
	Unknown,
	#[error("Requested feature is flagged experimental")]
	Experimental,
	#[error("Input changed between calls, reconfiguration is required")]
	InputChanged,
	#[error("Output changed between calls, reconfiguration is required")]
	OutputChanged,
	#[error("{message} (code {code})")]
	Other { code: c_int, message: String },
}

impl From<c_int> for FfmpegError {
	fn from(code: c_int) -> Self {
		match code {
			AVERROR_BUG => Self::InternalBug,
			AVERROR_BUFFER_TOO_SMALL => Self::BufferTooSmall,
			AVERROR_DECODER_NOT_FOUND => Self::DecoderNotFound,
			AVERROR_DEMUXER_NOT_FOUND => Self::DemuxerNotFound,
			AVERROR_EOF => Self::Eof,
			AVERROR_EXIT => Self::Exit,
			AVERROR_EXTERNAL => Self::External,
			AVERROR_INVALIDDATA => Self::InvalidData,
			AVERROR_PATCHWELCOME => Self::NotImplemented,
			AVERROR_STREAM_NOT_FOUND => Self::StreamNotFound,
			AVERROR_BUG2 => Self::InternalBug2,
			AVERROR_UNKNOWN => Self::Unknown,
			AVERROR_EXPERIMENTAL => Self::Experimental,
			AVERROR_INPUT_CHANGED => Self::InputChanged,
			AVERROR_OUTPUT_CHANGED => Self::OutputChanged,
			other => Self::Other {
				code: other,
				message: describe(other),
			},
		}
	}
}

/// Asks FFmpeg for the human readable text of an error code.
fn describe(code: c_int) -> String {
	let mut buf = [0 as libc::c_char; 256];
	if unsafe { av_strerror(code, buf.as_mut_ptr(), buf.len()) } < 0 {
		return format!("Unrecognized FFmpeg error {code}");
	}

	unsafe { CStr::from_ptr(buf.as_ptr()) }
		.to_string_lossy()
		.into_owned()
}

pub(crate) fn check_error(return_code: c_int, error_message: &str) -> Result<c_int> {
	if return_code < 0 {
		Err(ThumbnailerError::FfmpegWithReason(
			FfmpegError::from(return_code),
			error_message.to_string(),
		))
	} else {
		Ok(return_code)
	}
}
