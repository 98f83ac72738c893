use crate::{
	consts::{IO_BUFFER_SIZE, MAX_FRAMES, THUMB_SIZE},
	error::{Result, ThumbnailerError},
	file_type::FileType,
	model::{Source, Thumbnail},
	resolver,
	sampler::{self, FrameBatch},
	scaler::FFmpegScaler,
	selector,
};

use std::{
	any::Any,
	ffi::c_int,
	panic::{self, AssertUnwindSafe},
};

use tracing::{debug, instrument, trace};

/// Generates a thumbnail with the default configuration.
///
/// Stateless from the caller's point of view and safe to call from many threads at once.
pub fn thumbnail_file(src: &[u8], file_type: FileType) -> Result<Thumbnail> {
	Thumbnailer::default().process(src, file_type)
}

/// `Thumbnailer` holds the configuration of a `ThumbnailerBuilder` and runs one
/// independent session per processed buffer.
#[derive(Debug, Clone, Default)]
pub struct Thumbnailer {
	builder: ThumbnailerBuilder,
}

impl Thumbnailer {
	/// Decodes `src` as a file of `file_type` and returns an RGBA thumbnail of its most
	/// representative frame.
	///
	/// Every native resource of the session is released before returning, on success
	/// and failure alike. Panics inside the session are turned into errors.
	#[instrument(skip(self, src), fields(len = src.len()), err(level = "warn"))]
	pub fn process(&self, src: &[u8], file_type: FileType) -> Result<Thumbnail> {
		if src.is_empty() {
			return Err(ThumbnailerError::EmptyInput);
		}

		let session = Session::new(src, file_type, &self.builder);
		panic::catch_unwind(AssertUnwindSafe(|| session.run()))
			.unwrap_or_else(|payload| Err(ThumbnailerError::Panicked(panic_message(&*payload))))
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	payload
		.downcast_ref::<&str>()
		.map(|msg| (*msg).to_string())
		.or_else(|| payload.downcast_ref::<String>().cloned())
		.unwrap_or_else(|| "unknown panic payload".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
	Created,
	Resolving,
	Sampling,
	Selecting,
	Scaling,
	Done,
}

/// One thumbnailing call. Owns every demuxer, decoder, frame and scaler it creates,
/// all of which are released when `run` returns.
struct Session<'a> {
	src: &'a [u8],
	file_type: FileType,
	config: &'a ThumbnailerBuilder,
	state: SessionState,
}

impl<'a> Session<'a> {
	const fn new(src: &'a [u8], file_type: FileType, config: &'a ThumbnailerBuilder) -> Self {
		Self {
			src,
			file_type,
			config,
			state: SessionState::Created,
		}
	}

	fn transition(&mut self, next: SessionState) {
		trace!(from = ?self.state, to = ?next, "Session transition");
		self.state = next;
	}

	fn run(mut self) -> Result<Thumbnail> {
		let res = self.decode();
		self.transition(SessionState::Done);
		res
	}

	fn decode(&mut self) -> Result<Thumbnail> {
		self.transition(SessionState::Resolving);
		let mut resolved = resolver::resolve(self.src, self.config.io_buffer_size)?;

		self.transition(SessionState::Sampling);
		let FrameBatch { frames, duration } = sampler::sample(
			&mut resolved,
			self.file_type.sampling(),
			self.config.max_frames,
		)?;
		// Decoded frames keep their own references to pixel data
		drop(resolved);

		let mut scaler = FFmpegScaler::new();
		let best = if frames.len() > 1 {
			self.transition(SessionState::Selecting);
			let histograms = selector::frame_histograms(&frames, &mut scaler)?;
			selector::select_best_frame(&histograms).unwrap_or_default()
		} else {
			0
		};
		debug!(best, sampled = frames.len(), "Selected frame");

		// Every frame but the chosen one is released here
		let sampled = frames.len();
		let frame = frames
			.into_iter()
			.nth(best)
			.ok_or_else(|| {
				ThumbnailerError::FrameDecode(format!("selected frame {best} out of {sampled}"))
			})?;

		self.transition(SessionState::Scaling);
		let thumb = scaler.thumbnail(&frame, self.config.thumb_size)?;
		let source = Source {
			width: frame.width(),
			height: frame.height(),
			duration,
		};
		debug!(
			source_width = source.width,
			source_height = source.height,
			thumb_width = thumb.width,
			thumb_height = thumb.height,
			"Generated thumbnail"
		);

		Ok(Thumbnail { source, thumb })
	}
}

/// `ThumbnailerBuilder` holds data to build a `Thumbnailer`, exposing methods to
/// configure how a thumbnail must be generated.
#[derive(Debug, Clone)]
pub struct ThumbnailerBuilder {
	thumb_size: u32,
	max_frames: usize,
	io_buffer_size: usize,
}

impl Default for ThumbnailerBuilder {
	fn default() -> Self {
		Self {
			thumb_size: THUMB_SIZE,
			max_frames: MAX_FRAMES,
			io_buffer_size: IO_BUFFER_SIZE,
		}
	}
}

impl ThumbnailerBuilder {
	/// Creates a new `ThumbnailerBuilder` with default values:
	/// - `thumb_size`: 150 pixels
	/// - `max_frames`: 100
	/// - `io_buffer_size`: 4 KiB
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Length of the longer side of generated thumbnails, must be above zero
	pub fn thumb_size(mut self, thumb_size: u32) -> Result<Self> {
		if thumb_size == 0 || c_int::try_from(thumb_size).is_err() {
			return Err(ThumbnailerError::InvalidThumbSize(thumb_size));
		}
		self.thumb_size = thumb_size;
		Ok(self)
	}

	/// Maximum amount of frames sampled from animated and video sources, between 1 and
	/// [`MAX_FRAMES`]
	pub fn max_frames(mut self, max_frames: usize) -> Result<Self> {
		if !(1..=MAX_FRAMES).contains(&max_frames) {
			return Err(ThumbnailerError::InvalidMaxFrames(max_frames));
		}
		self.max_frames = max_frames;
		Ok(self)
	}

	/// Size of the buffer FFmpeg reads the source through
	pub fn io_buffer_size(mut self, io_buffer_size: usize) -> Result<Self> {
		if io_buffer_size == 0 || c_int::try_from(io_buffer_size).is_err() {
			return Err(ThumbnailerError::InvalidIoBufferSize(io_buffer_size));
		}
		self.io_buffer_size = io_buffer_size;
		Ok(self)
	}

	/// Builds a `Thumbnailer` struct
	#[must_use]
	pub fn build(self) -> Thumbnailer {
		Thumbnailer { builder: self }
	}
}
