//! Presents a caller owned byte buffer to FFmpeg as a readable, seekable file.

use crate::error::{Result, ThumbnailerError};

use std::{
	ffi::{c_int, c_void},
	ptr, slice,
};

use ffmpeg_sys_next::{
	av_free, av_freep, av_malloc, avio_alloc_context, avio_context_free, AVIOContext, AVERROR,
	AVERROR_EOF, AVSEEK_FORCE, AVSEEK_SIZE,
};
use libc::{EINVAL, SEEK_CUR, SEEK_END, SEEK_SET};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Whence {
	Start,
	Current,
	End,
}

impl Whence {
	fn from_raw(whence: c_int) -> Option<Self> {
		match whence {
			SEEK_SET => Some(Self::Start),
			SEEK_CUR => Some(Self::Current),
			SEEK_END => Some(Self::End),
			_ => None,
		}
	}
}

/// A cursor over a borrowed buffer. Never copies the buffer itself.
#[derive(Debug)]
pub(crate) struct MemoryStream<'a> {
	data: &'a [u8],
	pos: i64,
}

impl<'a> MemoryStream<'a> {
	pub(crate) const fn new(data: &'a [u8]) -> Self {
		Self { data, pos: 0 }
	}

	fn len(&self) -> i64 {
		i64::try_from(self.data.len()).unwrap_or(i64::MAX)
	}

	/// Copies the next bytes into `buf`, `None` once the cursor is at or past the end.
	pub(crate) fn read(&mut self, buf: &mut [u8]) -> Option<usize> {
		let start = usize::try_from(self.pos).ok()?;
		let remaining = self.data.get(start..).filter(|rest| !rest.is_empty())?;

		let n = buf.len().min(remaining.len());
		buf[..n].copy_from_slice(&remaining[..n]);
		self.pos += i64::try_from(n).ok()?;

		Some(n)
	}

	/// Moves the cursor and returns its new position.
	///
	/// Seeking past the end is allowed, the following read reports end of file.
	pub(crate) fn seek(&mut self, offset: i64, whence: Whence) -> i64 {
		let base = match whence {
			Whence::Start => 0,
			Whence::Current => self.pos,
			Whence::End => self.len(),
		};
		self.pos = base.saturating_add(offset);
		self.pos
	}
}

unsafe extern "C" fn read_packet(opaque: *mut c_void, buf: *mut u8, buf_size: c_int) -> c_int {
	let Some(stream) = (unsafe { opaque.cast::<MemoryStream<'_>>().as_mut() }) else {
		return AVERROR(EINVAL);
	};
	let Ok(size) = usize::try_from(buf_size) else {
		return AVERROR(EINVAL);
	};
	if buf.is_null() {
		return AVERROR(EINVAL);
	}

	let buf = unsafe { slice::from_raw_parts_mut(buf, size) };
	stream
		.read(buf)
		.and_then(|n| c_int::try_from(n).ok())
		.unwrap_or(AVERROR_EOF)
}

unsafe extern "C" fn seek_packet(opaque: *mut c_void, offset: i64, whence: c_int) -> i64 {
	let Some(stream) = (unsafe { opaque.cast::<MemoryStream<'_>>().as_mut() }) else {
		return i64::from(AVERROR(EINVAL));
	};

	let whence = whence & !AVSEEK_FORCE;
	if whence == AVSEEK_SIZE {
		return stream.len();
	}

	Whence::from_raw(whence).map_or(i64::from(AVERROR(EINVAL)), |whence| {
		stream.seek(offset, whence)
	})
}

/// Owns the `AVIOContext` wired to a [`MemoryStream`], along with its read buffer.
pub(crate) struct FFmpegIoContext<'a> {
	ptr: *mut AVIOContext,
	// Boxed so the opaque pointer handed to FFmpeg stays put when this struct moves
	_stream: Box<MemoryStream<'a>>,
}

impl<'a> FFmpegIoContext<'a> {
	pub(crate) fn new(data: &'a [u8], buffer_size: usize) -> Result<Self> {
		let c_buffer_size = c_int::try_from(buffer_size)
			.map_err(|_| ThumbnailerError::InvalidIoBufferSize(buffer_size))?;

		let mut stream = Box::new(MemoryStream::new(data));

		let buffer = unsafe { av_malloc(buffer_size) }.cast::<u8>();
		if buffer.is_null() {
			return Err(ThumbnailerError::Allocation("I/O read buffer"));
		}

		let ptr = unsafe {
			avio_alloc_context(
				buffer,
				c_buffer_size,
				0,
				ptr::addr_of_mut!(*stream).cast::<c_void>(),
				Some(read_packet),
				None,
				Some(seek_packet),
			)
		};
		if ptr.is_null() {
			unsafe { av_free(buffer.cast::<c_void>()) };
			return Err(ThumbnailerError::Allocation("I/O context"));
		}

		Ok(Self {
			ptr,
			_stream: stream,
		})
	}

	pub(crate) fn as_mut_ptr(&mut self) -> *mut AVIOContext {
		self.ptr
	}
}

impl Drop for FFmpegIoContext<'_> {
	fn drop(&mut self) {
		if !self.ptr.is_null() {
			// FFmpeg may have swapped the buffer we gave it, so free whatever it holds now
			unsafe {
				av_freep(ptr::addr_of_mut!((*self.ptr).buffer).cast::<c_void>());
				avio_context_free(&mut self.ptr);
			}
			self.ptr = ptr::null_mut();
		}
	}
}
