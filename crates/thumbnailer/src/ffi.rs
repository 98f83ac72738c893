//! C ABI for hosts that cannot consume Rust types. Nothing unwinds across it.

use crate::{error::ThumbnailerError, file_type::FileType, model::Thumbnail};

use std::{
	ffi::{c_char, c_int, c_ulong, CString},
	panic::{self, AssertUnwindSafe},
	ptr, slice,
};

use tracing::error;

/// Raw bytes passed over FFI.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Buffer {
	pub data: *mut u8,
	pub size: usize,
}

impl Buffer {
	const fn empty() -> Self {
		Self {
			data: ptr::null_mut(),
			size: 0,
		}
	}
}

/// An RGBA image, owned by the caller once returned.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Image {
	pub buf: Buffer,
	pub width: c_ulong,
	pub height: c_ulong,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Source {
	pub width: c_ulong,
	pub height: c_ulong,
	/// Milliseconds
	pub duration: u64,
}

/// `error` is null on success. On failure it is set and the other fields are zeroed.
#[repr(C)]
#[derive(Debug)]
pub struct ThumbResult {
	pub src: Source,
	pub thumb: Image,
	pub error: *mut c_char,
}

impl ThumbResult {
	fn success(thumbnail: Thumbnail) -> Self {
		let Thumbnail { source, thumb } = thumbnail;

		let data = thumb.data.into_boxed_slice();
		let size = data.len();

		Self {
			src: Source {
				width: c_ulong::from(source.width),
				height: c_ulong::from(source.height),
				duration: u64::try_from(source.duration.as_millis()).unwrap_or(u64::MAX),
			},
			thumb: Image {
				buf: Buffer {
					data: Box::into_raw(data).cast::<u8>(),
					size,
				},
				width: c_ulong::from(thumb.width),
				height: c_ulong::from(thumb.height),
			},
			error: ptr::null_mut(),
		}
	}

	fn failure(message: &str) -> Self {
		let error = CString::new(message.replace('\0', " "))
			.unwrap_or_else(|_| CString::from(c"thumbnailing failed"));

		Self {
			src: Source {
				width: 0,
				height: 0,
				duration: 0,
			},
			thumb: Image {
				buf: Buffer::empty(),
				width: 0,
				height: 0,
			},
			error: error.into_raw(),
		}
	}
}

fn file_type_from_raw(raw: c_int) -> Option<FileType> {
	usize::try_from(raw)
		.ok()
		.and_then(|index| FileType::ALL.get(index).copied())
}

/// Generate a thumbnail from a file already read into memory.
///
/// `file_type` follows the order of [`FileType::ALL`]: JPEG, PNG, GIF, WEBP, WEBM, MP4.
/// The result must be released with [`thumbnail_result_free`].
///
/// # Safety
///
/// `src.data` must point to `src.size` readable bytes that stay valid and unmodified
/// for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn thumbnail_file(src: Buffer, file_type: c_int) -> ThumbResult {
	let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
		let file_type = file_type_from_raw(file_type)
			.ok_or_else(|| ThumbnailerError::UnknownFileType(file_type.to_string()))?;

		let data = if src.data.is_null() || src.size == 0 {
			&[][..]
		} else {
			unsafe { slice::from_raw_parts(src.data.cast_const(), src.size) }
		};

		crate::thumbnail_file(data, file_type)
	}));

	match outcome {
		Ok(Ok(thumbnail)) => ThumbResult::success(thumbnail),
		Ok(Err(e)) => ThumbResult::failure(&e.to_string()),
		Err(_) => {
			error!("Thumbnailing panicked across the FFI boundary");
			ThumbResult::failure("thumbnailing panicked")
		}
	}
}

/// Releases the thumbnail buffer and error string of a result. Safe to call twice.
///
/// # Safety
///
/// `result` must be null or point to a `ThumbResult` returned by [`thumbnail_file`].
#[no_mangle]
pub unsafe extern "C" fn thumbnail_result_free(result: *mut ThumbResult) {
	let Some(result) = (unsafe { result.as_mut() }) else {
		return;
	};

	let buf = &mut result.thumb.buf;
	if !buf.data.is_null() {
		drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(buf.data, buf.size)) });
		*buf = Buffer::empty();
	}

	if !result.error.is_null() {
		drop(unsafe { CString::from_raw(result.error) });
		result.error = ptr::null_mut();
	}
}
