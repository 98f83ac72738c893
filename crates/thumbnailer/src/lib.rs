#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	clippy::expect_used,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::dbg_macro
)]
#![allow(
	clippy::missing_errors_doc,
	clippy::module_name_repetitions,
	clippy::missing_safety_doc
)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Fixed size thumbnails for still images, animations and videos held in memory.
//!
//! A call opens the buffer through FFmpeg, samples one frame from still images or up to
//! [`MAX_FRAMES`] from animated sources, picks the frame whose color histogram is closest
//! to the batch average and scales it to packed RGBA with its longer side bound to
//! [`THUMB_SIZE`].

mod codec_ctx;
mod consts;
mod error;
mod file_type;
mod format_ctx;
mod io_ctx;
mod model;
mod packet;
mod resolver;
mod sampler;
mod scaler;
mod selector;
mod thumbnailer;
mod video_frame;

pub mod ffi;

pub use consts::{IO_BUFFER_SIZE, MAX_FRAMES, RGBA_CHANNELS, THUMB_SIZE};
pub use error::{FfmpegError, Result, ThumbnailerError};
pub use file_type::{FileType, Sampling};
pub use model::{Source, Thumb, Thumbnail};
pub use scaler::thumb_dimensions;
pub use selector::{select_best_frame, Histogram, HISTOGRAM_LEN};
pub use thumbnailer::{thumbnail_file, Thumbnailer, ThumbnailerBuilder};
