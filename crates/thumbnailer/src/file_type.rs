use crate::error::ThumbnailerError;

use std::{fmt, str::FromStr};

/// File types a caller may declare for its buffer.
///
/// The declared type picks the sampling strategy, it is never sniffed from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
	Jpeg,
	Png,
	Gif,
	Webp,
	Webm,
	Mp4,
}

/// How many frames are pulled out of a source before picking the thumbnail frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
	/// Decode only the first emitted frame.
	SingleFrame,
	/// Decode frames until the container is exhausted or the frame cap is reached.
	MultiFrame,
}

impl FileType {
	pub const ALL: [Self; 6] = [
		Self::Jpeg,
		Self::Png,
		Self::Gif,
		Self::Webp,
		Self::Webm,
		Self::Mp4,
	];

	#[must_use]
	pub const fn sampling(self) -> Sampling {
		match self {
			Self::Jpeg | Self::Png | Self::Webp => Sampling::SingleFrame,
			Self::Gif | Self::Webm | Self::Mp4 => Sampling::MultiFrame,
		}
	}

	#[must_use]
	pub const fn extension(self) -> &'static str {
		match self {
			Self::Jpeg => "jpg",
			Self::Png => "png",
			Self::Gif => "gif",
			Self::Webp => "webp",
			Self::Webm => "webm",
			Self::Mp4 => "mp4",
		}
	}

	#[must_use]
	pub const fn mime(self) -> &'static str {
		match self {
			Self::Jpeg => "image/jpeg",
			Self::Png => "image/png",
			Self::Gif => "image/gif",
			Self::Webp => "image/webp",
			Self::Webm => "video/webm",
			Self::Mp4 => "video/mp4",
		}
	}

	pub fn from_mime(mime: &str) -> Result<Self, ThumbnailerError> {
		let essence = mime.split(';').next().unwrap_or_default().trim();
		Self::ALL
			.into_iter()
			.find(|file_type| file_type.mime().eq_ignore_ascii_case(essence))
			.ok_or_else(|| ThumbnailerError::UnknownFileType(mime.to_string()))
	}
}

impl FromStr for FileType {
	type Err = ThumbnailerError;

	/// Parses a file extension, with or without the leading dot.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim_start_matches('.').to_ascii_lowercase().as_str() {
			"jpg" | "jpeg" => Ok(Self::Jpeg),
			"png" => Ok(Self::Png),
			"gif" => Ok(Self::Gif),
			"webp" => Ok(Self::Webp),
			"webm" => Ok(Self::Webm),
			"mp4" => Ok(Self::Mp4),
			_ => Err(ThumbnailerError::UnknownFileType(s.to_string())),
		}
	}
}

impl fmt::Display for FileType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.extension())
	}
}
