//! Picks the most representative frame of a batch by comparing color histograms.
//!
//! Every frame is scored by the squared distance between its histogram and the batch
//! average. Outliers such as fades to black, title cards or letterboxing score high and
//! lose to frames that look like the rest of the source.

use crate::{
	consts::{HISTOGRAM_CHANNELS, LEVELS},
	error::Result,
	scaler::FFmpegScaler,
	video_frame::FFmpegFrame,
};

use ffmpeg_sys_next::AVPixelFormat;

pub const HISTOGRAM_LEN: usize = HISTOGRAM_CHANNELS * LEVELS;

/// Per channel intensity counts of one frame: red, then green, then blue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram([u32; HISTOGRAM_LEN]);

impl Default for Histogram {
	fn default() -> Self {
		Self([0; HISTOGRAM_LEN])
	}
}

impl Histogram {
	/// Counts packed RGB24 pixels. A trailing partial pixel is ignored.
	#[must_use]
	pub fn from_rgb(pixels: &[u8]) -> Self {
		let mut histogram = Self::default();
		for pixel in pixels.chunks_exact(HISTOGRAM_CHANNELS) {
			for (channel, &value) in pixel.iter().enumerate() {
				let bucket = &mut histogram.0[channel * LEVELS + usize::from(value)];
				*bucket = bucket.saturating_add(1);
			}
		}
		histogram
	}

	#[must_use]
	pub fn counts(&self) -> &[u32] {
		&self.0
	}

	fn squared_error(&self, average: &[f64]) -> f64 {
		self.0
			.iter()
			.zip(average)
			.map(|(&count, &mean)| {
				let diff = f64::from(count) - mean;
				diff * diff
			})
			.sum()
	}
}

/// Index of the histogram closest to the element wise average of all of them.
///
/// Ties go to the earliest index. `None` only for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn select_best_frame(histograms: &[Histogram]) -> Option<usize> {
	if histograms.is_empty() {
		return None;
	}

	let mut sums = vec![0_u64; HISTOGRAM_LEN];
	for histogram in histograms {
		for (sum, &count) in sums.iter_mut().zip(histogram.counts()) {
			*sum += u64::from(count);
		}
	}

	let frame_count = histograms.len() as f64;
	let average = sums
		.into_iter()
		.map(|sum| sum as f64 / frame_count)
		.collect::<Vec<_>>();

	let mut best: Option<(usize, f64)> = None;
	for (index, histogram) in histograms.iter().enumerate() {
		let score = histogram.squared_error(&average);
		if best.map_or(true, |(_, best_score)| score < best_score) {
			best = Some((index, score));
		}
	}

	best.map(|(index, _)| index)
}

/// Histograms of every frame, computed on an RGB24 conversion at native size.
pub(crate) fn frame_histograms(
	frames: &[FFmpegFrame],
	scaler: &mut FFmpegScaler,
) -> Result<Vec<Histogram>> {
	let mut pixels = Vec::new();

	frames
		.iter()
		.map(|frame| {
			scaler.convert_into(
				frame,
				(frame.width(), frame.height()),
				AVPixelFormat::AV_PIX_FMT_RGB24,
				HISTOGRAM_CHANNELS,
				&mut pixels,
			)?;
			Ok(Histogram::from_rgb(&pixels))
		})
		.collect()
}
