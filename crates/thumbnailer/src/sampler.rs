//! Pulls decoded frames out of a resolved video stream.

use crate::{
	codec_ctx::{DecodeStatus, FFmpegCodecContext},
	consts::MAX_FRAMES,
	error::{Result, ThumbnailerError},
	file_type::Sampling,
	packet::FFmpegPacket,
	resolver::ResolvedStream,
	video_frame::FFmpegFrame,
};

use std::time::Duration;

use tracing::{trace, warn};

/// Frames sampled from one source, in decode order.
pub(crate) struct FrameBatch {
	pub(crate) frames: Vec<FFmpegFrame>,
	pub(crate) duration: Duration,
}

pub(crate) fn sample(
	resolved: &mut ResolvedStream<'_>,
	sampling: Sampling,
	max_frames: usize,
) -> Result<FrameBatch> {
	match sampling {
		Sampling::SingleFrame => Ok(FrameBatch {
			frames: decode_frames(resolved, 1)?,
			duration: Duration::ZERO,
		}),
		Sampling::MultiFrame => {
			let frames = decode_frames(resolved, max_frames)?;
			Ok(FrameBatch {
				frames,
				duration: resolved.format_ctx.duration().unwrap_or_default(),
			})
		}
	}
}

/// Decodes up to `limit` frames. Stops early when the container runs out of packets,
/// so a stream that never ends is still bounded by `limit`.
fn decode_frames(resolved: &mut ResolvedStream<'_>, limit: usize) -> Result<Vec<FFmpegFrame>> {
	let mut frames = Vec::with_capacity(limit.min(MAX_FRAMES));
	let mut packet = FFmpegPacket::new()?;

	while frames.len() < limit {
		packet.reset();
		match resolved.format_ctx.read_frame(&mut packet) {
			Ok(true) => {}
			Ok(false) => break,
			Err(e) if !frames.is_empty() => {
				warn!(%e, sampled = frames.len(), "Container read failed, keeping sampled frames");
				break;
			}
			Err(e) => return Err(e),
		}

		if packet.stream_index() != resolved.stream_index {
			continue;
		}

		if resolved.codec_ctx.send_packet(Some(&packet))? == DecodeStatus::Again {
			// Decoder is full, make room and hand the packet over again
			receive_frames(&mut resolved.codec_ctx, &mut frames, limit)?;
			if frames.len() >= limit {
				break;
			}
			accepted(resolved.codec_ctx.send_packet(Some(&packet))?)?;
		}

		receive_frames(&mut resolved.codec_ctx, &mut frames, limit)?;
	}
	packet.reset();

	if frames.len() < limit {
		// Flush frames held back by decoders with reordering delay
		if resolved.codec_ctx.send_packet(None)? != DecodeStatus::Eof {
			receive_frames(&mut resolved.codec_ctx, &mut frames, limit)?;
		}
	}

	trace!(sampled = frames.len(), limit, "Sampled frames");

	if frames.is_empty() {
		return Err(ThumbnailerError::NoFrames);
	}

	Ok(frames)
}

/// A decoder whose output was just drained must take the packet it refused.
fn accepted(status: DecodeStatus) -> Result<()> {
	match status {
		DecodeStatus::Again => Err(ThumbnailerError::FrameDecode(
			"decoder refused a packet after its output was drained".to_string(),
		)),
		DecodeStatus::Ready | DecodeStatus::Eof => Ok(()),
	}
}

fn receive_frames(
	codec_ctx: &mut FFmpegCodecContext,
	frames: &mut Vec<FFmpegFrame>,
	limit: usize,
) -> Result<()> {
	while frames.len() < limit {
		let mut frame = FFmpegFrame::new()?;
		match codec_ctx.receive_frame(&mut frame)? {
			DecodeStatus::Ready => frames.push(frame),
			DecodeStatus::Again | DecodeStatus::Eof => break,
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{consts::IO_BUFFER_SIZE, resolver::resolve};

	use std::io::Cursor;

	use image::{
		codecs::gif::{GifEncoder, Repeat},
		Delay, Frame, ImageOutputFormat, Rgba, RgbaImage,
	};

	fn animated_gif(frame_count: u8) -> Vec<u8> {
		let mut data = Vec::new();
		{
			let mut encoder = GifEncoder::new(&mut data);
			encoder.set_repeat(Repeat::Infinite).unwrap();
			encoder
				.encode_frames((0..frame_count).map(|i| {
					let pixel = Rgba([i.wrapping_mul(2), 255 - i, i / 2, 255]);
					Frame::from_parts(
						RgbaImage::from_pixel(32, 24, pixel),
						0,
						0,
						Delay::from_numer_denom_ms(40, 1),
					)
				}))
				.unwrap();
		}
		data
	}

	#[test]
	fn resent_packet_must_be_accepted() {
		assert!(accepted(DecodeStatus::Ready).is_ok());
		assert!(matches!(
			accepted(DecodeStatus::Again),
			Err(ThumbnailerError::FrameDecode(_))
		));
	}

	#[test]
	fn multi_frame_sampling_collects_every_frame() {
		let data = animated_gif(5);
		let mut resolved = resolve(&data, IO_BUFFER_SIZE).unwrap();

		let batch = sample(&mut resolved, Sampling::MultiFrame, MAX_FRAMES).unwrap();
		assert_eq!(batch.frames.len(), 5);
		assert!(batch.frames.iter().all(|frame| frame.width() == 32));
	}

	#[test]
	fn multi_frame_sampling_stops_at_the_cap() {
		let data = animated_gif(120);
		let mut resolved = resolve(&data, IO_BUFFER_SIZE).unwrap();

		let batch = sample(&mut resolved, Sampling::MultiFrame, MAX_FRAMES).unwrap();
		assert_eq!(batch.frames.len(), MAX_FRAMES);
	}

	#[test]
	fn single_frame_sampling_reports_no_duration() {
		let mut data = Vec::new();
		RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255]))
			.write_to(&mut Cursor::new(&mut data), ImageOutputFormat::Png)
			.unwrap();
		let mut resolved = resolve(&data, IO_BUFFER_SIZE).unwrap();

		let batch = sample(&mut resolved, Sampling::SingleFrame, MAX_FRAMES).unwrap();
		assert_eq!(batch.frames.len(), 1);
		assert_eq!(batch.duration, Duration::ZERO);
	}
}
