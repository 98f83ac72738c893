//! Small video containers built in memory. Video is Motion JPEG so frames can come
//! straight from the `image` encoder.

use std::io::Cursor;

use image::{ImageOutputFormat, Rgb, RgbImage};

/// Time between consecutive frames and audio chunks.
pub const FRAME_MS: u32 = 40;

const AUDIO_RATE: u32 = 8000;

pub fn jpeg(image: &RgbImage) -> Vec<u8> {
	let mut data = Vec::new();
	image
		.write_to(&mut Cursor::new(&mut data), ImageOutputFormat::Jpeg(90))
		.unwrap();
	data
}

pub fn textured(width: u32, height: u32, shift: u32) -> RgbImage {
	RgbImage::from_fn(width, height, |x, y| {
		let value = ((x * 3 + y * 5 + shift) % 256) as u8;
		Rgb([value, 255 - value, value / 2 + 64])
	})
}

/// Encoded frames of one video track.
pub struct Clip {
	pub frames: Vec<Vec<u8>>,
	pub width: u32,
	pub height: u32,
}

impl Clip {
	pub fn new(images: impl IntoIterator<Item = RgbImage>) -> Self {
		let images = images.into_iter().collect::<Vec<_>>();
		let (width, height) = images.first().map_or((0, 0), RgbImage::dimensions);

		Self {
			frames: images.iter().map(jpeg).collect(),
			width,
			height,
		}
	}

	pub fn duration_ms(&self) -> u32 {
		FRAME_MS * self.frames.len() as u32
	}
}

#[derive(Default)]
struct Bytes(Vec<u8>);

impl Bytes {
	fn u8(mut self, value: u8) -> Self {
		self.0.push(value);
		self
	}

	fn u16(mut self, value: u16) -> Self {
		self.0.extend_from_slice(&value.to_be_bytes());
		self
	}

	fn u32(mut self, value: u32) -> Self {
		self.0.extend_from_slice(&value.to_be_bytes());
		self
	}

	fn raw(mut self, value: &[u8]) -> Self {
		self.0.extend_from_slice(value);
		self
	}
}

// Matroska

fn element(id: u32, body: &[u8]) -> Vec<u8> {
	let id = id.to_be_bytes();
	let first = id.iter().position(|&b| b != 0).unwrap_or(3);

	// Sizes are always written as 8 byte variable length integers
	Bytes::default()
		.raw(&id[first..])
		.u8(0x01)
		.raw(&(body.len() as u64).to_be_bytes()[1..])
		.raw(body)
		.0
}

fn uint(id: u32, value: u64) -> Vec<u8> {
	element(id, &value.to_be_bytes())
}

fn float(id: u32, value: f64) -> Vec<u8> {
	element(id, &value.to_be_bytes())
}

fn string(id: u32, value: &str) -> Vec<u8> {
	element(id, value.as_bytes())
}

fn simple_block(track: u8, timecode_ms: u32, data: &[u8]) -> Vec<u8> {
	let body = Bytes::default()
		.u8(0x80 | track)
		.u16(timecode_ms as u16)
		.u8(0x80)
		.raw(data)
		.0;
	element(0xA3, &body)
}

/// A Matroska file with a PCM audio track first and, when `clip` is given, a Motion
/// JPEG video track second. Audio and video blocks are interleaved.
pub fn matroska(clip: Option<&Clip>) -> Vec<u8> {
	const AUDIO_TRACK: u8 = 1;
	const VIDEO_TRACK: u8 = 2;

	let chunks = clip.map_or(10, |clip| clip.frames.len()) as u32;
	let duration_ms = chunks * FRAME_MS;
	let audio_chunk = vec![0_u8; (AUDIO_RATE * FRAME_MS / 1000 * 2) as usize];

	let header = element(
		0x1A45_DFA3,
		&[
			uint(0x4286, 1),
			uint(0x42F7, 1),
			uint(0x42F2, 4),
			uint(0x42F3, 8),
			string(0x4282, "matroska"),
			uint(0x4287, 4),
			uint(0x4285, 2),
		]
		.concat(),
	);

	let info = element(
		0x1549_A966,
		&[
			uint(0x2A_D7B1, 1_000_000),
			float(0x4489, f64::from(duration_ms)),
			string(0x4D80, "hydron-thumbnailer tests"),
			string(0x5741, "hydron-thumbnailer tests"),
		]
		.concat(),
	);

	let mut tracks = vec![element(
		0xAE,
		&[
			uint(0xD7, u64::from(AUDIO_TRACK)),
			uint(0x73C5, u64::from(AUDIO_TRACK)),
			uint(0x83, 2),
			uint(0x9C, 0),
			string(0x86, "A_PCM/INT/LIT"),
			element(
				0xE1,
				&[
					float(0xB5, f64::from(AUDIO_RATE)),
					uint(0x9F, 1),
					uint(0x6264, 16),
				]
				.concat(),
			),
		]
		.concat(),
	)];
	if let Some(clip) = clip {
		tracks.push(element(
			0xAE,
			&[
				uint(0xD7, u64::from(VIDEO_TRACK)),
				uint(0x73C5, u64::from(VIDEO_TRACK)),
				uint(0x83, 1),
				uint(0x9C, 0),
				string(0x86, "V_MJPEG"),
				element(
					0xE0,
					&[
						uint(0xB0, u64::from(clip.width)),
						uint(0xBA, u64::from(clip.height)),
					]
					.concat(),
				),
			]
			.concat(),
		));
	}
	let tracks = element(0x1654_AE6B, &tracks.concat());

	let mut blocks = vec![uint(0xE7, 0)];
	for i in 0..chunks {
		let timecode = i * FRAME_MS;
		blocks.push(simple_block(AUDIO_TRACK, timecode, &audio_chunk));
		if let Some(frame) = clip.and_then(|clip| clip.frames.get(i as usize)) {
			blocks.push(simple_block(VIDEO_TRACK, timecode, frame));
		}
	}
	let cluster = element(0x1F43_B675, &blocks.concat());

	let segment = element(0x1853_8067, &[info, tracks, cluster].concat());

	[header, segment].concat()
}

// ISO base media (MP4)

fn mp4_box(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
	Bytes::default()
		.u32((body.len() + 8) as u32)
		.raw(kind)
		.raw(body)
		.0
}

fn full_box(kind: &[u8; 4], version_and_flags: u32, body: &[u8]) -> Vec<u8> {
	mp4_box(kind, &Bytes::default().u32(version_and_flags).raw(body).0)
}

fn unity_matrix(bytes: Bytes) -> Bytes {
	[0x0001_0000, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000]
		.into_iter()
		.fold(bytes, Bytes::u32)
}

/// An MP4 file with a single Motion JPEG video track, samples stored before `moov`.
pub fn mp4(clip: &Clip) -> Vec<u8> {
	let sample_count = clip.frames.len() as u32;
	let duration = clip.duration_ms();

	let ftyp = mp4_box(
		b"ftyp",
		&Bytes::default()
			.raw(b"isom")
			.u32(0x200)
			.raw(b"isom")
			.raw(b"mp41")
			.0,
	);
	let mdat = mp4_box(b"mdat", &clip.frames.concat());

	let mut offsets = Vec::with_capacity(clip.frames.len());
	let mut offset = (ftyp.len() + 8) as u32;
	for frame in &clip.frames {
		offsets.push(offset);
		offset += frame.len() as u32;
	}

	let mvhd = full_box(
		b"mvhd",
		0,
		&unity_matrix(
			Bytes::default()
				.u32(0)
				.u32(0)
				.u32(1000)
				.u32(duration)
				.u32(0x0001_0000)
				.u16(0x0100)
				.raw(&[0; 10]),
		)
		.raw(&[0; 24])
		.u32(2)
		.0,
	);

	let tkhd = full_box(
		b"tkhd",
		0x0000_0003,
		&unity_matrix(
			Bytes::default()
				.u32(0)
				.u32(0)
				.u32(1)
				.u32(0)
				.u32(duration)
				.raw(&[0; 8])
				.u16(0)
				.u16(0)
				.u16(0)
				.u16(0),
		)
		.u32(clip.width << 16)
		.u32(clip.height << 16)
		.0,
	);

	let mdhd = full_box(
		b"mdhd",
		0,
		&Bytes::default()
			.u32(0)
			.u32(0)
			.u32(1000)
			.u32(duration)
			.u16(0x55C4)
			.u16(0)
			.0,
	);
	let hdlr = full_box(
		b"hdlr",
		0,
		&Bytes::default()
			.u32(0)
			.raw(b"vide")
			.raw(&[0; 12])
			.raw(b"VideoHandler\0")
			.0,
	);

	let vmhd = full_box(b"vmhd", 1, &[0; 8]);
	let dinf = mp4_box(
		b"dinf",
		&full_box(
			b"dref",
			0,
			&Bytes::default().u32(1).raw(&full_box(b"url ", 1, &[])).0,
		),
	);

	let sample_entry = mp4_box(
		b"jpeg",
		&Bytes::default()
			.raw(&[0; 6])
			.u16(1)
			.u16(0)
			.u16(0)
			.raw(&[0; 12])
			.u16(clip.width as u16)
			.u16(clip.height as u16)
			.u32(0x0048_0000)
			.u32(0x0048_0000)
			.u32(0)
			.u16(1)
			.raw(&[0; 32])
			.u16(0x0018)
			.u16(0xFFFF)
			.0,
	);
	let stsd = full_box(b"stsd", 0, &Bytes::default().u32(1).raw(&sample_entry).0);
	let stts = full_box(
		b"stts",
		0,
		&Bytes::default().u32(1).u32(sample_count).u32(FRAME_MS).0,
	);
	let stsc = full_box(b"stsc", 0, &Bytes::default().u32(1).u32(1).u32(1).u32(1).0);
	let stsz = full_box(
		b"stsz",
		0,
		&clip
			.frames
			.iter()
			.fold(Bytes::default().u32(0).u32(sample_count), |bytes, frame| {
				bytes.u32(frame.len() as u32)
			})
			.0,
	);
	let stco = full_box(
		b"stco",
		0,
		&offsets
			.into_iter()
			.fold(Bytes::default().u32(sample_count), Bytes::u32)
			.0,
	);

	let stbl = mp4_box(b"stbl", &[stsd, stts, stsc, stsz, stco].concat());
	let minf = mp4_box(b"minf", &[vmhd, dinf, stbl].concat());
	let mdia = mp4_box(b"mdia", &[mdhd, hdlr, minf].concat());
	let trak = mp4_box(b"trak", &[tkhd, mdia].concat());
	let moov = mp4_box(b"moov", &[mvhd, trak].concat());

	[ftyp, mdat, moov].concat()
}
