use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use ffmpeg_next as ffmpeg;
use ffmpeg::{format, media::Type, software::scaling, util::frame};
use anyhow::{self, Context, Result};
use image::{
    codecs::gif::GifDecoder, imageops, AnimationDecoder, DynamicImage, RgbImage,
};

use super::frames::FrameSource;

/// Sequential RGB24 frame reader over the best video stream of a file.
pub struct VideoReader {
    input: format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::decoder::Video,
    scaler: scaling::Context,
    width: u32,
    height: u32,
    frame_rate: f64,
    flushed: bool,
}

impl VideoReader {
    pub fn open<P: AsRef<Path>>(video_path: P) -> Result<Self> {
        let video_path = video_path.as_ref();
        ffmpeg::init()?;

        let input = format::input(&video_path)
            .with_context(|| format!("could not open video file {}", video_path.display()))?;

        let (stream_index, frame_rate, decoder) = {
            let stream = input
                .streams()
                .best(Type::Video)
                .ok_or(ffmpeg::Error::StreamNotFound)
                .with_context(|| format!("no video stream in {}", video_path.display()))?;

            let frame_rate = match f64::from(stream.avg_frame_rate()) {
                rate if rate.is_finite() && rate > 0.0 => rate,
                _ => f64::from(stream.rate()),
            };
            let decode_context =
                ffmpeg::codec::context::Context::from_parameters(stream.parameters())?;
            let decoder = decode_context.decoder().video()?;

            (stream.index(), frame_rate, decoder)
        };

        let scaler = scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            format::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            scaling::Flags::BILINEAR,
        )
        .context("invalid swscontext parameter")?;

        tracing::debug!(
            "opened {} ({}x{} @ {:.3} fps)",
            video_path.display(),
            decoder.width(),
            decoder.height(),
            frame_rate,
        );

        Ok(Self {
            input,
            stream_index,
            width: decoder.width(),
            height: decoder.height(),
            decoder,
            scaler,
            frame_rate,
            flushed: false,
        })
    }

    fn next_packet(&mut self) -> Option<ffmpeg::Packet> {
        let stream_index = self.stream_index;
        self.input
            .packets()
            .find_map(|(stream, packet)| (stream.index() == stream_index).then_some(packet))
    }

    fn to_image(&mut self, decoded: &frame::Video) -> Result<RgbImage> {
        let mut rgb_frame = frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .context("error swscontext run")?;

        // rows of the scaled frame may be padded past width * 3
        let stride = rgb_frame.stride(0);
        let row = self.width as usize * 3;
        let data = rgb_frame.data(0);
        let mut pixels = Vec::with_capacity(row * self.height as usize);
        for y in 0..self.height as usize {
            pixels.extend_from_slice(&data[y * stride..y * stride + row]);
        }

        RgbImage::from_raw(self.width, self.height, pixels)
            .context("decoded frame is smaller than its reported size")
    }
}

impl FrameSource for VideoReader {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        loop {
            let mut decoded = frame::Video::empty();
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.to_image(&decoded).map(Some);
            }
            if self.flushed {
                return Ok(None);
            }

            match self.next_packet() {
                Some(packet) => self.decoder.send_packet(&packet)?,
                None => {
                    self.decoder.send_eof()?;
                    self.flushed = true;
                }
            }
        }
    }
}

/// All frames of an animated GIF, alpha dropped and resized to a fixed size.
#[derive(Debug)]
pub struct GifReader {
    frames: std::vec::IntoIter<RgbImage>,
    width: u32,
    height: u32,
    frame_rate: f64,
}

impl GifReader {
    pub fn open<P: AsRef<Path>>(gif_path: P, target: (u32, u32), fallback_fps: f64) -> Result<Self> {
        let gif_path = gif_path.as_ref();
        let file = File::open(gif_path)
            .with_context(|| format!("could not open gif file {}", gif_path.display()))?;

        Self::from_reader(BufReader::new(file), target, fallback_fps)
            .with_context(|| format!("could not decode gif file {}", gif_path.display()))
    }

    pub fn from_reader<R: Read>(reader: R, target: (u32, u32), fallback_fps: f64) -> Result<Self> {
        let (width, height) = target;
        anyhow::ensure!(width > 0 && height > 0, "gif target size must not be empty");

        let frames = GifDecoder::new(reader)?.into_frames().collect_frames()?;

        let frame_rate = frames
            .first()
            .map(|frame| frame.delay().numer_denom_ms())
            .filter(|(numer, denom)| *numer > 0 && *denom > 0)
            .map(|(numer, denom)| 1000.0 * denom as f64 / numer as f64)
            .unwrap_or(fallback_fps);

        let frames: Vec<RgbImage> = frames
            .into_iter()
            .map(|frame| {
                let rgb = DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8();
                if rgb.dimensions() == target {
                    rgb
                } else {
                    imageops::resize(&rgb, width, height, imageops::FilterType::Triangle)
                }
            })
            .collect();

        tracing::debug!("decoded {} gif frames at {:.3} fps", frames.len(), frame_rate);

        Ok(Self {
            frames: frames.into_iter(),
            width,
            height,
            frame_rate,
        })
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for GifReader {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.next())
    }
}

pub fn first_frame<P: AsRef<Path>>(video_path: P) -> Result<Option<RgbImage>> {
    VideoReader::open(video_path)?.next_frame()
}

/// Writes the first frame of `video_path` to `image_path`.
/// Returns `false` when the video has no decodable frame.
pub fn save_first_frame<P, Q>(video_path: P, image_path: Q) -> Result<bool>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let image_path = image_path.as_ref();
    match first_frame(video_path)? {
        Some(frame) => {
            frame
                .save(image_path)
                .context(format!("failed to save image {}", image_path.display()))?;
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::video::encoder::tests::write_clip;
    use image::{codecs::gif::GifEncoder, Delay, Frame, Rgba, RgbaImage};

    fn gif_bytes(sizes: &[(u32, u32)], delay_ms: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut bytes);
            let frames = sizes.iter().enumerate().map(|(i, &(w, h))| {
                let buffer = RgbaImage::from_pixel(w, h, Rgba([(i * 40) as u8, 200, 10, 255]));
                Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(delay_ms, 1))
            });
            encoder.encode_frames(frames).expect("failed to encode gif");
        }
        bytes
    }

    #[test]
    fn test_gif_reader_resizes_frames() {
        let bytes = gif_bytes(&[(4, 4), (4, 4), (4, 4)], 100);
        let mut reader = GifReader::from_reader(bytes.as_slice(), (8, 6), 8.0).unwrap();

        assert_eq!(reader.dimensions(), (8, 6));
        assert_eq!(reader.remaining(), 3);
        assert!((reader.frame_rate() - 10.0).abs() < 1e-9);

        let mut count = 0;
        while let Some(frame) = reader.next_frame().unwrap() {
            assert_eq!(frame.dimensions(), (8, 6));
            count += 1;
        }
        assert_eq!(count, 3);
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_gif_reader_keeps_matching_size() {
        let bytes = gif_bytes(&[(5, 3)], 50);
        let mut reader = GifReader::from_reader(bytes.as_slice(), (5, 3), 8.0).unwrap();

        let frame = reader.next_frame().unwrap().unwrap();
        assert_eq!(frame.dimensions(), (5, 3));
        // palette quantization may shift the channel slightly
        assert!(frame.get_pixel(2, 1).0[1].abs_diff(200) <= 8);
        assert!((reader.frame_rate() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_gif_reader_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        std::fs::write(&path, gif_bytes(&[(2, 2), (2, 2)], 50)).unwrap();

        let reader = GifReader::open(&path, (2, 2), 8.0).unwrap();
        assert_eq!(reader.remaining(), 2);
    }

    #[test]
    fn test_gif_reader_rejects_garbage() {
        assert!(GifReader::from_reader(&b"not a gif"[..], (2, 2), 8.0).is_err());
        let bytes = gif_bytes(&[(2, 2)], 50);
        assert!(GifReader::from_reader(bytes.as_slice(), (0, 2), 8.0).is_err());
    }

    #[test]
    fn test_save_first_frame_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("a-3.mp4");
        let image_path = dir.path().join("first.png");
        write_clip(&clip, (24, 16), 8.0, 4);

        assert!(save_first_frame(&clip, &image_path).unwrap());
        let saved = image::open(&image_path).unwrap().to_rgb8();
        assert_eq!(saved.dimensions(), (24, 16));
        // the first written frame has a red channel of 0
        assert!(saved.get_pixel(12, 8).0[0] <= 12);
        assert!(saved.get_pixel(12, 8).0[2].abs_diff(200) <= 12);
    }

    #[test]
    fn test_video_reader_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(VideoReader::open(dir.path().join("missing.mp4")).is_err());
    }
}
