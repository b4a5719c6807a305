use std::path::Path;

use ffmpeg_next as ffmpeg;
use ffmpeg::{codec, encoder, format, software::scaling, util::frame, Dictionary, Packet, Rational};
use anyhow::{ensure, Context, Result};
use image::RgbImage;

use super::frames::FrameSink;
use crate::settings::EncoderSettings;

/// H.264 / YUV420P writer fed with RGB frames of a fixed size.
pub struct VideoWriter {
    output: format::context::Output,
    encoder: encoder::video::Encoder,
    scaler: scaling::Context,
    stream_index: usize,
    frame_time_base: Rational,
    stream_time_base: Rational,
    width: u32,
    height: u32,
    next_pts: i64,
}

impl VideoWriter {
    /// Frames written later must be `width` x `height`; odd sizes are scaled
    /// down to the nearest even size required by YUV420P.
    pub fn create<P: AsRef<Path>>(
        video_path: P,
        width: u32,
        height: u32,
        fps: f64,
        settings: &EncoderSettings,
    ) -> Result<Self> {
        let video_path = video_path.as_ref();
        ensure!(width >= 2 && height >= 2, "output size {width}x{height} is too small");
        ensure!(fps.is_finite() && fps > 0.0, "invalid output frame rate {fps}");
        ffmpeg::init()?;

        let (encoded_width, encoded_height) = (width & !1, height & !1);
        let frame_rate = Rational::from(fps);
        let frame_time_base = frame_rate.invert();

        let mut output = format::output(&video_path)
            .with_context(|| format!("could not create video file {}", video_path.display()))?;
        let global_header = output
            .format()
            .flags()
            .contains(format::Flags::GLOBAL_HEADER);

        let h264 = encoder::find(codec::Id::H264).context("H.264 encoder not available")?;

        let (stream_index, encoder) = {
            let mut stream = output.add_stream(h264)?;
            let mut context = codec::context::Context::new_with_codec(h264)
                .encoder()
                .video()?;

            context.set_width(encoded_width);
            context.set_height(encoded_height);
            context.set_format(format::Pixel::YUV420P);
            context.set_time_base(frame_time_base);
            context.set_frame_rate(Some(frame_rate));
            if global_header {
                context.set_flags(codec::Flags::GLOBAL_HEADER);
            }

            let mut options = Dictionary::new();
            options.set("crf", &settings.crf.to_string());
            options.set("preset", &settings.preset);

            let encoder = context
                .open_with(options)
                .context("could not open H.264 encoder")?;
            stream.set_parameters(&encoder);
            stream.set_time_base(frame_time_base);

            (stream.index(), encoder)
        };

        output
            .write_header()
            .with_context(|| format!("could not write header of {}", video_path.display()))?;
        let stream_time_base = output
            .stream(stream_index)
            .context("output stream vanished after writing the header")?
            .time_base();

        let scaler = scaling::Context::get(
            format::Pixel::RGB24,
            width,
            height,
            format::Pixel::YUV420P,
            encoded_width,
            encoded_height,
            scaling::Flags::BILINEAR,
        )
        .context("invalid swscontext parameter")?;

        tracing::debug!(
            "writing {} ({}x{} @ {:.3} fps, crf {}, preset {})",
            video_path.display(),
            encoded_width,
            encoded_height,
            fps,
            settings.crf,
            settings.preset,
        );

        Ok(Self {
            output,
            encoder,
            scaler,
            stream_index,
            frame_time_base,
            stream_time_base,
            width,
            height,
            next_pts: 0,
        })
    }

    fn drain_packets(&mut self) -> Result<()> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.frame_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .context("could not write video packet")?;
        }
        Ok(())
    }
}

impl FrameSink for VideoWriter {
    fn write_frame(&mut self, image: &RgbImage) -> Result<()> {
        ensure!(
            image.dimensions() == (self.width, self.height),
            "frame is {}x{} but the writer expects {}x{}",
            image.width(),
            image.height(),
            self.width,
            self.height,
        );

        let mut rgb_frame = frame::Video::new(format::Pixel::RGB24, self.width, self.height);
        let stride = rgb_frame.stride(0);
        let row = self.width as usize * 3;
        let data = rgb_frame.data_mut(0);
        for (y, line) in image.as_raw().chunks_exact(row).enumerate() {
            data[y * stride..y * stride + row].copy_from_slice(line);
        }

        let mut yuv_frame = frame::Video::empty();
        self.scaler
            .run(&rgb_frame, &mut yuv_frame)
            .context("error swscontext run")?;
        yuv_frame.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder.send_frame(&yuv_frame)?;
        self.drain_packets()
    }

    fn finish(mut self) -> Result<()> {
        self.encoder.send_eof()?;
        self.drain_packets()?;
        self.output.write_trailer().context("could not write video trailer")?;
        Ok(())
    }
}
