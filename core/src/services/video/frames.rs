use anyhow::{ensure, Context, Result};
use image::{GenericImage, RgbImage};

/// Anything that yields decoded RGB frames in presentation order.
pub trait FrameSource {
    fn dimensions(&self) -> (u32, u32);

    fn frame_rate(&self) -> f64;

    /// `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }

    fn frame_rate(&self) -> f64 {
        (**self).frame_rate()
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        (**self).next_frame()
    }
}

pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    fn finish(self) -> Result<()>;
}

/// Number of source frames per kept frame when dropping from `source_fps`
/// down to `target_fps`. Never less than one.
pub fn frame_stride(source_fps: f64, target_fps: f64) -> usize {
    if !source_fps.is_finite() || !target_fps.is_finite() || source_fps <= 0.0 || target_fps <= 0.0
    {
        return 1;
    }
    ((source_fps / target_fps) as usize).max(1)
}

/// Keeps every `stride`-th frame of the wrapped source.
#[derive(Debug)]
pub struct Resampled<S> {
    inner: S,
    stride: usize,
    index: usize,
    target_fps: f64,
}

impl<S: FrameSource> Resampled<S> {
    pub fn new(inner: S, target_fps: f64) -> Self {
        let stride = frame_stride(inner.frame_rate(), target_fps);
        Self {
            inner,
            stride,
            index: 0,
            target_fps,
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }
}

impl<S: FrameSource> FrameSource for Resampled<S> {
    fn dimensions(&self) -> (u32, u32) {
        self.inner.dimensions()
    }

    fn frame_rate(&self) -> f64 {
        self.target_fps
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        while let Some(frame) = self.inner.next_frame()? {
            let keep = self.index % self.stride == 0;
            self.index += 1;
            if keep {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}

/// Size of the frame produced by placing frames of the given sizes side by side.
pub fn concat_dimensions<I>(dimensions: I) -> Result<(u32, u32)>
where
    I: IntoIterator<Item = (u32, u32)>,
{
    let mut width = 0u32;
    let mut height = None;

    for (w, h) in dimensions {
        match height {
            None => height = Some(h),
            Some(expected) => ensure!(
                expected == h,
                "frame heights differ ({expected} vs {h}), cannot concatenate horizontally"
            ),
        }
        width = width
            .checked_add(w)
            .context("concatenated frame is too wide")?;
    }

    match height {
        Some(height) => Ok((width, height)),
        None => anyhow::bail!("no frames to concatenate"),
    }
}

pub fn hconcat(frames: &[RgbImage]) -> Result<RgbImage> {
    let (width, height) = concat_dimensions(frames.iter().map(|frame| frame.dimensions()))?;
    let mut combined = RgbImage::new(width, height);

    let mut x = 0;
    for frame in frames {
        combined.copy_from(frame, x, 0)?;
        x += frame.width();
    }

    Ok(combined)
}

/// Reads one frame from every source per step, writes their horizontal
/// concatenation to `sink` and stops as soon as any source runs dry.
/// Returns the number of frames written.
pub fn stitch<S, W>(sources: &mut [S], mut sink: W) -> Result<u64>
where
    S: FrameSource,
    W: FrameSink,
{
    ensure!(!sources.is_empty(), "no clips to stitch");

    let mut written = 0u64;
    'frames: loop {
        let mut tuple = Vec::with_capacity(sources.len());
        for source in sources.iter_mut() {
            match source.next_frame()? {
                Some(frame) => tuple.push(frame),
                None => break 'frames,
            }
        }

        sink.write_frame(&hconcat(&tuple)?)?;
        written += 1;
    }

    sink.finish()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// In-memory source of solid frames.
    struct SolidSource {
        width: u32,
        height: u32,
        fps: f64,
        colors: Vec<[u8; 3]>,
        next: usize,
    }

    impl SolidSource {
        fn new(width: u32, height: u32, fps: f64, colors: Vec<[u8; 3]>) -> Self {
            Self { width, height, fps, colors, next: 0 }
        }
    }

    impl FrameSource for SolidSource {
        fn dimensions(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn frame_rate(&self) -> f64 {
            self.fps
        }

        fn next_frame(&mut self) -> Result<Option<RgbImage>> {
            let Some(color) = self.colors.get(self.next) else {
                return Ok(None);
            };
            self.next += 1;
            Ok(Some(RgbImage::from_pixel(self.width, self.height, Rgb(*color))))
        }
    }

    #[derive(Default)]
    struct MemorySink {
        frames: Vec<RgbImage>,
        finished: bool,
    }

    impl FrameSink for &mut MemorySink {
        fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
            self.frames.push(frame.clone());
            Ok(())
        }

        fn finish(self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    fn gray(n: u8) -> [u8; 3] {
        [n, n, n]
    }

    #[test]
    fn test_frame_stride() {
        assert_eq!(frame_stride(30.0, 8.0), 3);
        assert_eq!(frame_stride(24.0, 8.0), 3);
        assert_eq!(frame_stride(25.0, 8.0), 3);
        assert_eq!(frame_stride(8.0, 8.0), 1);
        assert_eq!(frame_stride(5.0, 8.0), 1);
        assert_eq!(frame_stride(0.0, 8.0), 1);
        assert_eq!(frame_stride(f64::NAN, 8.0), 1);
        assert_eq!(frame_stride(30.0, 0.0), 1);
    }

    #[test]
    fn test_resampled_keeps_every_stride_frame() {
        let colors = (0..10).map(gray).collect();
        let mut source = Resampled::new(SolidSource::new(2, 2, 24.0, colors), 8.0);
        assert_eq!(source.stride(), 3);
        assert_eq!(source.frame_rate(), 8.0);
        assert_eq!(source.dimensions(), (2, 2));

        let mut kept = Vec::new();
        while let Some(frame) = source.next_frame().unwrap() {
            kept.push(frame.get_pixel(0, 0).0[0]);
        }
        assert_eq!(kept, [0, 3, 6, 9]);
    }

    #[test]
    fn test_hconcat() {
        let left = RgbImage::from_pixel(2, 3, Rgb([255, 0, 0]));
        let right = RgbImage::from_pixel(4, 3, Rgb([0, 0, 255]));

        let combined = hconcat(&[left, right]).unwrap();
        assert_eq!(combined.dimensions(), (6, 3));
        assert_eq!(combined.get_pixel(1, 2), &Rgb([255, 0, 0]));
        assert_eq!(combined.get_pixel(2, 0), &Rgb([0, 0, 255]));
        assert_eq!(combined.get_pixel(5, 2), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_hconcat_rejects_mismatched_heights() {
        let a = RgbImage::new(2, 3);
        let b = RgbImage::new(2, 4);
        assert!(hconcat(&[a, b]).is_err());
        assert!(hconcat(&[]).is_err());
    }

    #[test]
    fn test_concat_dimensions() {
        assert_eq!(concat_dimensions([(4, 2), (6, 2), (1, 2)]).unwrap(), (11, 2));
        assert!(concat_dimensions([(4, 2), (6, 3)]).is_err());
    }

    #[test]
    fn test_concat_dimensions_rejects_overflowing_width() {
        let err = concat_dimensions([(u32::MAX, 2), (1, 2)]).unwrap_err();
        assert!(err.to_string().contains("too wide"), "{err:#}");
    }

    #[test]
    fn test_stitch_stops_at_shortest_source() {
        let mut sources = vec![
            SolidSource::new(2, 2, 8.0, vec![gray(1), gray(2), gray(3)]),
            SolidSource::new(3, 2, 8.0, vec![gray(10), gray(20)]),
        ];
        let mut sink = MemorySink::default();

        let written = stitch(&mut sources, &mut sink).unwrap();
        assert_eq!(written, 2);
        assert!(sink.finished);
        assert_eq!(sink.frames.len(), 2);
        assert_eq!(sink.frames[1].dimensions(), (5, 2));
        assert_eq!(sink.frames[1].get_pixel(0, 0).0, gray(2));
        assert_eq!(sink.frames[1].get_pixel(4, 1).0, gray(20));
        // the first source already gave up its third frame for the partial tuple
        assert_eq!(sources[0].next, 3);
    }

    #[test]
    fn test_stitch_with_boxed_sources() {
        let mut sources: Vec<Box<dyn FrameSource>> = vec![
            Box::new(SolidSource::new(1, 1, 8.0, vec![gray(1)])),
            Box::new(Resampled::new(
                SolidSource::new(1, 1, 16.0, vec![gray(5), gray(6), gray(7)]),
                8.0,
            )),
        ];
        let mut sink = MemorySink::default();

        assert_eq!(stitch(&mut sources, &mut sink).unwrap(), 1);
        assert_eq!(sink.frames[0].get_pixel(1, 0).0, gray(5));
    }

    #[test]
    fn test_stitch_requires_sources() {
        let mut sources: Vec<SolidSource> = Vec::new();
        let mut sink = MemorySink::default();
        assert!(stitch(&mut sources, &mut sink).is_err());
        assert!(!sink.finished);
    }
}
