pub(crate) mod decoder;
pub(crate) mod encoder;
pub(crate) mod frames;
pub(crate) mod service;

pub use service::{ClipFile, ClipKind, Suffix, VideoService};
pub use decoder::{first_frame, save_first_frame, GifReader, VideoReader};
pub use encoder::VideoWriter;
pub use frames::{concat_dimensions, frame_stride, hconcat, stitch, FrameSink, FrameSource, Resampled};
