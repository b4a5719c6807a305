pub mod stitch;
pub mod video;
