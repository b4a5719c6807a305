pub mod services;
pub mod settings;

pub use settings::{EncoderSettings, Settings};
