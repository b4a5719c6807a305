use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::services::stitch::Profile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderSettings {
    pub crf: u8,
    pub preset: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            crf: 18,
            preset: "medium".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub profile: Profile,
    pub target_fps: f64,
    pub skip_dirs: Vec<String>,
    pub output_suffix: String,
    pub snapshot_name: String,
    pub snapshot: bool,
    /// Subfolders processed at once; `0` means one per CPU.
    pub jobs: usize,
    pub overwrite: bool,
    pub encoder: EncoderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            target_fps: 8.0,
            skip_dirs: vec!["bp".to_owned()],
            output_suffix: "_concatenated.mp4".to_owned(),
            snapshot_name: "first_frame_segment_3.png".to_owned(),
            snapshot: true,
            jobs: 1,
            overwrite: true,
            encoder: EncoderSettings::default(),
        }
    }
}

impl Settings {
    pub const FILE_NAME: &'static str = "clipstitch.toml";

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content).context("invalid settings file")?;
        settings.validate()?;
        Ok(settings)
    }

    /// The settings as a file `from_toml` accepts.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize settings")
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("in {}", path.display()))
    }

    /// An explicit path must exist; otherwise `clipstitch.toml` in the
    /// working directory is used when present.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(Self::FILE_NAME).is_file() => Self::load(Self::FILE_NAME),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.target_fps.is_finite() && self.target_fps > 0.0,
            "target_fps must be a positive number, got {}",
            self.target_fps
        );
        ensure!(!self.output_suffix.is_empty(), "output_suffix must not be empty");
        ensure!(!self.snapshot_name.is_empty(), "snapshot_name must not be empty");
        ensure!(self.encoder.crf <= 51, "encoder.crf must be within 0..=51");
        Ok(())
    }

    pub fn effective_jobs(&self) -> usize {
        match self.jobs {
            0 => num_cpus::get(),
            jobs => jobs,
        }
    }
}
