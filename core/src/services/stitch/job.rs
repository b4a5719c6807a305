use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::order::{FrameRate, Profile, SkipReason};
use crate::services::video::{
    concat_dimensions, save_first_frame, stitch, ClipFile, ClipKind, FrameSource, GifReader,
    Resampled, VideoReader, VideoService, VideoWriter,
};
use crate::settings::Settings;

#[derive(Debug)]
pub enum JobOutcome {
    Stitched {
        frames: u64,
        output: PathBuf,
        snapshot: Option<PathBuf>,
    },
    Skipped(SkipReason),
    Failed(anyhow::Error),
}

impl JobOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, JobOutcome::Failed(_))
    }
}

/// One subfolder turned into one stitched video and one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubfolderJob {
    pub name: String,
    pub dir: PathBuf,
    pub output: PathBuf,
    pub snapshot: PathBuf,
}

impl SubfolderJob {
    pub fn new<P: AsRef<Path>>(name: &str, dir: P, settings: &Settings) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            name: name.to_owned(),
            output: dir.join(format!("{name}{}", settings.output_suffix)),
            snapshot: dir.join(&settings.snapshot_name),
            dir,
        }
    }

    /// Runs the job to completion. Errors are reported in the outcome; a
    /// failed job may leave a partial output behind.
    pub fn run(&self, settings: &Settings) -> JobOutcome {
        match self.try_run(settings) {
            Ok(outcome) => outcome,
            Err(error) => JobOutcome::Failed(error),
        }
    }

    fn try_run(&self, settings: &Settings) -> Result<JobOutcome> {
        let profile = settings.profile;

        if !settings.overwrite && self.output.exists() {
            return Ok(JobOutcome::Skipped(SkipReason::OutputExists));
        }

        let clips = VideoService::discover_clips(
            &self.dir,
            profile.accepted_kinds(),
            &settings.output_suffix,
        )?;
        let ordered = match profile.order(&clips) {
            Ok(ordered) => ordered,
            Err(reason) => return Ok(JobOutcome::Skipped(reason)),
        };
        debug!(
            "{} order: {}",
            self.name,
            ordered
                .iter()
                .map(|clip| clip.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut sources = open_sources(&ordered, profile, settings)?;
        let (width, height) = concat_dimensions(sources.iter().map(|source| source.dimensions()))
            .with_context(|| format!("clips of {} cannot be placed side by side", self.name))?;
        let fps = match profile.frame_rate() {
            FrameRate::FirstClip => sources[0].frame_rate(),
            FrameRate::Target => settings.target_fps,
        };

        let writer = VideoWriter::create(&self.output, width, height, fps, &settings.encoder)?;
        let frames = stitch(&mut sources, writer)
            .with_context(|| format!("failed to stitch {}", self.output.display()))?;
        info!("concatenated video saved as {} ({frames} frames)", self.output.display());

        let snapshot = if settings.snapshot {
            self.save_snapshot(&clips)?
        } else {
            None
        };

        Ok(JobOutcome::Stitched {
            frames,
            output: self.output.clone(),
            snapshot,
        })
    }

    fn save_snapshot(&self, clips: &[ClipFile]) -> Result<Option<PathBuf>> {
        let Some(source) = VideoService::snapshot_source(clips) else {
            return Ok(None);
        };

        if save_first_frame(&source.path, &self.snapshot)? {
            info!("saved first frame of '{}' as {}", source.name, self.snapshot.display());
            Ok(Some(self.snapshot.clone()))
        } else {
            warn!("'{}' has no decodable frame, no snapshot written", source.name);
            Ok(None)
        }
    }
}

/// Opens every ordered clip. The first MP4 fixes the size GIF frames are
/// scaled to, wherever it sits in the order.
fn open_sources(
    ordered: &[ClipFile],
    profile: Profile,
    settings: &Settings,
) -> Result<Vec<Box<dyn FrameSource>>> {
    let mut slots: Vec<Option<Box<dyn FrameSource>>> = ordered.iter().map(|_| None).collect();
    let mut target = None;

    for (slot, clip) in slots.iter_mut().zip(ordered) {
        if clip.kind != ClipKind::Mp4 {
            continue;
        }
        let reader = VideoReader::open(&clip.path)?;
        target.get_or_insert(reader.dimensions());

        let source: Box<dyn FrameSource> = if profile.resamples() {
            let resampled = Resampled::new(reader, settings.target_fps);
            debug!("{}: keeping every {} frame(s)", clip.name, resampled.stride());
            Box::new(resampled)
        } else {
            Box::new(reader)
        };
        *slot = Some(source);
    }

    for (slot, clip) in slots.iter_mut().zip(ordered) {
        if clip.kind != ClipKind::Gif {
            continue;
        }
        let target = target.context("no MP4 clip to size GIF frames")?;
        let reader = GifReader::open(&clip.path, target, settings.target_fps)?;
        debug!("{}: {} frames", clip.name, reader.remaining());
        *slot = Some(Box::new(reader));
    }

    Ok(slots.into_iter().flatten().collect())
}
