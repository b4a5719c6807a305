use std::fmt;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::services::video::{ClipFile, ClipKind, Suffix};

/// Names longer than this mark the primary (foreground) clips of a folder.
const PRIMARY_NAME_LEN: usize = 20;
const RGBA_PREFIX: &str = "rgba";

/// How a folder's clips are picked, ordered and timed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default,
    Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// `rgba*` clips, then `-2`, then `-3`, at the first clip's frame rate.
    Rgba,
    /// `-2` clips, then GIFs, then `-3`, at the target frame rate.
    Gif,
    /// `-2` clips, then long-named clips, then `-3`, each resampled to the
    /// target frame rate.
    #[default]
    Resample,
}

/// Where the output frame rate comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRate {
    FirstClip,
    Target,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoClips,
    NoPrimaryClips,
    NothingToStitch,
    OutputExists,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::NoClips => "no candidate clips found",
            SkipReason::NoPrimaryClips => "no primary (long-named) clips found",
            SkipReason::NothingToStitch => "no clip matches the ordering rules",
            SkipReason::OutputExists => "output already exists",
        };
        f.write_str(reason)
    }
}

type Group = fn(&ClipFile) -> bool;

fn is_rgba(clip: &ClipFile) -> bool {
    clip.name.starts_with(RGBA_PREFIX)
}

fn is_segment2(clip: &ClipFile) -> bool {
    clip.suffix() == Suffix::Segment2
}

fn is_segment3(clip: &ClipFile) -> bool {
    clip.suffix() == Suffix::Segment3
}

fn is_strict_segment2(clip: &ClipFile) -> bool {
    is_segment2(clip) && !clip.is_revised()
}

fn is_strict_segment3(clip: &ClipFile) -> bool {
    is_segment3(clip) && !clip.is_revised()
}

fn is_gif(clip: &ClipFile) -> bool {
    clip.kind == ClipKind::Gif
}

fn is_primary(clip: &ClipFile) -> bool {
    clip.name_len() > PRIMARY_NAME_LEN
}

impl Profile {
    pub fn names() -> Vec<String> {
        Self::iter().map(|profile| profile.to_string()).collect()
    }

    pub fn accepted_kinds(self) -> &'static [ClipKind] {
        match self {
            Profile::Gif => &[ClipKind::Mp4, ClipKind::Gif],
            Profile::Rgba | Profile::Resample => &[ClipKind::Mp4],
        }
    }

    pub fn resamples(self) -> bool {
        self == Profile::Resample
    }

    pub fn frame_rate(self) -> FrameRate {
        match self {
            Profile::Rgba => FrameRate::FirstClip,
            Profile::Gif | Profile::Resample => FrameRate::Target,
        }
    }

    fn groups(self) -> [Group; 3] {
        match self {
            Profile::Rgba => [is_rgba, is_strict_segment2, is_strict_segment3],
            Profile::Gif => [is_segment2, is_gif, is_segment3],
            Profile::Resample => [is_segment2, is_primary, is_segment3],
        }
    }

    /// Orders `clips` group by group, keeping name order inside a group.
    /// A clip matching several groups keeps its first position; clips
    /// matching none are dropped.
    pub fn order(self, clips: &[ClipFile]) -> Result<Vec<ClipFile>, SkipReason> {
        if clips.is_empty() {
            return Err(SkipReason::NoClips);
        }
        if self == Profile::Resample && !clips.iter().any(is_primary) {
            return Err(SkipReason::NoPrimaryClips);
        }

        let mut ordered: Vec<ClipFile> = Vec::with_capacity(clips.len());
        for group in self.groups() {
            for clip in clips.iter().filter(|clip| group(clip)) {
                if !ordered.iter().any(|seen| seen.path == clip.path) {
                    ordered.push(clip.clone());
                }
            }
        }

        if ordered.is_empty() {
            return Err(SkipReason::NothingToStitch);
        }
        Ok(ordered)
    }
}
