use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const RESAMPLED_MARKER: &str = "resampled_";
const SNAPSHOT_SUFFIX: &str = "-3.mp4";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipKind {
    Mp4,
    Gif,
}

impl ClipKind {
    pub fn extension(self) -> &'static str {
        match self {
            ClipKind::Mp4 => ".mp4",
            ClipKind::Gif => ".gif",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        [ClipKind::Mp4, ClipKind::Gif]
            .into_iter()
            .find(|kind| name.ends_with(kind.extension()))
    }
}

/// Segment marker carried at the end of a clip's file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suffix {
    Segment2,
    Segment3,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipFile {
    pub name: String,
    pub path: PathBuf,
    pub kind: ClipKind,
}

impl ClipFile {
    pub fn new<P: AsRef<Path>>(dir: P, name: &str) -> Option<Self> {
        let kind = ClipKind::from_name(name)?;
        Some(Self {
            name: name.to_owned(),
            path: dir.as_ref().join(name),
            kind,
        })
    }

    pub fn suffix(&self) -> Suffix {
        let name = self.name.as_str();
        if name.ends_with("-2.mp4") || name.ends_with("-2-new.mp4") {
            Suffix::Segment2
        } else if name.ends_with("-3.mp4") || name.ends_with("-3-new.mp4") {
            Suffix::Segment3
        } else {
            Suffix::Other
        }
    }

    /// `-2-new.mp4` / `-3-new.mp4` re-exports of a segment.
    pub fn is_revised(&self) -> bool {
        self.suffix() != Suffix::Other && self.name.ends_with("-new.mp4")
    }

    /// Length of the file name in characters, not bytes.
    pub fn name_len(&self) -> usize {
        self.name.chars().count()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VideoService;

impl VideoService {
    /// Direct child directories of `root` sorted by name, minus the ones in `skip`.
    pub async fn list_subfolders<P: AsRef<Path>>(
        root: P,
        skip: &[String],
    ) -> Result<Vec<(String, PathBuf)>> {
        let root = root.as_ref();
        let mut folders = Vec::new();
        let mut dir = tokio::fs::read_dir(root)
            .await
            .with_context(|| format!("failed to read root folder {}", root.display()))?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            // dangling symlinks fail here
            let metadata = match tokio::fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(err) => {
                    tracing::warn!("skipping unreadable entry {}: {err}", path.display());
                    continue;
                }
            };
            if !metadata.is_dir() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                tracing::warn!("skipping folder with non UTF-8 name: {}", path.display());
                continue;
            };
            if skip.contains(&name) {
                tracing::debug!("skipping excluded folder {name}");
                continue;
            }

            folders.push((name, path));
        }

        folders.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(folders)
    }

    /// Candidate clips of `dir` sorted by file name.
    ///
    /// Outputs of earlier runs (`*{output_suffix}` and `resampled_*`) are never
    /// candidates.
    pub fn discover_clips<P: AsRef<Path>>(
        dir: P,
        kinds: &[ClipKind],
        output_suffix: &str,
    ) -> Result<Vec<ClipFile>> {
        let dir = dir.as_ref();
        let mut clips = Vec::new();
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read folder {}", dir.display()))?;

        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                tracing::warn!("skipping file with non UTF-8 name: {}", entry.path().display());
                continue;
            };
            if name.ends_with(output_suffix) || name.contains(RESAMPLED_MARKER) {
                continue;
            }

            if let Some(clip) = ClipFile::new(dir, name) {
                if kinds.contains(&clip.kind) {
                    clips.push(clip);
                }
            }
        }

        clips.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clips)
    }

    /// The clip whose first frame becomes the folder snapshot.
    pub fn snapshot_source(clips: &[ClipFile]) -> Option<&ClipFile> {
        clips.iter().find(|clip| clip.name.ends_with(SNAPSHOT_SUFFIX))
    }
}
