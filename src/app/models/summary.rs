use std::fmt;

use core_clipstitch::services::stitch::{JobOutcome, ReportEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Stitched,
    Skipped,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            JobStatus::Stitched => "ok",
            JobStatus::Skipped => "skip",
            JobStatus::Failed => "FAIL",
        };
        write!(f, "{status:<4}")
    }
}

/// One line of the end-of-run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub name: String,
    pub status: JobStatus,
    pub detail: String,
}

impl From<&ReportEntry> for JobSummary {
    fn from(value: &ReportEntry) -> Self {
        let (status, detail) = match &value.outcome {
            JobOutcome::Stitched { frames, output, snapshot } => {
                let mut detail = format!("{frames} frames -> {}", output.display());
                if let Some(snapshot) = snapshot {
                    detail.push_str(&format!(", snapshot {}", snapshot.display()));
                }
                (JobStatus::Stitched, detail)
            }
            JobOutcome::Skipped(reason) => (JobStatus::Skipped, reason.to_string()),
            JobOutcome::Failed(error) => (JobStatus::Failed, format!("{error:#}")),
        };

        Self {
            name: value.name.to_owned(),
            status,
            detail,
        }
    }
}

impl fmt::Display for JobSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status, self.name, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_clipstitch::services::stitch::SkipReason;
    use std::path::PathBuf;

    #[test]
    fn test_stitched_summary() {
        let entry = ReportEntry {
            name: "1-1".to_owned(),
            outcome: JobOutcome::Stitched {
                frames: 42,
                output: PathBuf::from("set/1-1/1-1_concatenated.mp4"),
                snapshot: Some(PathBuf::from("set/1-1/first_frame_segment_3.png")),
            },
        };

        let summary = JobSummary::from(&entry);
        assert_eq!(summary.status, JobStatus::Stitched);
        assert_eq!(
            summary.to_string(),
            "ok   1-1: 42 frames -> set/1-1/1-1_concatenated.mp4, snapshot set/1-1/first_frame_segment_3.png"
        );
    }

    #[test]
    fn test_skipped_and_failed_summary() {
        let skipped = ReportEntry {
            name: "2-1".to_owned(),
            outcome: JobOutcome::Skipped(SkipReason::NoClips),
        };
        assert_eq!(
            JobSummary::from(&skipped).to_string(),
            "skip 2-1: no candidate clips found"
        );

        let failed = ReportEntry {
            name: "3-1".to_owned(),
            outcome: JobOutcome::Failed(
                anyhow::anyhow!("broken header").context("could not open video file x.mp4"),
            ),
        };
        let summary = JobSummary::from(&failed);
        assert_eq!(summary.status, JobStatus::Failed);
        assert_eq!(summary.detail, "could not open video file x.mp4: broken header");
    }
}
