use std::{path::Path, sync::Arc};

use anyhow::Result;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{error, info, info_span, warn};

use super::job::{JobOutcome, SubfolderJob};
use crate::services::video::VideoService;
use crate::settings::Settings;

#[derive(Debug)]
pub struct ReportEntry {
    pub name: String,
    pub outcome: JobOutcome,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub entries: Vec<ReportEntry>,
}

impl RunReport {
    pub fn stitched(&self) -> usize {
        self.count(|outcome| matches!(outcome, JobOutcome::Stitched { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, JobOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(JobOutcome::is_failure)
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, predicate: impl Fn(&JobOutcome) -> bool) -> usize {
        self.entries
            .iter()
            .filter(|entry| predicate(&entry.outcome))
            .count()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StitchService;

impl StitchService {
    /// Jobs for every subfolder of `root`; when `only` is not empty just the
    /// folders named in it.
    pub async fn jobs<P: AsRef<Path>>(
        root: P,
        settings: &Settings,
        only: &[String],
    ) -> Result<Vec<SubfolderJob>> {
        let folders = VideoService::list_subfolders(root, &settings.skip_dirs).await?;

        Ok(folders
            .into_iter()
            .filter(|(name, _)| only.is_empty() || only.contains(name))
            .map(|(name, dir)| SubfolderJob::new(&name, dir, settings))
            .collect())
    }

    /// Runs every job of `root` on blocking threads, at most
    /// `settings.effective_jobs()` at a time. Entries come back in folder
    /// name order.
    pub async fn run_root<P: AsRef<Path>>(
        root: P,
        settings: Arc<Settings>,
        only: &[String],
    ) -> Result<RunReport> {
        let jobs = Self::jobs(root, &settings, only).await?;
        if jobs.is_empty() {
            warn!("no subfolders to process");
            return Ok(RunReport::default());
        }

        let limit = Arc::new(Semaphore::new(settings.effective_jobs()));
        let mut tasks = JoinSet::new();

        for (index, job) in jobs.into_iter().enumerate() {
            let permit = Arc::clone(&limit).acquire_owned().await?;
            let settings = Arc::clone(&settings);

            tasks.spawn_blocking(move || {
                let _permit = permit;
                let _span = info_span!("subfolder", name = %job.name).entered();
                info!("processing {}", job.dir.display());

                let outcome = job.run(&settings);
                match &outcome {
                    JobOutcome::Stitched { .. } => {}
                    JobOutcome::Skipped(reason) => warn!("skipped: {reason}"),
                    JobOutcome::Failed(err) => error!("failed: {err:#}"),
                }

                (index, ReportEntry { name: job.name, outcome })
            });
        }

        let mut finished = Vec::with_capacity(tasks.len());
        while let Some(result) = tasks.join_next().await {
            finished.push(result?);
        }
        finished.sort_by_key(|(index, _)| *index);

        Ok(RunReport {
            entries: finished.into_iter().map(|(_, entry)| entry).collect(),
        })
    }
}
