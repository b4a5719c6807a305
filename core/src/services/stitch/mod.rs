pub(crate) mod job;
pub(crate) mod order;
pub(crate) mod service;

pub use job::{JobOutcome, SubfolderJob};
pub use order::{FrameRate, Profile, SkipReason};
pub use service::{ReportEntry, RunReport, StitchService};
