pub mod summary;

pub use summary::{JobStatus, JobSummary};
