//! `batch_manifest.json`: one record per period plus status totals.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::Path;

use crate::job::{JobStatus, PeriodJobRecord};

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchManifest {
    pub created_at: DateTime<Utc>,
    /// Extension of every ledger and summary table in the batch
    pub format: String,
    pub num_jobs: usize,
    pub success: usize,
    pub incomplete: usize,
    pub failure: usize,
    /// Sorted by period
    pub jobs: Vec<PeriodJobRecord>,
}

impl BatchManifest {
    pub fn from_records(mut jobs: Vec<PeriodJobRecord>, format: &str) -> Self {
        jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        let count = |status: JobStatus| jobs.iter().filter(|r| r.status == status).count();
        Self {
            created_at: Utc::now(),
            format: format.to_string(),
            num_jobs: jobs.len(),
            success: count(JobStatus::Ok),
            incomplete: count(JobStatus::Incomplete),
            failure: count(JobStatus::Error),
            jobs,
        }
    }

    pub fn failed(&self) -> impl Iterator<Item = &PeriodJobRecord> {
        self.jobs.iter().filter(|r| r.status == JobStatus::Error)
    }
}

pub fn write_batch_manifest(path: &Path, manifest: &BatchManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating manifest directory '{}'", parent.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("creating batch manifest '{}'", path.display()))?;
    serde_json::to_writer_pretty(file, manifest)
        .with_context(|| format!("writing batch manifest '{}'", path.display()))
}

pub fn load_batch_manifest(path: &Path) -> Result<BatchManifest> {
    let file = File::open(path)
        .with_context(|| format!("opening batch manifest '{}'", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("parsing batch manifest '{}'", path.display()))
}
