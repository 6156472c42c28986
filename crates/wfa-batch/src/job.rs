use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One reporting month to compute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodJob {
    pub job_id: String,
    pub year: i32,
    pub month: u32,
    /// End the period at the latest counter reading instead of month end
    pub until_latest: bool,
}

impl PeriodJob {
    pub fn month(year: i32, month: u32) -> Self {
        Self {
            job_id: format!("{year:04}-{month:02}"),
            year,
            month,
            until_latest: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.job_id
    }
}

/// Jobs for every month in the inclusive `YYYY-MM` range. Only the last
/// month is cut at the latest reading when `last_until_latest` is set.
pub fn jobs_for_months(first: &str, last: &str, last_until_latest: bool) -> Result<Vec<PeriodJob>> {
    let months = wfa_ts::months_between(first, last)?;
    let count = months.len();
    Ok(months
        .into_iter()
        .enumerate()
        .map(|(i, (year, month))| PeriodJob {
            until_latest: last_until_latest && i + 1 == count,
            ..PeriodJob::month(year, month)
        })
        .collect())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Ok,
    /// Ledger written, but some rows have no potential energy
    Incomplete,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Ok => "ok",
            JobStatus::Incomplete => "incomplete",
            JobStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodJobRecord {
    pub job_id: String,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub status: JobStatus,
    pub error: Option<String>,
    pub rows: usize,
    pub unresolved: usize,
    pub warnings: usize,
    pub errors: usize,
    pub output: String,
}
