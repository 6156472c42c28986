use crate::job::{JobStatus, PeriodJob, PeriodJobRecord};
use crate::manifest::{write_batch_manifest, BatchManifest};
use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use wfa_algo::{compute_ledger, summarize, Ledger};
use wfa_core::EngineConfig;
use wfa_io::output::TIMESTAMP_FORMAT;
use wfa_io::period::month_from_counters;
use wfa_io::{write_diagnostics, write_ledger, write_summary, DataDir, LoadedTables};

/// Output table format of every job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            other => Err(anyhow!("unknown output format '{other}'; use csv or parquet")),
        }
    }
}

pub struct BatchRunnerConfig {
    pub jobs: Vec<PeriodJob>,
    pub engine: EngineConfig,
    pub data_dir: PathBuf,
    pub output_root: PathBuf,
    pub format: OutputFormat,
    /// 0 means one thread per CPU
    pub threads: usize,
}

/// Status totals; `jobs` is sorted by period.
pub struct BatchSummary {
    pub success: usize,
    pub incomplete: usize,
    pub failure: usize,
    pub manifest_path: PathBuf,
    pub jobs: Vec<PeriodJobRecord>,
}

/// Compute every job's ledger in parallel and write a manifest next to the
/// per-period outputs. A failing period is recorded, never fatal for the
/// batch.
pub fn run_batch(config: &BatchRunnerConfig) -> Result<BatchSummary> {
    fs::create_dir_all(&config.output_root).with_context(|| {
        format!(
            "creating batch output root '{}'",
            config.output_root.display()
        )
    })?;
    config.engine.validate().context("validating engine config")?;
    let tables = LoadedTables::load(&DataDir::new(&config.data_dir), &config.engine)?;

    let thread_count = if config.threads == 0 {
        num_cpus::get()
    } else {
        config.threads
    };
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .context("building Rayon thread pool for batch runs")?;
    info!(jobs = config.jobs.len(), threads = thread_count, "starting batch");

    let job_records: Vec<PeriodJobRecord> = pool.install(|| {
        config
            .jobs
            .par_iter()
            .map(|job| run_job(job, &tables, config))
            .collect()
    });

    let manifest = BatchManifest::from_records(job_records, config.format.extension());
    let manifest_path = config.output_root.join("batch_manifest.json");
    write_batch_manifest(&manifest_path, &manifest)?;
    for failed in manifest.failed() {
        warn!(period = %failed.job_id, error = failed.error.as_deref().unwrap_or(""), "period failed");
    }
    info!(
        success = manifest.success,
        incomplete = manifest.incomplete,
        failure = manifest.failure,
        manifest = %manifest_path.display(),
        "batch finished"
    );
    Ok(BatchSummary {
        success: manifest.success,
        incomplete: manifest.incomplete,
        failure: manifest.failure,
        manifest_path,
        jobs: manifest.jobs,
    })
}

/// Writes `ledger.<ext>`, `summary.<ext>` and `diagnostics.json` under
/// `<output_root>/<job_id>/`.
fn compute_and_write(
    job: &PeriodJob,
    tables: &LoadedTables,
    config: &BatchRunnerConfig,
    dir: &Path,
    ledger_path: &Path,
) -> Result<Ledger> {
    let period = month_from_counters(job.year, job.month, &tables.telemetry, job.until_latest)?;
    let inputs = tables.inputs_for(period);
    let ledger = compute_ledger(&inputs, &config.engine)
        .with_context(|| format!("computing ledger for {}", job.label()))?;

    let ext = config.format.extension();
    write_ledger(&ledger, ledger_path)?;
    write_summary(&summarize(&ledger), &dir.join(format!("summary.{ext}")))?;
    write_diagnostics(&ledger.diagnostics, &dir.join("diagnostics.json"))?;
    Ok(ledger)
}

fn run_job(job: &PeriodJob, tables: &LoadedTables, config: &BatchRunnerConfig) -> PeriodJobRecord {
    let dir = config.output_root.join(job.label());
    let ledger_path = dir.join(format!("ledger.{}", config.format.extension()));
    let mut record = PeriodJobRecord {
        job_id: job.job_id.clone(),
        period_start: None,
        period_end: None,
        status: JobStatus::Error,
        error: None,
        rows: 0,
        unresolved: 0,
        warnings: 0,
        errors: 0,
        output: ledger_path.display().to_string(),
    };

    match compute_and_write(job, tables, config, &dir, &ledger_path) {
        Ok(ledger) => {
            record.period_start = Some(ledger.period.start.format(TIMESTAMP_FORMAT).to_string());
            record.period_end = Some(ledger.period.end.format(TIMESTAMP_FORMAT).to_string());
            record.rows = ledger.rows.len();
            record.unresolved = ledger.unresolved.len();
            record.warnings = ledger.diagnostics.warning_count();
            record.errors = ledger.diagnostics.error_count();
            record.status = if ledger.is_complete() {
                JobStatus::Ok
            } else {
                JobStatus::Incomplete
            };
        }
        Err(err) => record.error = Some(format!("{err:#}")),
    }
    record
}
