use anyhow::{anyhow, Result};
use std::io::{self, Write};
use tabwriter::TabWriter;
use wfa_batch::{jobs_for_months, run_batch, BatchRunnerConfig};
use wfa_cli::cli::BatchArgs;
use wfa_io::load_engine_config;

pub fn handle(args: &BatchArgs) -> Result<()> {
    let engine = load_engine_config(&args.config)?;
    let jobs = jobs_for_months(&args.from, &args.to, args.until_latest)?;
    let config = BatchRunnerConfig {
        jobs,
        engine,
        data_dir: args.data.clone(),
        output_root: args.out.clone(),
        format: args.format.into(),
        threads: args.threads,
    };
    let summary = run_batch(&config)?;
    println!(
        "batch {} periods -> {}/{}/{} ok/incomplete/fail",
        summary.jobs.len(),
        summary.success,
        summary.incomplete,
        summary.failure
    );

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "PERIOD\tSTATUS\tROWS\tUNRESOLVED\tWARNINGS\tERROR")?;
    for record in &summary.jobs {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}",
            record.job_id,
            record.status.as_str(),
            record.rows,
            record.unresolved,
            record.warnings,
            record.error.as_deref().unwrap_or("")
        )?;
    }
    writer.flush()?;
    println!("manifest: {}", summary.manifest_path.display());

    if summary.failure > 0 {
        return Err(anyhow!("{} period(s) failed", summary.failure));
    }
    Ok(())
}
