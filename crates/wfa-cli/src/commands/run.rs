use anyhow::{anyhow, Context, Result};
use std::fs;
use tracing::{info, warn};
use wfa_algo::{compute_ledger, summarize};
use wfa_batch::jobs_for_months;
use wfa_cli::cli::RunArgs;
use wfa_io::period::month_from_counters;
use wfa_io::{
    load_engine_config, write_diagnostics, write_ledger, write_summary, DataDir, LoadedTables,
};

use super::summary::print_summary_table;

pub fn handle(args: &RunArgs) -> Result<()> {
    let config = load_engine_config(&args.config)?;
    let job = jobs_for_months(&args.month, &args.month, args.until_latest)?
        .pop()
        .ok_or_else(|| anyhow!("no period for month '{}'", args.month))?;
    let tables = LoadedTables::load(&DataDir::new(&args.data), &config)?;
    let period = month_from_counters(job.year, job.month, &tables.telemetry, job.until_latest)?;

    let ledger = compute_ledger(&tables.inputs_for(period), &config)
        .with_context(|| format!("computing ledger for {}", job.label()))?;

    fs::create_dir_all(&args.out)
        .with_context(|| format!("creating output directory '{}'", args.out.display()))?;
    let ext = wfa_batch::OutputFormat::from(args.format).extension();
    let summaries = summarize(&ledger);
    write_ledger(&ledger, &args.out.join(format!("ledger.{ext}")))?;
    write_summary(&summaries, &args.out.join(format!("summary.{ext}")))?;
    write_diagnostics(&ledger.diagnostics, &args.out.join("diagnostics.json"))?;

    println!(
        "ledger {} -> {} rows, {} unresolved ({})",
        job.label(),
        ledger.rows.len(),
        ledger.unresolved.len(),
        ledger.diagnostics.summary()
    );
    print_summary_table(&summaries)?;

    if !ledger.is_complete() {
        warn!(
            unresolved = ledger.unresolved.len(),
            "some rows have no potential energy"
        );
        if args.strict {
            ledger.ensure_resolved()?;
        }
    }
    info!(out = %args.out.display(), "run finished");
    Ok(())
}
