use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;
use tabwriter::TabWriter;
use wfa_algo::availability::summarize_rows;
use wfa_algo::{farm_total, AvailabilitySummary};
use wfa_cli::cli::SummaryFormat;
use wfa_io::read_ledger_csv;

pub fn handle(ledger: &Path, format: SummaryFormat) -> Result<()> {
    let rows = read_ledger_csv(ledger)?;
    let summaries = summarize_rows(&rows);
    match format {
        SummaryFormat::Plain => print_summary_table(&summaries),
        SummaryFormat::Json => {
            serde_json::to_writer_pretty(io::stdout(), &summaries)
                .context("serializing summaries to JSON")?;
            println!();
            Ok(())
        }
    }
}

fn ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn write_row(writer: &mut impl Write, label: &str, s: &AvailabilitySummary) -> io::Result<()> {
    writeln!(
        writer,
        "{}\t{}\t{}\t{:.1}\t{:.1}\t{:.1}\t{}\t{}\t{}",
        label,
        s.bins,
        s.unresolved_bins,
        s.produced,
        s.potential,
        s.loss_total,
        ratio(s.maa_gross),
        ratio(s.maa_gross_misassigned),
        ratio(s.maa_unattributed_adjusted),
    )
}

/// Per-turbine table followed by the farm total.
pub fn print_summary_table(summaries: &[AvailabilitySummary]) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(
        writer,
        "TURBINE\tBINS\tUNRESOLVED\tPRODUCED kWh\tPOTENTIAL kWh\tLOSS kWh\tMAA GROSS\tMAA MISASSIGNED\tMAA ADJUSTED"
    )?;
    for s in summaries {
        write_row(&mut writer, &s.turbine_id.to_string(), s)?;
    }
    write_row(&mut writer, "FARM", &farm_total(summaries))?;
    writer.flush()?;
    Ok(())
}
