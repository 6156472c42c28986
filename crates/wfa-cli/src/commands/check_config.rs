use anyhow::Result;
use std::path::Path;
use tracing::info;
use wfa_io::{load_engine_config, render_engine_config};

pub fn handle(config: &Path) -> Result<()> {
    let engine = load_engine_config(config)?;
    info!(
        turbines = engine.farm.turbines().len(),
        wake = engine.farm.wake.is_some(),
        "configuration is valid"
    );
    print!("{}", render_engine_config(&engine)?);
    Ok(())
}
