//! TOML engine configuration.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use wfa_core::EngineConfig;

/// Load and validate an engine configuration file.
///
/// Curve-table paths in `[tables]` are resolved against the directory that
/// holds the configuration file.
pub fn load_engine_config(path: &Path) -> Result<EngineConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading engine config '{}'", path.display()))?;
    let mut config = parse_engine_config(&raw)
        .with_context(|| format!("parsing engine config '{}'", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    resolve_against(&mut config.tables.power_curve, base);
    resolve_against(&mut config.tables.seasonal_factors, base);
    resolve_against(&mut config.tables.wind_distribution, base);

    config
        .validate()
        .with_context(|| format!("validating engine config '{}'", path.display()))?;
    debug!(
        path = %path.display(),
        turbines = config.farm.turbines().len(),
        wake = config.farm.wake.is_some(),
        "engine config loaded"
    );
    Ok(config)
}

/// Parse without validating or resolving paths.
pub fn parse_engine_config(raw: &str) -> Result<EngineConfig> {
    toml::from_str(raw).context("deserializing TOML")
}

/// Effective configuration rendered back to TOML.
pub fn render_engine_config(config: &EngineConfig) -> Result<String> {
    toml::to_string_pretty(config).context("serializing engine config to TOML")
}

fn resolve_against(path: &mut Option<PathBuf>, base: &Path) {
    if let Some(p) = path.as_mut() {
        if p.is_relative() {
            *p = base.join(&*p);
        }
    }
}
