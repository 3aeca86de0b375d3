//! Run configuration loading.
//!
//! A run configuration names the projection, the grid, the variable being
//! regridded and (optionally) the engine settings:
//!
//! ```yaml
//! projection:
//!   type: lambert
//!   lower_parallel: 33.0
//!   upper_parallel: 45.0
//!   origin_latitude: 40.0
//!   central_longitude: -97.0
//!   major_semiaxis: 6370000.0
//!   minor_semiaxis: 6370000.0
//! grid:
//!   columns: 459
//!   rows: 299
//!   west_edge: -2556000.0
//!   south_edge: -1728000.0
//!   cell_width: 12000.0
//!   cell_height: 12000.0
//! variable:
//!   name: pm25
//!   units: ug/m3
//! regrid:
//!   aggregation_method: mean
//!   minimum_valid_value: ${PM25_MINIMUM:-0.0}
//! ```
//!
//! Supports environment variable substitution using `${VAR}` and
//! `${VAR:-default}` syntax. When the `regrid` section is absent, engine
//! settings come from `REGRID_*` environment variables.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use projection::ProjectionParams;
use regrid_engine::{GridDefinition, RegridConfig, VariableInfo};

/// Everything needed to regrid one variable onto one grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub projection: ProjectionParams,
    pub grid: GridDefinition,
    pub variable: VariableInfo,
    #[serde(default = "RegridConfig::from_env")]
    pub regrid: RegridConfig,
}

/// Load a run configuration from YAML (or JSON for `.json` files).
pub fn load_run_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read run config from {:?}", path))?;

    let expanded = expand_env_vars(&content)?;

    let config: RunConfig = if path.extension().and_then(|s| s.to_str()) == Some("json") {
        serde_json::from_str(&expanded)
            .with_context(|| format!("Failed to parse run config JSON from {:?}", path))?
    } else {
        serde_yaml::from_str(&expanded)
            .with_context(|| format!("Failed to parse run config YAML from {:?}", path))?
    };

    validate_run_config(&config)?;

    Ok(config)
}

fn validate_run_config(config: &RunConfig) -> Result<()> {
    anyhow::ensure!(
        !config.variable.name.trim().is_empty(),
        "Variable name cannot be empty"
    );
    anyhow::ensure!(
        !config.variable.name.contains(char::is_whitespace),
        "Variable name cannot contain whitespace: {:?}",
        config.variable.name
    );
    config
        .regrid
        .validate()
        .context("Invalid regrid settings")?;
    Ok(())
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in configuration text
/// Supports ${VAR} and ${VAR:-default} syntax
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regrid_engine::AggregationMethod;
    use std::io::Write;

    const CONFIG: &str = r#"
projection:
  type: lambert
  lower_parallel: 33.0
  upper_parallel: 45.0
  origin_latitude: 40.0
  central_longitude: -97.0
  major_semiaxis: 6370000.0
  minor_semiaxis: 6370000.0
grid:
  columns: 459
  rows: 299
  west_edge: -2556000.0
  south_edge: -1728000.0
  cell_width: ${REGRID_TEST_CELL:-12000.0}
  cell_height: 12000.0
  vertical:
    kind: sigma
    top_pressure: 10000.0
    levels: [1.0, 0.99, 0.95, 0.85, 0.5, 0.0]
variable:
  name: ozone
  units: ppb
regrid:
  aggregation_method: weighted
  hours_per_period: 24
"#;

    fn write_config(text: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_run_config() {
        std::env::remove_var("REGRID_TEST_CELL");
        let file = write_config(CONFIG, ".yaml");

        let config = load_run_config(file.path()).unwrap();

        assert_eq!(config.projection.name(), "lambert");
        assert_eq!(config.grid.columns, 459);
        assert_eq!(config.grid.cell_width, 12000.0);
        assert!(config.grid.vertical.is_some());
        assert_eq!(config.variable.name, "ozone");
        assert_eq!(config.regrid.aggregation_method, AggregationMethod::Weighted);
        assert_eq!(config.regrid.hours_per_period, 24);
    }

    #[test]
    fn test_invalid_regrid_settings_rejected() {
        let text = CONFIG.replace("hours_per_period: 24", "hours_per_period: 0");
        let file = write_config(&text, ".yaml");
        assert!(load_run_config(file.path()).is_err());
    }

    #[test]
    fn test_load_json_config() {
        let json = r#"{
            "projection": {"type": "identity"},
            "grid": {"columns": 3, "rows": 3, "west_edge": 0.0, "south_edge": 0.0,
                     "cell_width": 10.0, "cell_height": 10.0},
            "variable": {"name": "aod", "units": "-"}
        }"#;
        let file = write_config(json, ".json");

        let config = load_run_config(file.path()).unwrap();

        assert_eq!(config.projection.name(), "identity");
        assert!(config.grid.vertical.is_none());
    }

    #[test]
    fn test_expand_env_vars_simple() {
        std::env::set_var("REGRID_TEST_VAR", "test_value");
        let result = expand_env_vars("prefix_${REGRID_TEST_VAR}_suffix").unwrap();
        assert_eq!(result, "prefix_test_value_suffix");
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        std::env::remove_var("REGRID_NONEXISTENT_VAR");
        let result = expand_env_vars("value_${REGRID_NONEXISTENT_VAR:-default}_end").unwrap();
        assert_eq!(result, "value_default_end");
    }

    #[test]
    fn test_expand_env_vars_missing_required() {
        std::env::remove_var("REGRID_REQUIRED_VAR");
        assert!(expand_env_vars("${REGRID_REQUIRED_VAR}").is_err());
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }

    #[test]
    fn test_resolve_var_expr_override_default() {
        std::env::set_var("REGRID_SET_VAR", "custom");
        assert_eq!(resolve_var_expr("REGRID_SET_VAR:-default").unwrap(), "custom");
    }
}
