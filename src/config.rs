use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    chart::{Ayanamsa, HouseSystem},
    insight::InsightConfig,
};

const SCHEMA_FILE_NAME: &str = "natal.schema.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub insight: InsightConfig,
    #[serde(default)]
    pub usage_ledger: UsageLedgerConfig,
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/natal")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_retention_days() -> usize {
    14
}

fn default_stderr_warn_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    #[default]
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default)]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_stderr_warn_enabled")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: LoggingRotation::default(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: default_stderr_warn_enabled(),
        }
    }
}

fn default_house_system() -> HouseSystem {
    HouseSystem::Placidus
}

/// Fallbacks for requests that leave the house system or zodiac unspecified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_house_system")]
    pub default_house_system: HouseSystem,
    /// Absent means tropical.
    #[serde(default)]
    pub default_ayanamsa: Option<Ayanamsa>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            default_house_system: default_house_system(),
            default_ayanamsa: None,
        }
    }
}

fn default_usage_ledger_path() -> PathBuf {
    PathBuf::from("./state/usage.jsonl")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLedgerConfig {
    #[serde(default = "default_usage_ledger_path")]
    pub path: PathBuf,
}

impl Default for UsageLedgerConfig {
    fn default() -> Self {
        Self {
            path: default_usage_ledger_path(),
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let value: Value = json5::from_str(&raw)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema_path = schema_path_for(config_dir, &value)?;
        validate(&value, &schema_path)?;

        let mut config: Config =
            serde_json::from_value(value).context("failed to deserialize natal config")?;
        config.usage_ledger.path = anchor(config_dir, &config.usage_ledger.path);
        Ok(config)
    }
}

fn anchor(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn schema_path_for(config_dir: &Path, value: &Value) -> Result<PathBuf> {
    if let Some(declared) = value.get("$schema").and_then(Value::as_str) {
        return Ok(anchor(config_dir, Path::new(declared)));
    }

    let sibling = config_dir.join(SCHEMA_FILE_NAME);
    if sibling.exists() {
        return Ok(sibling);
    }
    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config or {} next to it",
        SCHEMA_FILE_NAME
    ))
}

fn validate(value: &Value, schema_path: &Path) -> Result<()> {
    let schema_text = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_text)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;
    let compiled =
        JSONSchema::compile(&schema).map_err(|err| anyhow!("failed to compile schema: {err}"))?;

    let result = compiled.validate(value);
    if let Err(errors) = result {
        let messages: Vec<String> = errors
            .map(|error| format!("{} at '{}'", error, error.instance_path))
            .collect();
        return Err(anyhow!("config validation failed: {}", messages.join("; ")));
    }
    Ok(())
}
