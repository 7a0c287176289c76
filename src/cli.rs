use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    chart::{BirthInput, GeoTimeContext},
    insight::ConversationTurn,
};

const USAGE: &str = "usage: natal-insight [--config <path>] --request <path>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub config_path: PathBuf,
    pub request_path: PathBuf,
}

impl CliArgs {
    pub fn from_env() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current working directory")?;
        Self::parse(env::args().skip(1), &cwd)
    }

    /// `--config` defaults to `natal.jsonc` in `cwd`; `--request` is required.
    pub fn parse(args: impl IntoIterator<Item = String>, cwd: &Path) -> Result<Self> {
        let mut config_path = None;
        let mut request_path = None;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let slot = match arg.as_str() {
                "--config" | "-c" => &mut config_path,
                "--request" | "-r" => &mut request_path,
                other => return Err(anyhow!("unknown argument: {other}. {USAGE}")),
            };
            let value = args
                .next()
                .ok_or_else(|| anyhow!("{arg} expects a path. {USAGE}"))?;
            if slot.replace(PathBuf::from(value)).is_some() {
                return Err(anyhow!("{arg} given more than once. {USAGE}"));
            }
        }

        Ok(Self {
            config_path: config_path.unwrap_or_else(|| cwd.join("natal.jsonc")),
            request_path: request_path.ok_or_else(|| anyhow!("missing --request. {USAGE}"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubjectInput {
    pub birth: BirthInput,
    pub geo: GeoTimeContext,
}

/// JSON document read from `--request`. Unset chart options fall back to the `chart` config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportRequestFile {
    pub birth: BirthInput,
    pub geo: GeoTimeContext,
    #[serde(default)]
    pub partner: Option<SubjectInput>,
    #[serde(default)]
    pub house_system: Option<String>,
    #[serde(default)]
    pub ayanamsa: Option<String>,
    /// Analysis kind; without it only the chart is printed.
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    #[serde(default)]
    pub transit_date: Option<NaiveDate>,
    #[serde(default)]
    pub caller_id: Option<String>,
}

impl ReportRequestFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read request {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse request {}", path.display()))
    }
}
