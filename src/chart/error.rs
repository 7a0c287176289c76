use std::fmt;

use thiserror::Error;

use crate::chart::types::{Body, HouseSystem};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidTimeError {
    #[error("malformed date '{0}', expected YYYY-MM-DD")]
    MalformedDate(String),
    #[error("malformed time '{0}', expected HH:MM (24h)")]
    MalformedTime(String),
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),
    #[error("local time {local} has no UTC mapping in timezone '{timezone}'")]
    Unmappable { local: String, timezone: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EphemerisError {
    #[error("julian day {jd} is outside the supported range [{start}, {end})")]
    OutOfRange { jd: f64, start: f64, end: f64 },
    #[error("body {0} cannot be resolved by the oracle")]
    UnresolvableBody(Body),
    #[error("house system {system} is undefined at latitude {latitude}")]
    HousesUndefined { system: HouseSystem, latitude: f64 },
    #[error("oracle failure: {0}")]
    Oracle(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported house system '{0}'")]
pub struct UnsupportedHouseSystemError(pub String);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    #[error(transparent)]
    InvalidTime(#[from] InvalidTimeError),
    #[error(transparent)]
    Ephemeris(#[from] EphemerisError),
    #[error(transparent)]
    UnsupportedHouseSystem(#[from] UnsupportedHouseSystemError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub fn invalid_input(message: impl Into<String>) -> ChartError {
    ChartError::InvalidInput(message.into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyStage {
    Validation,
    TimeResolution,
    Positions,
    Houses,
}

impl AssemblyStage {
    pub fn as_str(self) -> &'static str {
        match self {
            AssemblyStage::Validation => "validation",
            AssemblyStage::TimeResolution => "time_resolution",
            AssemblyStage::Positions => "positions",
            AssemblyStage::Houses => "houses",
        }
    }
}

impl fmt::Display for AssemblyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chart that could not be built. No partial snapshot ever escapes alongside it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("chart assembly failed during {stage}: {source}")]
pub struct ChartAssemblyError {
    pub stage: AssemblyStage,
    pub source: ChartError,
}

impl ChartAssemblyError {
    pub fn new(stage: AssemblyStage, source: impl Into<ChartError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    pub fn cause(&self) -> &ChartError {
        &self.source
    }
}
