use std::time::Duration;

use crate::insight::types::{ModelTier, ReliabilityConfig};

pub const MAX_TOTAL_ATTEMPTS: u32 = 2;

/// Where an insight call stands between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Next attempt uses the plan's model.
    TryPrimary { attempt: u32 },
    /// Next attempt uses the economical model after a high-capability failure.
    TryFallback { attempt: u32 },
    Succeeded { attempts: u32 },
    Failed { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: RetryState,
    /// Wait `backoff_delay(attempt)` before the next attempt.
    pub backoff: bool,
}

impl RetryState {
    pub fn initial() -> Self {
        RetryState::TryPrimary { attempt: 1 }
    }

    pub fn attempt(self) -> Option<u32> {
        match self {
            RetryState::TryPrimary { attempt } | RetryState::TryFallback { attempt } => {
                Some(attempt)
            }
            RetryState::Succeeded { .. } | RetryState::Failed { .. } => None,
        }
    }

    /// Model tier of the pending attempt, `None` once terminal.
    pub fn tier(self, primary: ModelTier) -> Option<ModelTier> {
        match self {
            RetryState::TryPrimary { .. } => Some(primary),
            RetryState::TryFallback { .. } => Some(ModelTier::Economical),
            RetryState::Succeeded { .. } | RetryState::Failed { .. } => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.attempt().is_none()
    }

    /// Pure transition. Any failure moves on while attempts remain: a failed high-capability
    /// attempt downgrades immediately, any other failure retries the same model after a backoff.
    pub fn advance(
        self,
        outcome: AttemptOutcome,
        primary: ModelTier,
        max_attempts: u32,
    ) -> Transition {
        let Some(attempt) = self.attempt() else {
            return Transition {
                next: self,
                backoff: false,
            };
        };

        match outcome {
            AttemptOutcome::Succeeded => Transition {
                next: RetryState::Succeeded { attempts: attempt },
                backoff: false,
            },
            AttemptOutcome::Failed if attempt >= max_attempts.max(1) => Transition {
                next: RetryState::Failed { attempts: attempt },
                backoff: false,
            },
            AttemptOutcome::Failed => {
                let on_high_capability = matches!(self, RetryState::TryPrimary { .. })
                    && primary == ModelTier::HighCapability;
                if on_high_capability {
                    Transition {
                        next: RetryState::TryFallback {
                            attempt: attempt + 1,
                        },
                        backoff: false,
                    }
                } else {
                    let next_attempt = attempt + 1;
                    Transition {
                        next: match self {
                            RetryState::TryFallback { .. } => RetryState::TryFallback {
                                attempt: next_attempt,
                            },
                            _ => RetryState::TryPrimary {
                                attempt: next_attempt,
                            },
                        },
                        backoff: true,
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReliabilityLayer {
    config: ReliabilityConfig,
}

impl ReliabilityLayer {
    pub fn new(config: ReliabilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReliabilityConfig {
        &self.config
    }

    /// Configured budget clamped to `1..=MAX_TOTAL_ATTEMPTS`.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.clamp(1, MAX_TOTAL_ATTEMPTS)
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.config.attempt_timeout()
    }

    /// Delay after failed attempt `attempt` (1-based), exponential and capped.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.backoff_base_ms.max(1) as f64;
        let max = self.config.backoff_max_ms.max(1) as f64;
        let exp = attempt.saturating_sub(1).min(30) as i32;
        let without_jitter = (base * 2f64.powi(exp)).min(max);
        let jitter_factor = 0.9 + (attempt as f64 % 3.0) * 0.05;
        Duration::from_millis((without_jitter * jitter_factor) as u64)
    }
}
