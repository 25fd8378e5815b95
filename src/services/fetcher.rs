// src/services/fetcher.rs

//! Resilient fetcher.
//!
//! Each attempt is classified by [`RetryPolicy::classify`], a pure function of
//! the attempt outcome and index. The fetcher only sleeps and loops on its
//! decision.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;
use crate::services::transport::{HttpSession, PayloadKind, RawResponse};
use crate::utils::pacing::{DelayRange, Sleeper};

/// What one attempt produced.
#[derive(Debug)]
pub enum AttemptOutcome {
    Response(RawResponse),
    TransportError(AppError),
}

/// What to do after an attempt.
#[derive(Debug)]
pub enum Decision {
    /// Body is usable
    Success(String),
    /// Soft failure; wait and try again
    RetryAfter { delay: DelayRange, reason: String },
    /// Soft failure on the last attempt
    Exhausted { reason: String },
    /// Stop immediately with this error
    Fatal(AppError),
}

/// Retry budget and delay policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_markup_bytes: usize,
    pub min_api_bytes: usize,
    /// Wait after a 403
    pub forbidden_delay: DelayRange,
    /// Wait after a 429
    pub rate_limit_delay: DelayRange,
    /// Wait after transport errors, 5xx, short bodies and other statuses
    pub backoff_delay: DelayRange,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_markup_bytes: 1000,
            min_api_bytes: 2,
            forbidden_delay: DelayRange::new(2000, 6000),
            rate_limit_delay: DelayRange::fixed(10_000),
            backoff_delay: DelayRange::new(2000, 4000),
        }
    }
}

impl RetryPolicy {
    /// Policy with budgets taken from crawler settings.
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            min_markup_bytes: config.min_markup_bytes,
            min_api_bytes: config.min_api_bytes,
            ..Self::default()
        }
    }

    fn min_bytes(&self, kind: PayloadKind) -> usize {
        match kind {
            PayloadKind::Markup => self.min_markup_bytes,
            PayloadKind::Api => self.min_api_bytes,
        }
    }

    /// Classify one attempt. `attempt` is zero-based.
    pub fn classify(
        &self,
        url: &str,
        kind: PayloadKind,
        outcome: AttemptOutcome,
        attempt: u32,
    ) -> Decision {
        let last = attempt + 1 >= self.max_attempts;

        let (delay, reason) = match outcome {
            AttemptOutcome::TransportError(error) => {
                if last {
                    return Decision::Fatal(error);
                }
                (self.backoff_delay, format!("transport error: {error}"))
            }
            AttemptOutcome::Response(response) => match response.status {
                200 if response.body.len() >= self.min_bytes(kind) => {
                    return Decision::Success(response.body);
                }
                200 => (
                    self.backoff_delay,
                    format!("suspiciously short body ({} bytes)", response.body.len()),
                ),
                403 => (self.forbidden_delay, "status 403 (blocked)".to_string()),
                429 => (self.rate_limit_delay, "status 429 (rate limited)".to_string()),
                status @ 500..=599 => (self.backoff_delay, format!("status {status}")),
                status => {
                    if last {
                        return Decision::Fatal(AppError::FetchStatus {
                            url: url.to_string(),
                            status,
                        });
                    }
                    (self.backoff_delay, format!("status {status}"))
                }
            },
        };

        if last {
            Decision::Exhausted { reason }
        } else {
            Decision::RetryAfter { delay, reason }
        }
    }
}

/// GETs payloads through a session with bounded retries.
pub struct Fetcher {
    session: Arc<dyn HttpSession>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(session: Arc<dyn HttpSession>, sleeper: Arc<dyn Sleeper>, policy: RetryPolicy) -> Self {
        Self {
            session,
            sleeper,
            policy,
        }
    }

    /// Fetch one payload, retrying soft failures.
    ///
    /// Errors with `FetchExhausted` when every attempt soft-failed, with
    /// `FetchStatus` for a non-retryable status on the last attempt, and with
    /// the transport error itself when the last attempt failed at the network
    /// level.
    pub async fn fetch(&self, url: &str, kind: PayloadKind) -> Result<String> {
        let mut attempt = 0;
        loop {
            let outcome = match self.session.get(url, kind, attempt).await {
                Ok(response) => AttemptOutcome::Response(response),
                Err(error) if error.is_transport() => AttemptOutcome::TransportError(error),
                Err(error) => return Err(error),
            };

            match self.policy.classify(url, kind, outcome, attempt) {
                Decision::Success(body) => {
                    log::debug!("Fetched {} ({} bytes, attempt {})", url, body.len(), attempt + 1);
                    return Ok(body);
                }
                Decision::RetryAfter { delay, reason } => {
                    let wait = delay.pick();
                    log::warn!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt + 1,
                        self.policy.max_attempts,
                        url,
                        reason,
                        wait
                    );
                    self.sleeper.sleep(wait).await;
                }
                Decision::Exhausted { reason } => {
                    log::warn!("Giving up on {} after {} attempt(s): {}", url, attempt + 1, reason);
                    return Err(AppError::FetchExhausted {
                        url: url.to_string(),
                        attempts: attempt + 1,
                        reason,
                    });
                }
                Decision::Fatal(error) => {
                    log::error!("Fetch of {} failed: {}", url, error);
                    return Err(error);
                }
            }
            attempt += 1;
        }
    }
}
