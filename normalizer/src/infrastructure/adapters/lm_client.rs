// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! HTTP-backed [`Completion`] (`spec.md` §4.7): a `reqwest` client
//! wrapped with a `governor` rate limiter, a hand-rolled circuit
//! breaker, bounded retry with exponential backoff, and a per-request
//! deadline. Cancellation propagates through a [`CancellationToken`]
//! via `tokio::select!`, per the trait's contract.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use normalizer_domain::services::completion::Completion;
use normalizer_domain::NormalizationError;

#[derive(Debug, Clone)]
pub struct LmClientConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub rate_limit_per_min: u32,
    pub max_retries: u32,
    pub breaker_failure_threshold: u32,
    pub breaker_reset_secs: u64,
}

impl Default for LmClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: String::new(),
            timeout_secs: 60,
            rate_limit_per_min: 60,
            max_retries: 3,
            breaker_failure_threshold: 5,
            breaker_reset_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Consecutive-failure circuit breaker: opens after
/// `failure_threshold` consecutive failures, stays open for
/// `reset_timeout`, then allows a limited number of half-open probes
/// before re-closing (`spec.md` §4.7).
struct CircuitBreaker {
    state: Mutex<BreakerState>,
    consecutive_failures: AtomicU32,
    half_open_successes: AtomicU32,
    opened_at: Mutex<Option<Instant>>,
    failure_threshold: u32,
    reset_timeout: Duration,
    half_open_success_threshold: u32,
}

impl CircuitBreaker {
    fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(BreakerState::Closed),
            consecutive_failures: AtomicU32::new(0),
            half_open_successes: AtomicU32::new(0),
            opened_at: Mutex::new(None),
            failure_threshold,
            reset_timeout,
            half_open_success_threshold: 2,
        }
    }

    fn before_call(&self) -> Result<(), NormalizationError> {
        let mut state = self.state.lock();
        match *state {
            BreakerState::Closed => Ok(()),
            BreakerState::HalfOpen => Ok(()),
            BreakerState::Open => {
                let elapsed = self.opened_at.lock().map(|at| at.elapsed()).unwrap_or(Duration::ZERO);
                if elapsed >= self.reset_timeout {
                    *state = BreakerState::HalfOpen;
                    self.half_open_successes.store(0, Ordering::SeqCst);
                    Ok(())
                } else {
                    Err(NormalizationError::CircuitOpen(format!(
                        "LM circuit open, retry in {:?}",
                        self.reset_timeout.saturating_sub(elapsed)
                    )))
                }
            }
        }
    }

    fn on_success(&self) {
        let mut state = self.state.lock();
        match *state {
            BreakerState::Closed => {
                self.consecutive_failures.store(0, Ordering::SeqCst);
            }
            BreakerState::HalfOpen => {
                let successes = self.half_open_successes.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.half_open_success_threshold {
                    *state = BreakerState::Closed;
                    self.consecutive_failures.store(0, Ordering::SeqCst);
                }
            }
            BreakerState::Open => {}
        }
    }

    fn on_failure(&self) {
        let mut state = self.state.lock();
        match *state {
            BreakerState::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= self.failure_threshold {
                    *state = BreakerState::Open;
                    *self.opened_at.lock() = Some(Instant::now());
                }
            }
            BreakerState::HalfOpen => {
                *state = BreakerState::Open;
                *self.opened_at.lock() = Some(Instant::now());
            }
            BreakerState::Open => {}
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

pub struct HttpCompletion {
    client: reqwest::Client,
    config: LmClientConfig,
    limiter: RateLimiter<governor::state::direct::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>,
    breaker: CircuitBreaker,
}

impl HttpCompletion {
    pub fn new(config: LmClientConfig) -> Result<Self, NormalizationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NormalizationError::invalid_config(format!("failed to build LM HTTP client: {e}")))?;

        let per_minute = NonZeroU32::new(config.rate_limit_per_min.max(1)).expect("clamped to at least 1");
        let limiter = RateLimiter::direct(Quota::per_minute(per_minute));
        let breaker = CircuitBreaker::new(config.breaker_failure_threshold, Duration::from_secs(config.breaker_reset_secs));

        Ok(Self { client, config, limiter, breaker })
    }

    async fn send_once(&self, system_prompt: &str, user_prompt: &str) -> Result<String, NormalizationError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(NormalizationError::RateLimited("LM provider returned 429".to_string()));
        }
        if !response.status().is_success() {
            return Err(NormalizationError::ClassifierUnavailable(format!("LM provider returned {}", response.status())));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| NormalizationError::LmMalformedOutput(format!("invalid LM response body: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| NormalizationError::LmMalformedOutput("LM response had no choices".to_string()))
    }
}

fn classify_transport_error(error: &reqwest::Error) -> NormalizationError {
    if error.is_timeout() {
        NormalizationError::Timeout(error.to_string())
    } else {
        NormalizationError::ClassifierUnavailable(error.to_string())
    }
}

#[async_trait]
impl Completion for HttpCompletion {
    async fn complete(&self, system_prompt: &str, user_prompt: &str, cancel: CancellationToken) -> Result<String, NormalizationError> {
        self.breaker.before_call()?;

        tokio::select! {
            _ = cancel.cancelled() => return Err(NormalizationError::Cancelled("LM call cancelled before dispatch".to_string())),
            _ = self.limiter.until_ready() => {}
        }

        let mut attempt = 0u32;
        loop {
            let call = self.send_once(system_prompt, user_prompt);
            let outcome = tokio::select! {
                _ = cancel.cancelled() => Err(NormalizationError::Cancelled("LM call cancelled mid-flight".to_string())),
                result = call => result,
            };

            match outcome {
                Ok(text) => {
                    self.breaker.on_success();
                    return Ok(text);
                }
                Err(err) if err.is_recoverable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let backoff = Duration::from_millis(200u64.saturating_mul(1 << attempt));
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(NormalizationError::Cancelled("LM call cancelled during backoff".to_string())),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
                Err(err) => {
                    if !matches!(err, NormalizationError::Timeout(_)) {
                        self.breaker.on_failure();
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaker_opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
        for _ in 0..3 {
            breaker.before_call().unwrap();
            breaker.on_failure();
        }
        assert!(breaker.before_call().is_err());
    }

    #[test]
    fn breaker_half_opens_after_reset_timeout() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.before_call().unwrap();
        breaker.on_failure();
        assert!(breaker.before_call().is_err());
        std::thread::sleep(Duration::from_millis(20));
        assert!(breaker.before_call().is_ok());
        assert_eq!(*breaker.state.lock(), BreakerState::HalfOpen);
    }

    #[test]
    fn breaker_recloses_after_half_open_successes() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(5));
        breaker.before_call().unwrap();
        breaker.on_failure();
        std::thread::sleep(Duration::from_millis(10));
        breaker.before_call().unwrap();
        breaker.on_success();
        breaker.on_success();
        assert_eq!(*breaker.state.lock(), BreakerState::Closed);
    }
}
