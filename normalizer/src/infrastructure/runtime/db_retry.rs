// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Bounded exponential backoff for storage calls (`spec.md` §5:
//! 50/100/200/400/800ms over five attempts, each capped at 10s).
//! SQLite under a writer-serialized workload surfaces transient
//! `database is locked` errors that a short retry clears without
//! surfacing to the caller.

use std::time::Duration;
use tracing::warn;

use normalizer_domain::NormalizationError;

const DELAYS_MS: [u64; 5] = [50, 100, 200, 400, 800];
const PER_ATTEMPT_CAP_SECS: u64 = 10;

/// Retries `op` up to `DELAYS_MS.len() + 1` times while
/// [`NormalizationError::is_recoverable`] holds, backing off between
/// attempts. The final attempt's error (recoverable or not) is
/// returned as-is.
pub async fn with_retry<T, F, Fut>(operation: &str, mut op: F) -> Result<T, NormalizationError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, NormalizationError>>,
{
    let mut attempt = 0usize;
    loop {
        let call = tokio::time::timeout(Duration::from_secs(PER_ATTEMPT_CAP_SECS), op()).await;
        let result = match call {
            Ok(result) => result,
            Err(_) => Err(NormalizationError::Timeout(format!("{operation} exceeded {PER_ATTEMPT_CAP_SECS}s"))),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(err) if err.is_recoverable() && attempt < DELAYS_MS.len() => {
                warn!(operation, attempt, error = %err, "retrying after transient storage error");
                tokio::time::sleep(Duration::from_millis(DELAYS_MS[attempt])).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let result = with_retry("test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(NormalizationError::DatabaseError("locked".to_string()))
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_recoverable_errors_do_not_retry() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = with_retry("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(NormalizationError::ValidationError("bad input".to_string()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
