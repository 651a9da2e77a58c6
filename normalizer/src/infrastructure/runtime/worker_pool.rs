// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # LM Worker Pool
//!
//! Global concurrency ceiling for calls into the language-model
//! completion service (`spec.md` §4.6 "Concurrency ceiling", §5). The
//! LM provider permits at most two concurrent calls per process, so a
//! single process-wide [`tokio::sync::Semaphore`] gates every call
//! regardless of how many records are in flight upstream — the same
//! two-level governance pattern the teacher crate uses for CPU/IO
//! tokens, narrowed here to a single resource class with a hard cap.

use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::warn;

use normalizer_domain::NormalizationError;

/// The LM provider's own concurrency limit (`spec.md` §4.6).
pub const MAX_LM_CONCURRENCY: usize = 2;

/// Caps LM calls across the whole process at `min(configured, 2)`.
/// Callers beyond the cap queue FIFO on [`LmWorkerPool::acquire`].
pub struct LmWorkerPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl LmWorkerPool {
    pub fn new(configured: usize) -> Self {
        let capacity = configured.clamp(1, MAX_LM_CONCURRENCY);
        if configured > MAX_LM_CONCURRENCY {
            warn!(configured, clamped = capacity, "lm worker pool size clamped to provider concurrency limit");
        }
        Self { permits: Arc::new(Semaphore::new(capacity)), capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Waits for a free LM slot. The returned permit releases the slot
    /// on drop.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, NormalizationError> {
        self.permits.acquire().await.map_err(|_| NormalizationError::internal_error("lm worker pool closed"))
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_configured_size_above_provider_limit() {
        let pool = LmWorkerPool::new(8);
        assert_eq!(pool.capacity(), MAX_LM_CONCURRENCY);
    }

    #[test]
    fn zero_configured_floors_to_one() {
        let pool = LmWorkerPool::new(0);
        assert_eq!(pool.capacity(), 1);
    }

    #[tokio::test]
    async fn acquire_blocks_beyond_capacity() {
        let pool = LmWorkerPool::new(1);
        let first = pool.acquire().await.unwrap();
        assert_eq!(pool.available_permits(), 0);
        drop(first);
        assert_eq!(pool.available_permits(), 1);
    }
}
