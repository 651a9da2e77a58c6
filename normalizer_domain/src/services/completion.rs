// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The abstract language-model capability (`spec.md` §1, §4.7). The
//! domain depends only on this trait; rate limiting, circuit breaking,
//! retry, and the concrete HTTP transport are infrastructure concerns
//! layered on top of an implementation in the `normalizer` crate.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::NormalizationError;

#[async_trait]
pub trait Completion: Send + Sync {
    /// Cancellation propagates into the in-flight request: if `cancel`
    /// fires mid-call, implementations MUST abort the transport and
    /// return `NormalizationError::Cancelled`.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        cancel: CancellationToken,
    ) -> Result<String, NormalizationError>;
}
