// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Runtime orchestration: the LM concurrency ceiling, storage retry
//! policy, the per-stage executor, and the batch pipeline that drives
//! them (`spec.md` §4.3, §5).

pub mod db_retry;
pub mod normalization_pipeline;
pub mod stage_executor;
pub mod worker_pool;

pub use db_retry::with_retry;
pub use normalization_pipeline::{NormalizationPipeline, PipelineRunSummary};
pub use stage_executor::StageExecutor;
pub use worker_pool::{LmWorkerPool, MAX_LM_CONCURRENCY};
