// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Normalizer Domain
//!
//! The domain layer of the catalog normalization platform: entities,
//! value objects, aggregates, domain services (as trait contracts),
//! repository contracts, and domain events. Nothing in this crate
//! depends on tokio, sqlx, axum, or reqwest — infrastructure concerns
//! live in the `normalizer` crate and are wired against these traits.

pub mod aggregates;
pub mod entities;
pub mod error;
pub mod events;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use error::NormalizationError;
pub use value_objects::{
    BenchmarkId, CatalogId, CatalogItemId, CodeLevel, CodeNodeId, Confidence, ConstantId,
    GenericId, GroupId, IdCategory, NormalizedRecordId, OpaqueXml, ProcessingLevel,
    ProcessingMethod, SessionId, Stage, StageOutcome, UploadId,
};

pub use entities::benchmark::Benchmark;
pub use entities::catalog::Catalog;
pub use entities::catalog_item::CatalogItem;
pub use entities::code_tree_node::CodeTreeNode;
pub use entities::constant::Constant;
pub use entities::group::Group;
pub use entities::normalized_record::NormalizedRecord;
pub use entities::pipeline_session::{PipelineSession, SessionPhase};
pub use entities::upload::{Upload, UploadStatus};
