// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Immutable domain value objects: identifiers, the stage state machine's
//! column group, confidence scores, opaque XML fragments, and the
//! classifier's code-tree/processing-method vocabulary.

pub mod code_level;
pub mod confidence;
pub mod generic_id;
pub mod opaque_xml;
pub mod processing_method;
pub mod stage;

pub use code_level::CodeLevel;
pub use confidence::Confidence;
pub use generic_id::{
    BenchmarkId, CatalogId, CatalogItemId, CodeNodeId, ConstantId, GenericId, GroupId, IdCategory,
    NormalizedRecordId, SessionId, UploadId,
};
pub use opaque_xml::OpaqueXml;
pub use processing_method::{ProcessingLevel, ProcessingMethod};
pub use stage::{Stage, StageOutcome};
