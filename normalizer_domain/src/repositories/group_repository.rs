// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Persistence contract for duplicate-detection groups (`spec.md`
//! §4.5). Merges must be serialized on the affected group set
//! (`spec.md` §5), which this trait exposes as a single atomic
//! `merge` operation rather than separate read-modify-write calls.

use async_trait::async_trait;

use crate::entities::group::Group;
use crate::{GroupId, NormalizationError, NormalizedRecordId};

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn save(&self, group: &Group) -> Result<(), NormalizationError>;

    async fn find_by_id(&self, id: &GroupId) -> Result<Option<Group>, NormalizationError>;

    async fn find_by_member(&self, item_id: &NormalizedRecordId) -> Result<Option<Group>, NormalizationError>;

    /// Priority order for enqueuing downstream work: `merged_count`
    /// DESC (`spec.md` §4.3).
    async fn list_by_priority(&self, limit: u32) -> Result<Vec<Group>, NormalizationError>;

    /// Atomically unions `from` into `into` and removes `from`.
    async fn merge(&self, into: &GroupId, from: &GroupId) -> Result<Group, NormalizationError>;
}
