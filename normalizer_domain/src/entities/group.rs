// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! An equivalence class over normalized items produced by duplicate
//! detection (`spec.md` §3, §4.5). `master_item_id` is a weak
//! reference: it names a [`crate::NormalizedRecordId`] but the group
//! does not own that record's lifecycle.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{GroupId, NormalizedRecordId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    id: GroupId,
    group_key: String,
    refined_group_id: Option<GroupId>,
    merged_count: u32,
    master_item_id: Option<NormalizedRecordId>,
    member_ids: HashSet<NormalizedRecordId>,
}

impl Group {
    pub fn new(group_key: impl Into<String>, members: impl IntoIterator<Item = NormalizedRecordId>) -> Self {
        Self {
            id: GroupId::new(),
            group_key: group_key.into(),
            refined_group_id: None,
            merged_count: 1,
            master_item_id: None,
            member_ids: members.into_iter().collect(),
        }
    }

    /// Rebuilds a group from already-persisted state, preserving its
    /// original id/refinement link/merge count.
    pub fn reconstitute(
        id: GroupId,
        group_key: String,
        refined_group_id: Option<GroupId>,
        merged_count: u32,
        master_item_id: Option<NormalizedRecordId>,
        member_ids: HashSet<NormalizedRecordId>,
    ) -> Self {
        Self { id, group_key, refined_group_id, merged_count, master_item_id, member_ids }
    }

    pub fn id(&self) -> &GroupId {
        &self.id
    }

    pub fn group_key(&self) -> &str {
        &self.group_key
    }

    pub fn refined_group_id(&self) -> Option<&GroupId> {
        self.refined_group_id.as_ref()
    }

    pub fn merged_count(&self) -> u32 {
        self.merged_count
    }

    pub fn master_item_id(&self) -> Option<&NormalizedRecordId> {
        self.master_item_id.as_ref()
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &NormalizedRecordId> {
        self.member_ids.iter()
    }

    pub fn size(&self) -> usize {
        self.member_ids.len()
    }

    pub fn contains(&self, item: &NormalizedRecordId) -> bool {
        self.member_ids.contains(item)
    }

    pub fn set_refined_group(&mut self, refined: GroupId) {
        self.refined_group_id = Some(refined);
    }

    pub fn set_master(&mut self, master: NormalizedRecordId) {
        self.master_item_id = Some(master);
    }

    /// Unions another group's members into this one. The union of
    /// member ids is preserved per `spec.md` §3's merge invariant, and
    /// `merged_count` tracks how many detection passes contributed to
    /// this group (used to prioritize downstream work, §4.3).
    pub fn merge(&mut self, other: &Group) {
        for member in &other.member_ids {
            self.member_ids.insert(member.clone());
        }
        self.merged_count += other.merged_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_unifies_member_sets() {
        let a_member = NormalizedRecordId::new();
        let b_member = NormalizedRecordId::new();
        let shared = NormalizedRecordId::new();

        let mut group_a = Group::new("key", [a_member.clone(), shared.clone()]);
        let group_b = Group::new("key", [b_member.clone(), shared.clone()]);

        group_a.merge(&group_b);

        assert_eq!(group_a.size(), 3);
        assert!(group_a.contains(&a_member));
        assert!(group_a.contains(&b_member));
        assert!(group_a.contains(&shared));
        assert_eq!(group_a.merged_count(), 2);
    }
}
