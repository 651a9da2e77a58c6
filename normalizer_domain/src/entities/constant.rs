// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Name/synonym/type/value tuple attached to an upload. `value` may
//! carry nested XML, preserved verbatim (`spec.md` §3).

use serde::{Deserialize, Serialize};

use crate::{ConstantId, OpaqueXml, UploadId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constant {
    id: ConstantId,
    upload_id: UploadId,
    name: String,
    synonym: Option<String>,
    type_: String,
    value: OpaqueXml,
}

impl Constant {
    pub fn new(
        upload_id: UploadId,
        name: impl Into<String>,
        synonym: Option<String>,
        type_: impl Into<String>,
        value: OpaqueXml,
    ) -> Self {
        Self { id: ConstantId::new(), upload_id, name: name.into(), synonym, type_: type_.into(), value }
    }

    /// Rebuilds a constant from already-persisted state, preserving its
    /// original id.
    pub fn reconstitute(
        id: ConstantId,
        upload_id: UploadId,
        name: String,
        synonym: Option<String>,
        type_: String,
        value: OpaqueXml,
    ) -> Self {
        Self { id, upload_id, name, synonym, type_, value }
    }

    pub fn id(&self) -> &ConstantId {
        &self.id
    }

    pub fn upload_id(&self) -> &UploadId {
        &self.upload_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn synonym(&self) -> Option<&str> {
        self.synonym.as_deref()
    }

    pub fn type_name(&self) -> &str {
        &self.type_
    }

    pub fn value(&self) -> &OpaqueXml {
        &self.value
    }
}
