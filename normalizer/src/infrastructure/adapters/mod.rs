// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Outbound adapters: the LM HTTP client and the XML attribute reader.

pub mod lm_client;
pub mod xml_attribute_extractor;

pub use lm_client::{HttpCompletion, LmClientConfig};
pub use xml_attribute_extractor::{ExtractedAttribute, XmlAttributeExtractor};
