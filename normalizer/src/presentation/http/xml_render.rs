// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Renders catalog entities back to XML fragments for `GET .../data`
//! and `GET .../stream`. `attributes`/`table_parts`/constant `value`
//! are [`normalizer_domain::OpaqueXml`] and are embedded verbatim —
//! they were never parsed on the way in, so they are never
//! re-serialized on the way out (`spec.md` §9). Only the plain string
//! fields around them go through [`quick_xml::escape::escape`].

use quick_xml::escape::escape;

use normalizer_domain::{CatalogItem, Constant};

pub fn render_constant_xml(constant: &Constant) -> String {
    let synonym = constant
        .synonym()
        .map(|s| format!(r#" synonym="{}""#, escape(s)))
        .unwrap_or_default();
    format!(
        r#"<item type="constant" id="{id}" name="{name}"{synonym}><type>{type_name}</type><value>{value}</value></item>"#,
        id = constant.id(),
        name = escape(constant.name()),
        synonym = synonym,
        type_name = escape(constant.type_name()),
        value = constant.value().as_str(),
    )
}

pub fn render_catalog_item_xml(item: &CatalogItem, catalog_name: &str) -> String {
    let code = item.code().map(|c| format!(r#" code="{}""#, escape(c))).unwrap_or_default();
    format!(
        r#"<item type="catalog_item" id="{id}" catalog_name="{catalog_name}" reference="{reference}"{code}><name>{name}</name><attributes>{attributes}</attributes><table_parts>{table_parts}</table_parts></item>"#,
        id = item.id(),
        catalog_name = escape(catalog_name),
        reference = escape(item.reference()),
        code = code,
        name = escape(item.name()),
        attributes = item.attributes().as_str(),
        table_parts = item.table_parts().as_str(),
    )
}

/// Terminal event for `GET .../stream` (`spec.md` §6: the stream ends
/// with a sentinel the client can use to stop reading).
pub const STREAM_COMPLETE_XML: &str = r#"<item type="complete"></item>"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_plain_fields_but_not_opaque_fragments() {
        let constant = Constant::new(
            normalizer_domain::UploadId::new(),
            "A & B".to_string(),
            None,
            "string".to_string(),
            normalizer_domain::OpaqueXml::from_raw("<v>raw &amp; kept</v>".to_string()),
        );
        let xml = render_constant_xml(&constant);
        assert!(xml.contains("A &amp; B"));
        assert!(xml.contains("<v>raw &amp; kept</v>"));
    }
}
