// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Stage 2.5's concrete attribute reader: pulls `name`/`value` pairs
//! out of an [`OpaqueXml`] fragment without ever re-serializing it
//! (`spec.md` §4.3 "Attribute extraction", §9 opaque-XML design note).
//! Read-only: the fragment stored on the entity is untouched.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use normalizer_domain::{NormalizationError, OpaqueXml};

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedAttribute {
    pub name: String,
    pub value: String,
}

pub struct XmlAttributeExtractor;

impl XmlAttributeExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Walks every `<attr>` element in the fragment, reading its
    /// `name` attribute and inner text as the value. Malformed
    /// fragments surface as [`NormalizationError::XmlError`] rather
    /// than panicking, so a single bad row fails its own stage without
    /// crashing the pipeline (`spec.md` §7).
    pub fn extract(&self, fragment: &OpaqueXml) -> Result<Vec<ExtractedAttribute>, NormalizationError> {
        if fragment.is_empty() {
            return Ok(Vec::new());
        }

        let mut reader = Reader::from_str(fragment.as_str());
        reader.config_mut().trim_text = true;

        let mut attributes = Vec::new();
        let mut current_name: Option<String> = None;
        let mut buffer = Vec::new();

        loop {
            match reader.read_event_into(&mut buffer) {
                Ok(Event::Start(tag)) if tag.name().as_ref() == b"attr" => {
                    current_name = tag
                        .attributes()
                        .flatten()
                        .find(|attribute| attribute.key.as_ref() == b"name")
                        .and_then(|attribute| attribute.unescape_value().ok().map(|v| v.into_owned()));
                }
                Ok(Event::Text(text)) => {
                    if let Some(name) = current_name.take() {
                        let value = text
                            .unescape()
                            .map_err(|e| NormalizationError::XmlError(format!("invalid attribute text: {e}")))?
                            .into_owned();
                        attributes.push(ExtractedAttribute { name, value });
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(NormalizationError::XmlError(format!("malformed attribute fragment: {e}"))),
            }
            buffer.clear();
        }

        Ok(attributes)
    }
}

impl Default for XmlAttributeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_name_value_pairs() {
        let extractor = XmlAttributeExtractor::new();
        let fragment = OpaqueXml::from_raw(r#"<attrs><attr name="color">blue</attr><attr name="size">L</attr></attrs>"#);
        let attributes = extractor.extract(&fragment).unwrap();
        assert_eq!(attributes, vec![
            ExtractedAttribute { name: "color".to_string(), value: "blue".to_string() },
            ExtractedAttribute { name: "size".to_string(), value: "L".to_string() },
        ]);
    }

    #[test]
    fn empty_fragment_yields_no_attributes() {
        let extractor = XmlAttributeExtractor::new();
        assert!(extractor.extract(&OpaqueXml::from_raw("")).unwrap().is_empty());
    }

    #[test]
    fn malformed_xml_is_reported_not_panicked() {
        let extractor = XmlAttributeExtractor::new();
        let fragment = OpaqueXml::from_raw("<attr name=\"x\">unterminated");
        assert!(extractor.extract(&fragment).is_err());
    }
}
