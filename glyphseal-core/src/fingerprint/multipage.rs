//! Multi-page document fingerprinting.
//!
//! Paginated documents embed the seal on a separate optional-content layer
//! instead of an exclusion zone. Before hashing, every page's content is
//! decoded, stripped of marked-content sections belonging to the seal
//! layer, and re-encoded to a canonical form, so the fingerprint is
//! independent of the seal graphic and of content-stream formatting.
//!
//! The composite cryptographic hash covers page count, per-page extracted
//! text, and the canonical content streams. The perceptual component is a
//! hash over whitespace-normalized text only, so a regenerated document
//! with identical wording still matches on the visual tier.

use std::collections::HashSet;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::attestation::DocumentHashes;
use crate::error::{Result, SealError};

/// Name of the optional-content group holding the seal graphic.
pub const SEAL_LAYER_NAME: &str = "GlyphSeal";

pub(crate) fn compute(bytes: &[u8]) -> Result<DocumentHashes> {
    let mut doc = Document::load_mem(bytes)
        .map_err(|e| SealError::Processing(format!("PDF parse failed: {e}")))?;

    canonicalize_pages(&mut doc)?;

    let pages = doc.get_pages();
    let mut hasher = Sha256::new();
    hasher.update((pages.len() as u32).to_be_bytes());

    let mut combined_text = String::new();
    for (&page_no, &page_id) in &pages {
        let text = doc.extract_text(&[page_no]).unwrap_or_default();
        let content = doc
            .get_page_content(page_id)
            .map_err(|e| SealError::Processing(format!("page {page_no} content: {e}")))?;

        hasher.update(page_no.to_be_bytes());
        hasher.update((text.len() as u64).to_be_bytes());
        hasher.update(text.as_bytes());
        hasher.update((content.len() as u64).to_be_bytes());
        hasher.update(&content);

        combined_text.push_str(&text);
        combined_text.push('\n');
    }

    let cryptographic = hex::encode(hasher.finalize());
    let perceptual = hex::encode(Sha256::digest(normalize_text(&combined_text).as_bytes()));

    debug!(pages = pages.len(), "Computed multi-page fingerprint");

    Ok(DocumentHashes {
        cryptographic,
        perceptual,
        difference: None,
    })
}

/// Decode, seal-strip, and canonically re-encode every page's content.
fn canonicalize_pages(doc: &mut Document) -> Result<()> {
    let seal_groups = seal_layer_groups(doc);
    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();

    let mut replacements = Vec::with_capacity(pages.len());
    for (page_no, page_id) in pages {
        let seal_names = seal_property_names(doc, page_id, &seal_groups);
        let raw = doc
            .get_page_content(page_id)
            .map_err(|e| SealError::Processing(format!("page {page_no} content: {e}")))?;
        let content = Content::decode(&raw)
            .map_err(|e| SealError::Processing(format!("page {page_no} content decode: {e}")))?;

        let operations = strip_seal_sections(content.operations, &seal_names);
        let canonical = Content { operations }
            .encode()
            .map_err(|e| SealError::Processing(format!("page {page_no} content encode: {e}")))?;
        replacements.push((page_id, canonical));
    }

    for (page_id, canonical) in replacements {
        doc.change_page_content(page_id, canonical)
            .map_err(|e| SealError::Processing(format!("content rewrite: {e}")))?;
    }
    Ok(())
}

/// Object ids of optional-content groups named after the seal layer.
fn seal_layer_groups(doc: &Document) -> HashSet<ObjectId> {
    doc.objects
        .iter()
        .filter_map(|(&id, object)| {
            let dict = object.as_dict().ok()?;
            if !matches_name(dict.get(b"Type").ok()?, b"OCG") {
                return None;
            }
            if matches_name(dict.get(b"Name").ok()?, SEAL_LAYER_NAME.as_bytes()) {
                Some(id)
            } else {
                None
            }
        })
        .collect()
}

/// Resource property names on this page that map to a seal layer group.
fn seal_property_names(
    doc: &Document,
    page_id: ObjectId,
    seal_groups: &HashSet<ObjectId>,
) -> HashSet<Vec<u8>> {
    let mut names = HashSet::new();
    let Some(properties) = page_properties(doc, page_id) else {
        return names;
    };

    for (key, value) in properties.iter() {
        let is_seal = match value {
            Object::Reference(id) => seal_groups.contains(id),
            Object::Dictionary(dict) => dict
                .get(b"Name")
                .map(|name| matches_name(name, SEAL_LAYER_NAME.as_bytes()))
                .unwrap_or(false),
            _ => false,
        };
        if is_seal {
            names.insert(key.clone());
        }
    }
    names
}

/// The page's `/Resources` → `/Properties` dictionary, if any.
fn page_properties(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let page = resolve(doc, doc.get_object(page_id).ok()?)?.as_dict().ok()?;
    let resources = resolve(doc, page.get(b"Resources").ok()?)?.as_dict().ok()?;
    resolve(doc, resources.get(b"Properties").ok()?)?
        .as_dict()
        .ok()
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// PDF names and strings both appear where layer names live.
fn matches_name(object: &Object, expected: &[u8]) -> bool {
    match object {
        Object::Name(name) => name.as_slice() == expected,
        Object::String(value, _) => value.as_slice() == expected,
        _ => false,
    }
}

/// Drop `BDC … EMC` sections whose property name belongs to the seal
/// layer, tracking nesting so inner marked content stays intact elsewhere.
fn strip_seal_sections(
    operations: Vec<lopdf::content::Operation>,
    seal_names: &HashSet<Vec<u8>>,
) -> Vec<lopdf::content::Operation> {
    if seal_names.is_empty() {
        return operations;
    }

    let mut kept = Vec::with_capacity(operations.len());
    let mut skip_depth = 0usize;

    for op in operations {
        if skip_depth > 0 {
            match op.operator.as_str() {
                "BDC" | "BMC" => skip_depth += 1,
                "EMC" => skip_depth -= 1,
                _ => {}
            }
            continue;
        }
        if op.operator == "BDC" && is_seal_bdc(&op.operands, seal_names) {
            skip_depth = 1;
            continue;
        }
        kept.push(op);
    }
    kept
}

fn is_seal_bdc(operands: &[Object], seal_names: &HashSet<Vec<u8>>) -> bool {
    match operands {
        [Object::Name(tag), Object::Name(property)] => {
            tag.as_slice() == b"OC" && seal_names.contains(property.as_slice())
        }
        _ => false,
    }
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;
    use lopdf::{dictionary, Stream};

    fn text_operations(text: &str, y: i64) -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ]
    }

    fn build_pdf(operations: Vec<Operation>, with_seal_layer: bool) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };

        let mut operations = operations;
        if with_seal_layer {
            let ocg_id = doc.add_object(dictionary! {
                "Type" => "OCG",
                "Name" => Object::string_literal(SEAL_LAYER_NAME),
            });
            resources.set(
                "Properties",
                dictionary! { "GS0" => Object::Reference(ocg_id) },
            );
            operations.push(Operation::new("BDC", vec!["OC".into(), "GS0".into()]));
            operations.extend(text_operations("sealed by glyphseal", 100));
            operations.push(Operation::new("EMC", vec![]));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content encode"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("PDF save");
        bytes
    }

    #[test]
    fn hashes_are_idempotent() {
        let pdf = build_pdf(text_operations("Hello, world", 700), false);
        assert_eq!(compute(&pdf).unwrap(), compute(&pdf).unwrap());
    }

    #[test]
    fn seal_layer_is_excluded_from_the_fingerprint() {
        let plain = build_pdf(text_operations("Quarterly report", 700), false);
        let sealed = build_pdf(text_operations("Quarterly report", 700), true);
        assert_eq!(compute(&plain).unwrap(), compute(&sealed).unwrap());
    }

    #[test]
    fn changed_text_changes_the_cryptographic_hash() {
        let original = build_pdf(text_operations("Amount due: 100", 700), false);
        let tampered = build_pdf(text_operations("Amount due: 900", 700), false);
        let a = compute(&original).unwrap();
        let b = compute(&tampered).unwrap();
        assert_ne!(a.cryptographic, b.cryptographic);
    }

    #[test]
    fn layout_changes_keep_the_perceptual_hash() {
        let original = build_pdf(text_operations("Stable wording", 700), false);
        let reflowed = build_pdf(text_operations("Stable wording", 500), false);
        let a = compute(&original).unwrap();
        let b = compute(&reflowed).unwrap();
        assert_ne!(a.cryptographic, b.cryptographic);
        assert_eq!(a.perceptual, b.perceptual);
    }

    #[test]
    fn garbage_bytes_are_a_processing_error() {
        assert!(matches!(
            compute(b"%PDF-not-really"),
            Err(SealError::Processing(_))
        ));
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  a\n\tb   c "), "a b c");
    }
}
