// src/pdf_extract.rs

use crate::error::PdfError;
use lopdf::{Dictionary, Document, ObjectId};
use tracing::{debug, info, warn};

/// Text of every page of a filed ITR PDF that has any, one page after another.
///
/// Rejects image-only returns up front, since the keyword scan needs text lines.
pub fn extract_text_from_pdf(pdf_bytes: &[u8]) -> Result<String, PdfError> {
    let doc = Document::load_mem(pdf_bytes).map_err(|e| PdfError::Parse(e.to_string()))?;

    if looks_like_scanned(&doc) {
        info!("Return PDF has no font resources on most pages, rejecting");
        return Err(PdfError::Scanned);
    }

    let text = join_page_text(&doc);
    if !text.trim().is_empty() {
        info!(chars = text.len(), "Text extracted successfully");
        return Ok(text);
    }

    // lopdf misses some encodings; pdf-extract reads the whole file instead.
    warn!("Per-page extraction produced nothing, retrying with pdf-extract");
    match pdf_extract::extract_text_from_mem(pdf_bytes) {
        Ok(text) if !text.trim().is_empty() => {
            info!(chars = text.len(), "Text extracted by pdf-extract");
            Ok(text)
        }
        Ok(_) => Err(PdfError::NoText),
        Err(e) => {
            warn!(error = %e, "pdf-extract failed");
            Err(PdfError::NoText)
        }
    }
}

/// Extract each page on its own, skipping pages that yield no text.
fn join_page_text(doc: &Document) -> String {
    let mut pages = Vec::new();
    for page_num in doc.get_pages().keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(text) if !text.trim().is_empty() => pages.push(text.trim_end().to_string()),
            Ok(_) => debug!(page = *page_num, "Empty page skipped"),
            Err(e) => warn!(page = *page_num, error = %e, "Page text extraction failed"),
        }
    }
    pages.join("\n")
}

/// True when at least 80% of pages carry XObjects but no fonts, which is how
/// a printed-and-scanned acknowledgement looks.
fn looks_like_scanned(doc: &Document) -> bool {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return false;
    }

    let image_only = pages.values().filter(|id| is_image_only(doc, **id)).count();
    let ratio = image_only as f64 / pages.len() as f64;
    info!(
        total_pages = pages.len(),
        image_only,
        ratio = format!("{ratio:.2}"),
        "Page resource check"
    );
    ratio >= 0.8
}

fn is_image_only(doc: &Document, page_id: ObjectId) -> bool {
    let resources = doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"Resources").ok())
        .and_then(|r| doc.dereference(r).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok());
    has_entries(doc, resources, b"XObject") && !has_entries(doc, resources, b"Font")
}

fn has_entries(doc: &Document, resources: Option<&Dictionary>, key: &[u8]) -> bool {
    resources
        .and_then(|res| res.get(key).ok())
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .is_some_and(|d| !d.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    /// Build a PDF with one page per entry, each page one text line per string.
    pub(crate) fn build_pdf(pages: &[&[&str]]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });

        let mut kids: Vec<Object> = Vec::new();
        for lines in pages {
            let mut operations = Vec::new();
            for (i, line) in lines.iter().enumerate() {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
                operations.push(Operation::new(
                    "Td",
                    vec![72.into(), (760 - 20 * i as i64).into()],
                ));
                operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
                operations.push(Operation::new("ET", vec![]));
            }
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_garbage_bytes() {
        let result = extract_text_from_pdf(b"this is not a pdf");
        assert!(matches!(result, Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_image_only_pages_rejected() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0u8],
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Resources" => dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::from(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        assert!(looks_like_scanned(&doc));

        let text_pdf = Document::load_mem(&build_pdf(&[&["PAN ABCDE1234F"]])).unwrap();
        assert!(!looks_like_scanned(&text_pdf));
    }

    #[test]
    fn test_pages_joined_and_empty_pages_skipped() {
        let pdf = build_pdf(&[&["PAN ABCDE1234F"], &[], &["Income from Salaries 125000"]]);
        let text = extract_text_from_pdf(&pdf).unwrap();
        assert!(text.contains("ABCDE1234F"));
        assert!(text.contains("Income from Salaries 125000"));
        assert!(text.find("ABCDE1234F") < text.find("Salaries"));
    }
}
