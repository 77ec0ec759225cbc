
use std::fs;
use std::io::Read;
use std::path::Path;

use pulldown_cmark::{Event, Parser, TagEnd};
use tracing::debug;

use crate::{DocchatError, Result};

/// Upper bound on the decompressed size of an OOXML part (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// A run of text pulled from a source document, before chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub source: SegmentSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSource {
    pub filename: String,
    /// 1-based page number for paginated formats (PDF); `None` otherwise.
    pub page: Option<u32>,
}

/// Load a document into text segments, dispatching on the file extension.
///
/// PDFs produce one segment per page; the other supported formats (docx,
/// txt, md) produce a single segment. Unknown extensions fail with
/// [`DocchatError::UnsupportedFormat`].
#[inline]
pub fn load_document(path: &Path) -> Result<Vec<Segment>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();

    debug!("Loading document {} (format: {})", filename, extension);

    match extension.as_str() {
        "pdf" => load_pdf(path, &filename),
        "docx" => load_docx(path, &filename),
        "txt" => load_txt(path, &filename),
        "md" => load_markdown(path, &filename),
        _ => Err(DocchatError::UnsupportedFormat(extension)),
    }
}

fn load_pdf(path: &Path, filename: &str) -> Result<Vec<Segment>> {
    let pages = pdf_extract::extract_text_by_pages(path)
        .map_err(|e| DocchatError::Ingestion(format!("PDF extraction failed: {e}")))?;

    let segments = pages
        .into_iter()
        .enumerate()
        .map(|(index, text)| Segment {
            text,
            source: SegmentSource {
                filename: filename.to_string(),
                page: Some(index as u32 + 1),
            },
        })
        .collect();

    Ok(segments)
}

fn load_docx(path: &Path, filename: &str) -> Result<Vec<Segment>> {
    let bytes = fs::read(path)?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| DocchatError::Ingestion(format!("Invalid docx archive: {e}")))?;

    let mut doc_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|_| DocchatError::Ingestion("word/document.xml not found".to_string()))?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| DocchatError::Ingestion(format!("Failed to read document.xml: {e}")))?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(DocchatError::Ingestion(
                "word/document.xml exceeds size limit".to_string(),
            ));
        }
    }

    let text = extract_docx_text(&doc_xml)?;

    Ok(vec![Segment {
        text,
        source: SegmentSource {
            filename: filename.to_string(),
            page: None,
        },
    }])
}

/// Pull `w:t` runs out of the document XML, restoring paragraph breaks at
/// `w:p` boundaries.
fn extract_docx_text(xml: &[u8]) -> Result<String> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(quick_xml::events::Event::Text(e)) => {
                if in_text_run {
                    out.push_str(e.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => {
                return Err(DocchatError::Ingestion(format!(
                    "Failed to parse document.xml: {e}"
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

fn load_txt(path: &Path, filename: &str) -> Result<Vec<Segment>> {
    // Lossy fallback so documents with stray non-UTF-8 bytes still ingest.
    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes).into_owned();

    Ok(vec![Segment {
        text,
        source: SegmentSource {
            filename: filename.to_string(),
            page: None,
        },
    }])
}

fn load_markdown(path: &Path, filename: &str) -> Result<Vec<Segment>> {
    let bytes = fs::read(path)?;
    let markdown = String::from_utf8_lossy(&bytes);

    let mut text = String::new();
    for event in Parser::new(&markdown) {
        match event {
            Event::Text(t) => text.push_str(&t),
            Event::Code(code) => text.push_str(&code),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::CodeBlock | TagEnd::BlockQuote(_),
            ) => text.push_str("\n\n"),
            Event::End(TagEnd::Item) => text.push('\n'),
            _ => {}
        }
    }

    Ok(vec![Segment {
        text,
        source: SegmentSource {
            filename: filename.to_string(),
            page: None,
        },
    }])
}
