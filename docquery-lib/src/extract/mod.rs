//! Raw text extraction from uploaded documents
//!
//! Only PDF and DOCX are accepted. Anything else is rejected with
//! [`Error::UnsupportedFormat`] before the bytes are looked at.

use std::fmt;
use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;
use zip::ZipArchive;

use crate::{Error, Result};

/// Document formats with a text extractor.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum FileKind {
    Pdf,
    Docx,
}

impl FileKind {
    /// Determine the kind from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Ok(FileKind::Pdf),
            "docx" => Ok(FileKind::Docx),
            other => Err(Error::UnsupportedFormat(format!(".{other}"))),
        }
    }

    /// Determine the kind from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            Error::UnsupportedFormat(format!("{} has no file extension", path.display()))
        })?;
        Self::from_extension(ext)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Pdf => write!(f, "pdf"),
            FileKind::Docx => write!(f, "docx"),
        }
    }
}

/// Trait for turning document bytes into plain text
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8], kind: FileKind) -> Result<String>;
}

/// Extractor for PDF (via `pdf-extract`) and DOCX (via the document XML).
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn extract_text(&self, bytes: &[u8], kind: FileKind) -> Result<String> {
        debug!(%kind, bytes = bytes.len(), "extracting text");
        match kind {
            FileKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| Error::Extraction(format!("pdf: {e}"))),
            FileKind::Docx => docx_text(bytes),
        }
    }
}

/// Read a file and extract its text, choosing the format from the extension.
pub fn extract_file(extractor: &dyn TextExtractor, path: &Path) -> Result<String> {
    let kind = FileKind::from_path(path)?;
    let bytes = std::fs::read(path)?;
    extractor.extract_text(&bytes, kind)
}

const DOCX_BODY: &str = "word/document.xml";

fn docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::Extraction(format!("docx: {e}")))?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|e| Error::Extraction(format!("docx: {DOCX_BODY}: {e}")))?
        .read_to_string(&mut xml)?;

    document_xml_text(&xml)
}

/// Plain text of a WordprocessingML body: runs concatenated, one line per
/// paragraph.
fn document_xml_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if e.name().as_ref() == b"w:t" {
                    in_run_text = true;
                }
            }
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_run_text {
                    let run = e
                        .unescape()
                        .map_err(|e| Error::Extraction(format!("docx: {e}")))?;
                    text.push_str(&run);
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Extraction(format!(
                    "docx: malformed XML at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}
