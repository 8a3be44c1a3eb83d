//! Turns input documents into plain text for scanning.
//!
//! Supported inputs are UTF-8 text (`.txt`, `.md`), PDF and Word `.docx`
//! files. Anything else fails with [`DocumentLoadError::UnsupportedFormat`]
//! before any scanning happens.

use std::{
    fs,
    io::{Cursor, Read},
    path::Path,
};

use quick_xml::{events::Event, Reader};
use tracing::debug;
use zip::ZipArchive;

use crate::error::DocumentLoadError;

const DOCX_BODY: &str = "word/document.xml";

/// Formats the loader can extract text from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Resolve a format hint: an extension (`pdf`, `.docx`) or a MIME type.
    pub fn from_hint(hint: &str) -> Result<Self, DocumentLoadError> {
        let normalized = hint.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "txt" | "text" | "md" | "markdown" | "text/plain" | "text/markdown" => {
                Ok(Self::PlainText)
            }
            "pdf" | "application/pdf" => Ok(Self::Pdf),
            "docx"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Ok(Self::Docx)
            }
            _ => Err(DocumentLoadError::UnsupportedFormat { format: normalized }),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, DocumentLoadError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        Self::from_hint(extension)
    }
}

/// Source of plain document text.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<String, DocumentLoadError>;
}

/// Reads documents from the local filesystem, choosing the extractor from the
/// file extension.
#[derive(Debug, Default, Clone)]
pub struct FileDocumentLoader;

impl DocumentLoader for FileDocumentLoader {
    fn load(&self, path: &Path) -> Result<String, DocumentLoadError> {
        let format = DocumentFormat::from_path(path)?;
        let bytes = fs::read(path).map_err(|source| DocumentLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let text = load_bytes(&bytes, format)?;
        debug!(path = %path.display(), ?format, chars = text.chars().count(), "loaded document");
        Ok(text)
    }
}

/// Extract plain text from an in-memory document.
pub fn load_bytes(bytes: &[u8], format: DocumentFormat) -> Result<String, DocumentLoadError> {
    match format {
        DocumentFormat::PlainText => {
            String::from_utf8(bytes.to_vec()).map_err(DocumentLoadError::InvalidEncoding)
        }
        DocumentFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|err| DocumentLoadError::Pdf(err.to_string())),
        DocumentFormat::Docx => extract_docx(bytes),
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String, DocumentLoadError> {
    let docx_error = |err: &dyn std::fmt::Display| DocumentLoadError::Docx(err.to_string());

    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|err| docx_error(&err))?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|err| docx_error(&err))?
        .read_to_string(&mut xml)
        .map_err(|err| docx_error(&err))?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_text_run = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_run => {
                let chunk = e.unescape().map_err(|err| docx_error(&err))?;
                text.push_str(&chunk);
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(docx_error(&err)),
            _ => {}
        }
    }
    Ok(text.trim_end().to_string())
}
