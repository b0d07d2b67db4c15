use crate::error::{RagError, Result};
use log::{debug, info, warn};
use mime_guess::from_path;
use pdf_extract::extract_text_by_pages;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Scalar metadata attached to a page or chunk (e.g. `source`, `page`).
pub type Metadata = Map<String, Value>;

/// One loaded page: its text plus metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The actual text content of the page
    pub content: String,
    pub metadata: Metadata,
}

impl Document {
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Document {
            content: content.into(),
            metadata,
        }
    }
}

/// Load a file as a sequence of documents, one per page, in page order.
///
/// PDFs are split by page. Plain text files load as a single page.
pub fn load_pages<P: AsRef<Path>>(file_path: P) -> Result<Vec<Document>> {
    let path = file_path.as_ref();

    if !path.exists() {
        return Err(RagError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let mime_type = from_path(path).first_or_octet_stream().to_string();
    debug!("Detected MIME type: {}", mime_type);

    let pages = read_pages(path, &mime_type)?;
    let total_pages = pages.len();
    let source = path.display().to_string();

    let documents = pages
        .into_iter()
        .enumerate()
        .map(|(page, content)| {
            let mut metadata = Metadata::new();
            metadata.insert("source".to_string(), Value::from(source.clone()));
            metadata.insert("page".to_string(), Value::from(page));
            metadata.insert("total_pages".to_string(), Value::from(total_pages));
            Document::new(content, metadata)
        })
        .collect();

    Ok(documents)
}

/// Read the raw text of each page based on the file's MIME type
fn read_pages(path: &Path, mime_type: &str) -> Result<Vec<String>> {
    let document_error = |message: String| RagError::Document {
        path: path.to_path_buf(),
        message,
    };

    match mime_type {
        mime if mime.starts_with("application/pdf") => {
            info!("Processing PDF document: {}", path.display());
            let pages = extract_text_by_pages(path)
                .map_err(|e| document_error(format!("failed to extract text: {e}")))?;

            let pages: Vec<String> = pages.iter().map(|page| normalize_whitespace(page)).collect();

            if pages.iter().all(|page| page.is_empty()) {
                warn!("Extracted PDF content is empty or contains only whitespace");
            }

            Ok(pages)
        }

        mime if mime.starts_with("text/") => {
            info!("Processing text document: {}", path.display());
            let content = fs::read_to_string(path)
                .map_err(|e| document_error(format!("failed to read text file: {e}")))?;
            Ok(vec![content])
        }

        _ => Err(document_error(format!(
            "unsupported document format: {mime_type}. Only PDF and text files are supported"
        ))),
    }
}

/// Normalize whitespace in extracted page text.
///
/// Drops carriage returns, collapses runs of spaces and caps newline runs at
/// one paragraph break.
fn normalize_whitespace(text: &str) -> String {
    let mut prev_char = ' ';
    let mut newline_count = 0;
    let mut normalized = String::with_capacity(text.len());

    for c in text.chars().filter(|&c| c != '\r') {
        if c == '\n' {
            newline_count += 1;
            continue;
        }

        if newline_count > 0 {
            normalized.push_str(if newline_count >= 2 { "\n\n" } else { "\n" });
            newline_count = 0;
            prev_char = '\n';
        }

        if !(c == ' ' && (prev_char == ' ' || prev_char == '\n')) {
            normalized.push(c);
        }
        prev_char = c;
    }

    normalized.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_normalize_whitespace() {
        let text = "This  has   multiple    spaces.\n\n\nAnd multiple newlines.\r\nAnd Windows line endings.";
        let expected =
            "This has multiple spaces.\n\nAnd multiple newlines.\nAnd Windows line endings.";
        assert_eq!(normalize_whitespace(text), expected);
    }

    #[test]
    fn test_normalize_drops_indentation_after_newline() {
        assert_eq!(normalize_whitespace("line one\n   line two  "), "line one\nline two");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = load_pages("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, RagError::NotFound { .. }));
    }

    #[test]
    fn test_text_file_loads_as_single_page() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "Hello from a text file.").unwrap();

        let pages = load_pages(file.path()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].content, "Hello from a text file.");
        assert_eq!(pages[0].metadata["page"], Value::from(0));
        assert_eq!(pages[0].metadata["total_pages"], Value::from(1));
        assert_eq!(
            pages[0].metadata["source"],
            Value::from(file.path().display().to_string())
        );
    }

    #[test]
    fn test_unsupported_format() {
        let file = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        let err = load_pages(file.path()).unwrap_err();
        assert!(matches!(err, RagError::Document { .. }));
    }
}
