//! Document discovery and text extraction for PDF and plain-text files

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::{Document, FileType};

/// Upper bound on a single PDF extraction
const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Byte-order mark some editors put in front of UTF-8 text
const UTF8_BOM: char = '\u{feff}';

/// Clean up text extracted from a PDF: ligatures, odd spaces, NUL bytes and
/// runs of blank lines
fn cleanup_pdf_text(text: &str) -> String {
    let replaced = text
        .replace('\0', "")
        .replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl");

    let mut out = String::with_capacity(replaced.len());
    let mut blank_run = 0;
    for line in replaced.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

/// Parser for supported file types
pub struct FileParser;

impl FileParser {
    /// Extract the text of a file based on its extension
    pub fn parse(path: &Path, data: &[u8]) -> Result<String> {
        match FileType::from_path(path) {
            FileType::Pdf => Self::parse_pdf(path, data),
            FileType::Txt => Self::parse_text(path, data),
            FileType::Unknown => Err(Error::UnsupportedFileType(path.display().to_string())),
        }
    }

    /// Extract PDF text on a helper thread so a pathological file cannot hang ingestion
    fn parse_pdf(path: &Path, data: &[u8]) -> Result<String> {
        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(PDF_EXTRACT_TIMEOUT) {
            Ok(Ok(text)) => {
                let _ = handle.join();
                Ok(cleanup_pdf_text(&text))
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(Error::document_load(path.display().to_string(), e.to_string()))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Error::document_load(
                path.display().to_string(),
                format!("PDF extraction timed out after {}s", PDF_EXTRACT_TIMEOUT.as_secs()),
            )),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Error::document_load(
                path.display().to_string(),
                "PDF extraction thread crashed",
            )),
        }
    }

    /// Decode strict UTF-8, dropping a leading BOM
    fn parse_text(path: &Path, data: &[u8]) -> Result<String> {
        let text = std::str::from_utf8(data).map_err(|e| {
            Error::document_load(path.display().to_string(), format!("invalid UTF-8: {}", e))
        })?;
        Ok(text.strip_prefix(UTF8_BOM).unwrap_or(text).to_string())
    }
}

/// A file that was found but not loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of loading a directory
#[derive(Debug, Default)]
pub struct LoadedDocuments {
    /// Supported files discovered
    pub found: usize,
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedDocument>,
}

/// Loads supported documents from a directory
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    recursive: bool,
}

impl DocumentLoader {
    pub fn new(recursive: bool) -> Self {
        Self { recursive }
    }

    /// Supported files under `dir`, sorted by path
    pub fn discover(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(Error::document_load(
                dir.display().to_string(),
                "directory does not exist",
            ));
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut paths = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(max_depth) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_file() && FileType::from_path(entry.path()).is_supported() {
                paths.push(entry.into_path());
            }
        }

        paths.sort();
        Ok(paths)
    }

    /// Load a single file into a document
    pub fn load_file(&self, path: &Path) -> Result<Document> {
        let file_type = FileType::from_path(path);
        if !file_type.is_supported() {
            return Err(Error::UnsupportedFileType(path.display().to_string()));
        }

        let data = std::fs::read(path)
            .map_err(|e| Error::document_load(path.display().to_string(), e.to_string()))?;
        let text = FileParser::parse(path, &data)?;

        if text.trim().is_empty() {
            return Err(Error::document_load(
                path.display().to_string(),
                "document has no text content",
            ));
        }

        Ok(Document::new(path, file_type, text))
    }

    /// Load every supported file in `dir`; per-file failures are recorded, not returned
    pub fn load_dir(&self, dir: &Path) -> Result<LoadedDocuments> {
        let paths = self.discover(dir)?;
        let mut loaded = LoadedDocuments {
            found: paths.len(),
            ..Default::default()
        };

        for path in paths {
            match self.load_file(&path) {
                Ok(doc) => {
                    tracing::debug!(
                        "Loaded {} ({}, {} chars)",
                        doc.filename(),
                        doc.file_type.display_name(),
                        doc.char_count()
                    );
                    loaded.documents.push(doc);
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    loaded.skipped.push(SkippedDocument {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(loaded)
    }
}
