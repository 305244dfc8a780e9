//! Document and chunk types produced during ingestion

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Plain text file
    Txt,
    /// Anything else
    Unknown,
}

impl FileType {
    /// Detect file type from extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "txt" => Self::Txt,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a path
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Pdf => "PDF",
            Self::Txt => "Text File",
            Self::Unknown => "Unknown",
        }
    }
}

/// A loaded document; lives only for the duration of an ingestion run
#[derive(Debug, Clone)]
pub struct Document {
    /// Source path
    pub path: PathBuf,
    /// File type
    pub file_type: FileType,
    /// Full extracted text
    pub text: String,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, file_type: FileType, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_type,
            text: text.into(),
        }
    }

    /// File name used as the `source` of every chunk
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Length of the text in characters
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// A chunk of document text with its index-wide id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Index-wide record id (`id-{n}`)
    pub id: String,
    /// Chunk text
    pub content: String,
    /// Source file name
    pub source: String,
    /// Position of the chunk inside its document
    pub chunk_index: u32,
}

impl Chunk {
    /// Record id for the `n`th chunk of a run (1-based)
    pub fn record_id(n: u64) -> String {
        format!("id-{}", n)
    }

    /// Payload stored next to the vector
    pub fn to_payload(&self) -> serde_json::Value {
        json!({
            "text": self.content,
            "source": self.source,
            "chunk_index": self.chunk_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_path(Path::new("data/study.PDF")), FileType::Pdf);
        assert_eq!(FileType::from_path(Path::new("notes.txt")), FileType::Txt);
        assert_eq!(FileType::from_path(Path::new("notes.md")), FileType::Unknown);
        assert_eq!(FileType::from_path(Path::new("README")), FileType::Unknown);
    }

    #[test]
    fn test_chunk_payload_keeps_text() {
        let chunk = Chunk {
            id: Chunk::record_id(7),
            content: "Protein intake for adults is 0.8g/kg/day.".to_string(),
            source: "protein.txt".to_string(),
            chunk_index: 0,
        };
        assert_eq!(chunk.id, "id-7");
        let payload = chunk.to_payload();
        assert_eq!(payload["text"], "Protein intake for adults is 0.8g/kg/day.");
        assert_eq!(payload["source"], "protein.txt");
    }
}
