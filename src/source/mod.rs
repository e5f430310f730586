
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::{RagError, Result};

/// OCR service result file. Only the recognized text is consumed.
#[derive(Debug, Deserialize)]
struct OcrResult {
    #[serde(rename = "analyzeResult")]
    analyze_result: AnalyzeResult,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResult {
    content: String,
}

/// Extension of a filename, lowercased, without the dot.
#[inline]
pub fn file_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Whether the filename carries one of the allowed extensions.
///
/// Extension membership is the only format validation performed; file contents
/// are trusted to match their extension.
#[inline]
pub fn allowed_extension(filename: &str, allowed: &[String]) -> bool {
    file_extension(filename).is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)))
}

/// Document name: the filename with its final extension stripped.
#[inline]
pub fn document_name(filename: &str) -> &str {
    filename
        .rsplit_once('.')
        .map_or(filename, |(stem, _)| stem)
}

/// Read an OCR result JSON file and return the recognized text.
#[inline]
pub fn read_ocr_json(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path)?;

    let ocr: OcrResult = serde_json::from_str(&content).map_err(|e| {
        RagError::EmptyDocument(format!(
            "Failed to parse OCR result {}: {e}",
            path.display()
        ))
    })?;

    if ocr.analyze_result.content.trim().is_empty() {
        return Err(RagError::EmptyDocument(format!(
            "OCR result {} contains no text",
            path.display()
        )));
    }

    Ok(ocr.analyze_result.content)
}

/// Load document text from a file, dispatching on its extension.
///
/// `.json` files are treated as OCR results; anything else is read as plain
/// extracted text.
#[inline]
pub fn load_document_text(path: &Path) -> Result<String> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RagError::InvalidInput(format!("Invalid file path: {}", path.display())))?;

    let text = match file_extension(filename).as_deref() {
        Some("json") => read_ocr_json(path)?,
        _ => fs::read_to_string(path)?,
    };

    if text.trim().is_empty() {
        return Err(RagError::EmptyDocument(format!(
            "No text extracted from {}",
            path.display()
        )));
    }

    debug!(
        "Loaded {} characters of text from {}",
        text.len(),
        path.display()
    );

    Ok(text)
}
