// src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("PDF is scanned / image-only, no text to extract")]
    Scanned,

    #[error("PDF produced no extractable text")]
    NoText,
}

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Failed to parse layout: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Computation label listed twice: {0}")]
    DuplicateLabel(String),

    #[error("Computation label mapped twice: {0}")]
    DuplicateMapping(String),

    #[error("Mapping for label not in the computation catalogue: {0}")]
    UnknownLabel(String),

    #[error("Fallback rule for {0} contains an empty path")]
    EmptyFallback(String),

    #[error("Field defined twice in group {group}: {name}")]
    DuplicateField { group: String, name: String },
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Spreadsheet write failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Output directory does not exist: {0}")]
    MissingDir(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Input is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
