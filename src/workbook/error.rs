use std::path::PathBuf;

use thiserror::Error;

/// Result type for document loading.
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

/// Errors raised while opening or decoding a spreadsheet document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The path does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The container or one of its required parts cannot be parsed.
    #[error("corrupt document: {0}")]
    Corrupt(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A part referenced by a relationship is missing from the archive.
    #[error("missing required part: {0}")]
    MissingPart(String),

    /// A cell or range reference could not be parsed.
    #[error("invalid cell reference: `{0}`")]
    InvalidAddress(String),
}
