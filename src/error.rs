//! Error types for the export pipeline

use thiserror::Error;

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing and exporting a preview
#[derive(Error, Debug)]
pub enum Error {
    /// The capture target is missing or not mounted
    #[error("Preview not ready. Please wait for the preview to load and try again.")]
    PreviewNotReady,

    /// Rendering the target to a bitmap failed
    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    /// Neither the primary nor the fallback encoder produced data
    #[error("Failed to create image: {0}")]
    ImageEncodingFailed(String),

    /// Decoding the page image or building the PDF failed
    #[error("Failed to build PDF: {0}")]
    PdfAssemblyFailed(String),

    /// The print window could not be opened
    #[error("Pop-up blocked. Please allow pop-ups for this site.")]
    PopupBlocked,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Writing an output file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
