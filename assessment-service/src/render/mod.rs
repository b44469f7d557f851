//! Turning generated prose into a downloadable PDF.

pub mod pdf;
pub mod plain_text;
pub mod transient;

pub use pdf::{render_pdf, ReportDocument};
pub use plain_text::markdown_to_plain;
pub use transient::{TransientFile, TransientStream};

use thiserror::Error;

/// Document stream failure, kept apart from generation failures.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF layout error: {0}")]
    Layout(String),

    #[error("PDF stream error: {0}")]
    Io(String),

    #[error("Render task failed: {0}")]
    Task(String),
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::Io(err.to_string())
    }
}

impl From<printpdf::Error> for RenderError {
    fn from(err: printpdf::Error) -> Self {
        RenderError::Layout(err.to_string())
    }
}
