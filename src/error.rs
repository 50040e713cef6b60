use thiserror::Error;

/// Failures while composing or writing a certificate artifact.
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid image source: {0}")]
    InvalidImageSource(String),

    #[error("raster error: {0}")]
    Raster(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),
}

pub type Result<T> = std::result::Result<T, CertificateError>;
