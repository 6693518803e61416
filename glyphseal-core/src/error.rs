use thiserror::Error;

#[derive(Error, Debug)]
pub enum SealError {
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("document processing failed: {0}")]
    Processing(String),

    #[error("invalid attestation payload: {0}")]
    InvalidFormat(String),

    #[error("payload of {size} bytes exceeds the largest QR capacity of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("signing service error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("signature invalid: {0}")]
    SignatureInvalid(String),

    #[error("signature missing from attestation")]
    SignatureMissing,
}

pub type Result<T> = std::result::Result<T, SealError>;
