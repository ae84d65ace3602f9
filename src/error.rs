use thiserror::Error;

/// Failure of a single remote call, classified by how far the request got.
///
/// A successful call is the `Ok` side of the `Result`; every other outcome is
/// exactly one of these variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The service answered but declined the request.
    #[error("rejected by service: {0}")]
    RejectedByService(String),
    /// No response was obtained (connection failure or client-side timeout).
    #[error("service unreachable: {0}")]
    Unreachable(String),
    /// A response arrived but did not match the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("validation error: {0}")]
    ClientValidation(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PaymentError>;
