use pe2pkcs7_schema::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Pe2Pkcs7Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}, column {column}: {msg}")]
    ParseError {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Verifier error: {0}")]
    VerifierError(String),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown root type \"{0}\"")]
    UnknownRootType(String),
}
