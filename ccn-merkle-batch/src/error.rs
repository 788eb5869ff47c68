use thiserror::Error;

/// Errors from batch construction, signing, encoding and verification.
///
/// Construction failures abort the whole batch. Verification failures are
/// scoped to the single block being checked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// Empty batch, oversize block, inconsistent block list, digest or
    /// signing provider failure.
    #[error("construction error: {0}")]
    ConstructionError(String),
    /// Malformed or inconsistent witness path, or out-of-range segment.
    #[error("path mismatch: {0}")]
    PathMismatch(String),
    /// Signature does not verify against the metadata and resolved key.
    #[error("signature invalid: {0}")]
    SignatureInvalid(String),
    /// Unknown digest algorithm or leaf-hash mode identifier.
    #[error("unsupported mode: {0}")]
    UnsupportedMode(String),
    /// Bundle bytes could not be encoded or decoded.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
    /// Configuration could not be parsed or is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
