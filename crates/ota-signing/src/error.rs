//! Error types for firmware signing operations.

use std::path::PathBuf;

use crate::algorithm::Algorithm;

/// Errors from firmware signing and verification.
///
/// Messages carry public values only. Private key material is never
/// formatted into an error.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// Key hex has the wrong length or contains non-hex characters, or the
    /// decoded value is not a usable private key.
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// The private key derives a different public key than the one expected.
    #[error("public key mismatch: expected {expected}, derived {derived}")]
    KeyMismatch { expected: String, derived: String },

    /// The signature bytes have the wrong length.
    #[error("malformed signature: expected {expected} bytes, got {actual}")]
    MalformedSignature { expected: usize, actual: usize },

    /// The public key bytes have the wrong length or are not a curve point.
    #[error("malformed {algorithm} public key: {reason}")]
    MalformedKey { algorithm: Algorithm, reason: String },

    /// The signing primitive rejected its input.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// The signature is well formed but does not verify.
    #[error("signature verification failed for digest {digest} under public key {public_key}")]
    VerificationFailed { public_key: String, digest: String },

    /// The algorithm name is not one of the supported schemes.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The manifest names a different algorithm than the verifying key.
    #[error("algorithm mismatch: manifest uses {manifest}, public key is {key}")]
    AlgorithmMismatch { manifest: Algorithm, key: Algorithm },

    /// The firmware artifact could not be read.
    #[error("firmware artifact unavailable at {}: {source}", path.display())]
    DigestInputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The firmware digest does not match the manifest.
    #[error("firmware hash mismatch: manifest has {expected}, firmware is {actual}")]
    HashMismatch { expected: String, actual: String },

    /// A manifest field is present but cannot be decoded.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// The manifest could not be serialized or parsed as JSON.
    #[error("manifest serialization error: {0}")]
    ManifestSerialization(#[from] serde_json::Error),

    /// The secret variable holding the private key is not set.
    #[error("signing key secret {name} is not set")]
    MissingSecret { name: String },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
