//! Supported signature algorithms.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::error::SigningError;

/// Length of every private key (ECDSA scalar or Ed25519 seed) in bytes.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Length of every firmware signature in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// Signature scheme used for a firmware release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// ECDSA over secp256r1 with the SHA-256 digest as prehash.
    #[serde(rename = "ecdsa-p256-sha256")]
    EcdsaP256Sha256,
    /// Ed25519 with the SHA-256 digest as message.
    #[default]
    #[serde(rename = "ed25519")]
    Ed25519,
}

impl Algorithm {
    /// Canonical lowercase name, as written in manifests.
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::EcdsaP256Sha256 => "ecdsa-p256-sha256",
            Algorithm::Ed25519 => "ed25519",
        }
    }

    /// Length of the encoded public key in bytes.
    ///
    /// ECDSA keys are the untagged uncompressed point `X || Y`.
    pub fn public_key_len(self) -> usize {
        match self {
            Algorithm::EcdsaP256Sha256 => 64,
            Algorithm::Ed25519 => 32,
        }
    }

    /// Environment variable conventionally holding this algorithm's private key hex.
    pub fn secret_env_var(self) -> &'static str {
        match self {
            Algorithm::EcdsaP256Sha256 => "ECDSA_PRIVATE_KEY_HEX",
            Algorithm::Ed25519 => "ED25519_PRIVATE_KEY_HEX",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ed25519" => Ok(Algorithm::Ed25519),
            "ecdsa-p256-sha256" | "ecdsa-p256" | "ecdsa" | "p256" => Ok(Algorithm::EcdsaP256Sha256),
            _ => Err(SigningError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}
