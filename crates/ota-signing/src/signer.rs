//! Firmware signing: SHA-256 digest, then a signature over the digest.

use crate::digest::digest;
use crate::digest::Digest;
use crate::error::SigningError;
use crate::keys::KeyPair;
use crate::manifest::Manifest;
use crate::scheme;

/// Sign a firmware image.
///
/// Computes `SHA-256(firmware)`, signs the digest with `key`, checks the new
/// signature against the key's own public half, and returns the manifest.
pub fn sign_firmware(firmware: &[u8], key: &KeyPair, version: &str) -> Result<Manifest, SigningError> {
    sign_digest(&digest(firmware), key, version)
}

/// Sign an already computed firmware digest.
pub fn sign_digest(digest: &Digest, key: &KeyPair, version: &str) -> Result<Manifest, SigningError> {
    let signature = scheme::sign(key, digest)?;
    scheme::require_valid(key.public_key(), digest, &signature)?;
    Ok(Manifest::build(version, key.algorithm(), digest, &signature))
}
