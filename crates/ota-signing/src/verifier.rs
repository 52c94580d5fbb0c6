//! Firmware verification, as performed by the device updater.

use crate::digest::digest;
use crate::digest::Digest;
use crate::error::SigningError;
use crate::keys::PublicKey;
use crate::manifest::Manifest;
use crate::scheme;

/// Verify a firmware image against its manifest.
///
/// Steps:
/// 1. Check the manifest algorithm matches the trusted public key
/// 2. Compute `SHA-256(firmware)` and check it matches `manifest.hash`
/// 3. Verify the signature over the computed digest
///
/// Returns the verified digest.
pub fn verify_firmware(firmware: &[u8], manifest: &Manifest, public_key: &PublicKey) -> Result<Digest, SigningError> {
    // Step 1: Algorithm agreement
    if manifest.algorithm != public_key.algorithm() {
        return Err(SigningError::AlgorithmMismatch {
            manifest: manifest.algorithm,
            key: public_key.algorithm(),
        });
    }

    // Step 2: Check hash matches, as the exact lowercase hex string the device compares
    let actual = digest(firmware);
    if manifest.hash != actual.to_hex() {
        return Err(SigningError::HashMismatch {
            expected: manifest.hash.clone(),
            actual: actual.to_hex(),
        });
    }

    // Step 3: Verify signature over the digest
    verify_manifest_signature(manifest, public_key)?;

    tracing::info!(version = %manifest.version, algorithm = %manifest.algorithm, digest = %actual, "firmware verified");
    Ok(actual)
}

/// Verify only that the manifest signature covers the manifest hash.
///
/// This alone does not tie the manifest to any firmware image; use
/// [`verify_firmware`] for that.
pub fn verify_manifest_signature(manifest: &Manifest, public_key: &PublicKey) -> Result<(), SigningError> {
    let digest = manifest.digest()?;
    let signature = manifest.signature_bytes()?;
    scheme::require_valid(public_key, &digest, &signature)
}
