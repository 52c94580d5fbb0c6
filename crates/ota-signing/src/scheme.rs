//! Signature schemes over firmware digests.
//!
//! The signed message is always the 32-byte SHA-256 digest of the firmware,
//! for both algorithms:
//!
//! - ECDSA-P256-SHA256 uses the digest as the prehash input (RFC 6979 nonces),
//!   so the device calls `verify_prehash` with the digest it computed while
//!   streaming the download.
//! - Ed25519 uses the digest as the message. Ed25519 hashes its message again
//!   with SHA-512 internally, so the device must hand the same 32 digest bytes
//!   to its verifier, never the raw image.
//!
//! Taking a [`Digest`] instead of a byte slice makes signing or verifying the
//! raw image a type error.

use std::fmt;

use crate::algorithm::Algorithm;
use crate::algorithm::PRIVATE_KEY_LEN;
use crate::algorithm::SIGNATURE_LEN;
use crate::digest::Digest;
use crate::error::SigningError;
use crate::keys::KeyPair;
use crate::keys::PublicKey;

/// Capability set of one signature algorithm.
///
/// Implementations are stateless; every call is a pure function of its inputs.
pub trait SignatureScheme {
    /// Algorithm tag written to manifests.
    const ALGORITHM: Algorithm;

    /// Derive the encoded public key from private key bytes.
    fn derive_public(private: &[u8; PRIVATE_KEY_LEN]) -> Result<Vec<u8>, SigningError>;

    /// Sign a firmware digest.
    fn sign(private: &[u8; PRIVATE_KEY_LEN], digest: &Digest) -> Result<[u8; SIGNATURE_LEN], SigningError>;

    /// Check that correctly sized public key bytes decode to a usable key.
    fn check_public(public: &[u8]) -> Result<(), String>;

    /// Verify a signature over a digest. Lengths are already checked; any
    /// decoding failure past that point is an invalid signature.
    fn verify(public: &[u8], digest: &Digest, signature: &[u8; SIGNATURE_LEN]) -> bool;
}

/// ECDSA over NIST P-256 with SHA-256.
pub struct EcdsaP256Sha256;

impl EcdsaP256Sha256 {
    fn signing_key(private: &[u8; PRIVATE_KEY_LEN]) -> Result<p256::ecdsa::SigningKey, SigningError> {
        p256::ecdsa::SigningKey::from_slice(private)
            .map_err(|_| SigningError::InvalidKeyEncoding("ECDSA private scalar must be in [1, n-1]".to_string()))
    }

    fn verifying_key(public: &[u8]) -> Result<p256::ecdsa::VerifyingKey, p256::ecdsa::Error> {
        // Stored keys are the untagged point X || Y; SEC1 wants the 0x04 tag.
        let mut sec1 = Vec::with_capacity(public.len() + 1);
        sec1.push(0x04);
        sec1.extend_from_slice(public);
        p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
    }
}

impl SignatureScheme for EcdsaP256Sha256 {
    const ALGORITHM: Algorithm = Algorithm::EcdsaP256Sha256;

    fn derive_public(private: &[u8; PRIVATE_KEY_LEN]) -> Result<Vec<u8>, SigningError> {
        let key = Self::signing_key(private)?;
        let point = key.verifying_key().to_encoded_point(false);
        Ok(point.as_bytes()[1..].to_vec())
    }

    fn sign(private: &[u8; PRIVATE_KEY_LEN], digest: &Digest) -> Result<[u8; SIGNATURE_LEN], SigningError> {
        use p256::ecdsa::signature::hazmat::PrehashSigner;

        let key = Self::signing_key(private)?;
        let signature: p256::ecdsa::Signature =
            key.sign_prehash(digest.as_bytes()).map_err(|e| SigningError::SigningFailed(e.to_string()))?;
        let mut out = [0u8; SIGNATURE_LEN];
        out.copy_from_slice(&signature.to_bytes());
        Ok(out)
    }

    fn check_public(public: &[u8]) -> Result<(), String> {
        Self::verifying_key(public).map(|_| ()).map_err(|_| "not a point on P-256".to_string())
    }

    fn verify(public: &[u8], digest: &Digest, signature: &[u8; SIGNATURE_LEN]) -> bool {
        use p256::ecdsa::signature::hazmat::PrehashVerifier;

        let Ok(key) = Self::verifying_key(public) else {
            tracing::debug!("ECDSA public key is not a curve point");
            return false;
        };
        // r or s of zero or >= n
        let Ok(signature) = p256::ecdsa::Signature::from_slice(signature) else {
            tracing::debug!("ECDSA signature scalars out of range");
            return false;
        };
        key.verify_prehash(digest.as_bytes(), &signature).is_ok()
    }
}

/// Ed25519 (RFC 8032, pure mode) with the digest as message.
pub struct Ed25519;

impl SignatureScheme for Ed25519 {
    const ALGORITHM: Algorithm = Algorithm::Ed25519;

    fn derive_public(private: &[u8; PRIVATE_KEY_LEN]) -> Result<Vec<u8>, SigningError> {
        let key = ed25519_dalek::SigningKey::from_bytes(private);
        Ok(key.verifying_key().to_bytes().to_vec())
    }

    fn sign(private: &[u8; PRIVATE_KEY_LEN], digest: &Digest) -> Result<[u8; SIGNATURE_LEN], SigningError> {
        use ed25519_dalek::Signer;

        let key = ed25519_dalek::SigningKey::from_bytes(private);
        Ok(key.sign(digest.as_bytes()).to_bytes())
    }

    fn check_public(public: &[u8]) -> Result<(), String> {
        let array: [u8; 32] = public.try_into().map_err(|_| "expected 32 bytes".to_string())?;
        ed25519_dalek::VerifyingKey::from_bytes(&array).map(|_| ()).map_err(|e| e.to_string())
    }

    fn verify(public: &[u8], digest: &Digest, signature: &[u8; SIGNATURE_LEN]) -> bool {
        use ed25519_dalek::Verifier;

        let Ok(array) = <[u8; 32]>::try_from(public) else {
            return false;
        };
        let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(&array) else {
            tracing::debug!("Ed25519 public key does not decompress");
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(signature);
        key.verify(digest.as_bytes(), &signature).is_ok()
    }
}

/// A 64-byte firmware signature tagged with its algorithm.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FirmwareSignature {
    algorithm: Algorithm,
    bytes: [u8; SIGNATURE_LEN],
}

impl FirmwareSignature {
    /// Wrap signature bytes, rejecting anything that is not exactly 64 bytes.
    pub fn from_bytes(algorithm: Algorithm, bytes: &[u8]) -> Result<Self, SigningError> {
        let bytes: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|_| SigningError::MalformedSignature {
            expected: SIGNATURE_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self { algorithm, bytes })
    }

    /// Decode a 128-char hex signature.
    pub fn from_hex(algorithm: Algorithm, s: &str) -> Result<Self, SigningError> {
        let bytes = hex::decode(s).map_err(|e| SigningError::InvalidManifest(format!("signature hex: {e}")))?;
        Self::from_bytes(algorithm, &bytes)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.bytes
    }

    /// Lowercase hex, 128 chars.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for FirmwareSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FirmwareSignature({}, {})", self.algorithm, self.to_hex())
    }
}

/// Derive the encoded public key for `algorithm`.
pub fn derive_public(algorithm: Algorithm, private: &[u8; PRIVATE_KEY_LEN]) -> Result<Vec<u8>, SigningError> {
    match algorithm {
        Algorithm::EcdsaP256Sha256 => EcdsaP256Sha256::derive_public(private),
        Algorithm::Ed25519 => Ed25519::derive_public(private),
    }
}

/// Sign a firmware digest with the keypair's algorithm.
pub fn sign(key: &KeyPair, digest: &Digest) -> Result<FirmwareSignature, SigningError> {
    let signature = match key.algorithm() {
        Algorithm::EcdsaP256Sha256 => sign_with::<EcdsaP256Sha256>(key, digest)?,
        Algorithm::Ed25519 => sign_with::<Ed25519>(key, digest)?,
    };
    tracing::debug!(algorithm = %signature.algorithm, digest = %digest, "signed firmware digest");
    Ok(signature)
}

fn sign_with<S: SignatureScheme>(key: &KeyPair, digest: &Digest) -> Result<FirmwareSignature, SigningError> {
    debug_assert_eq!(key.algorithm(), S::ALGORITHM);
    Ok(FirmwareSignature {
        algorithm: S::ALGORITHM,
        bytes: S::sign(key.private_bytes(), digest)?,
    })
}

/// Verify a signature over a digest.
///
/// Returns `Ok(false)` for any well-formed but invalid input. Only a
/// signature or key of the wrong length is an error.
pub fn verify(algorithm: Algorithm, public: &[u8], digest: &Digest, signature: &[u8]) -> Result<bool, SigningError> {
    let signature: &[u8; SIGNATURE_LEN] = signature.try_into().map_err(|_| SigningError::MalformedSignature {
        expected: SIGNATURE_LEN,
        actual: signature.len(),
    })?;
    if public.len() != algorithm.public_key_len() {
        return Err(SigningError::MalformedKey {
            algorithm,
            reason: format!("expected {} bytes, got {}", algorithm.public_key_len(), public.len()),
        });
    }
    let valid = match algorithm {
        Algorithm::EcdsaP256Sha256 => EcdsaP256Sha256::verify(public, digest, signature),
        Algorithm::Ed25519 => Ed25519::verify(public, digest, signature),
    };
    Ok(valid)
}

/// Verify, turning an invalid signature into `VerificationFailed`.
pub fn require_valid(public: &PublicKey, digest: &Digest, signature: &FirmwareSignature) -> Result<(), SigningError> {
    if signature.algorithm() != public.algorithm() {
        return Err(SigningError::AlgorithmMismatch {
            manifest: signature.algorithm(),
            key: public.algorithm(),
        });
    }
    if verify(public.algorithm(), public.as_bytes(), digest, signature.as_bytes())? {
        Ok(())
    } else {
        Err(SigningError::VerificationFailed {
            public_key: public.to_hex(),
            digest: digest.to_hex(),
        })
    }
}

pub(crate) fn check_public_key(algorithm: Algorithm, public: &[u8]) -> Result<(), SigningError> {
    let checked = match algorithm {
        Algorithm::EcdsaP256Sha256 => EcdsaP256Sha256::check_public(public),
        Algorithm::Ed25519 => Ed25519::check_public(public),
    };
    checked.map_err(|reason| SigningError::MalformedKey { algorithm, reason })
}
