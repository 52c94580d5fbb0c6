//! Signing key material: generation, hex/PEM encodings, and key files.
//!
//! Private keys are 32 bytes for both algorithms (a big-endian P-256 scalar or
//! an Ed25519 seed). Public keys are always re-derived from the private bytes;
//! a claimed public key is only ever compared against the derived one.

use std::fmt;
use std::io::Write;
use std::path::Path;

use zeroize::Zeroizing;

use crate::algorithm::Algorithm;
use crate::algorithm::PRIVATE_KEY_LEN;
use crate::error::SigningError;
use crate::scheme;

/// Line ending used for PEM output.
const PEM_LINE_ENDING: p256::pkcs8::LineEnding = p256::pkcs8::LineEnding::LF;

/// A public verification key, as embedded in device firmware.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    algorithm: Algorithm,
    bytes: Vec<u8>,
}

impl PublicKey {
    /// Decode a public key from raw bytes, checking length and curve membership.
    pub fn from_bytes(algorithm: Algorithm, bytes: &[u8]) -> Result<Self, SigningError> {
        if bytes.len() != algorithm.public_key_len() {
            return Err(SigningError::MalformedKey {
                algorithm,
                reason: format!("expected {} bytes, got {}", algorithm.public_key_len(), bytes.len()),
            });
        }
        scheme::check_public_key(algorithm, bytes)?;
        Ok(Self {
            algorithm,
            bytes: bytes.to_vec(),
        })
    }

    /// Decode a lowercase or uppercase hex public key.
    ///
    /// Wrong length or non-hex characters fail with `InvalidKeyEncoding`; a
    /// correctly sized value that is not a curve point fails with `MalformedKey`.
    pub fn from_hex(algorithm: Algorithm, s: &str) -> Result<Self, SigningError> {
        let s = s.trim();
        let expected = algorithm.public_key_len() * 2;
        if s.len() != expected {
            return Err(SigningError::InvalidKeyEncoding(format!(
                "{algorithm} public key must be {expected} hex chars, got {}",
                s.len()
            )));
        }
        let bytes = hex::decode(s)
            .map_err(|e| SigningError::InvalidKeyEncoding(format!("{algorithm} public key: {e}")))?;
        Self::from_bytes(algorithm, &bytes)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hex: 128 chars for ECDSA, 64 for Ed25519.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// SubjectPublicKeyInfo PEM, for tooling that expects standard key files.
    pub fn to_pem(&self) -> Result<String, SigningError> {
        let pem = match self.algorithm {
            Algorithm::EcdsaP256Sha256 => {
                use p256::pkcs8::EncodePublicKey;
                let mut sec1 = Vec::with_capacity(self.bytes.len() + 1);
                sec1.push(0x04);
                sec1.extend_from_slice(&self.bytes);
                let key = p256::PublicKey::from_sec1_bytes(&sec1).map_err(|e| SigningError::MalformedKey {
                    algorithm: self.algorithm,
                    reason: e.to_string(),
                })?;
                key.to_public_key_pem(PEM_LINE_ENDING)
            }
            Algorithm::Ed25519 => {
                use ed25519_dalek::pkcs8::EncodePublicKey;
                let array: [u8; 32] = self.bytes.as_slice().try_into().map_err(|_| SigningError::MalformedKey {
                    algorithm: self.algorithm,
                    reason: "expected 32 bytes".to_string(),
                })?;
                let key = ed25519_dalek::VerifyingKey::from_bytes(&array).map_err(|e| SigningError::MalformedKey {
                    algorithm: self.algorithm,
                    reason: e.to_string(),
                })?;
                key.to_public_key_pem(PEM_LINE_ENDING)
            }
        };
        pem.map_err(|e| SigningError::InvalidKeyEncoding(format!("PEM encoding: {e}")))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}, {})", self.algorithm, self.to_hex())
    }
}

/// A signing keypair. The private half is zeroized on drop.
pub struct KeyPair {
    algorithm: Algorithm,
    private: Zeroizing<[u8; PRIVATE_KEY_LEN]>,
    public: PublicKey,
}

impl KeyPair {
    /// Build a keypair from private bytes, deriving the public key.
    ///
    /// For ECDSA the bytes must be a scalar in `[1, n-1]`.
    pub fn from_private_bytes(algorithm: Algorithm, private: &[u8; PRIVATE_KEY_LEN]) -> Result<Self, SigningError> {
        Self::from_secret(algorithm, Zeroizing::new(*private))
    }

    fn from_secret(algorithm: Algorithm, private: Zeroizing<[u8; PRIVATE_KEY_LEN]>) -> Result<Self, SigningError> {
        let public = derive_public(algorithm, &private)?;
        Ok(Self {
            algorithm,
            private,
            public,
        })
    }

    /// Decode a 64-char hex private key.
    pub fn from_private_hex(algorithm: Algorithm, s: &str) -> Result<Self, SigningError> {
        let s = s.trim();
        if s.len() != PRIVATE_KEY_LEN * 2 {
            return Err(SigningError::InvalidKeyEncoding(format!(
                "private key must be {} hex chars, got {}",
                PRIVATE_KEY_LEN * 2,
                s.len()
            )));
        }
        let mut private = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
        // The hex crate's messages echo the offending character; keep them out.
        hex::decode_to_slice(s, &mut private[..])
            .map_err(|_| SigningError::InvalidKeyEncoding("private key contains non-hex characters".to_string()))?;
        Self::from_secret(algorithm, private)
    }

    /// Decode a PKCS#8 PEM private key for the given algorithm.
    pub fn from_pkcs8_pem(algorithm: Algorithm, pem: &str) -> Result<Self, SigningError> {
        let invalid = |e: &dyn fmt::Display| SigningError::InvalidKeyEncoding(format!("{algorithm} PKCS#8 PEM: {e}"));
        let mut private = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
        match algorithm {
            Algorithm::EcdsaP256Sha256 => {
                use p256::pkcs8::DecodePrivateKey;
                let key = p256::SecretKey::from_pkcs8_pem(pem.trim()).map_err(|e| invalid(&e))?;
                private.copy_from_slice(&key.to_bytes());
            }
            Algorithm::Ed25519 => {
                use ed25519_dalek::pkcs8::DecodePrivateKey;
                let key = ed25519_dalek::SigningKey::from_pkcs8_pem(pem.trim()).map_err(|e| invalid(&e))?;
                private.copy_from_slice(key.as_bytes());
            }
        }
        Self::from_secret(algorithm, private)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub(crate) fn private_bytes(&self) -> &[u8; PRIVATE_KEY_LEN] {
        &self.private
    }

    /// Encode as `(private_hex, public_hex)`, lowercase with no separators.
    pub fn encode_hex(&self) -> (Zeroizing<String>, String) {
        (Zeroizing::new(hex::encode(&self.private[..])), self.public.to_hex())
    }

    /// Check the derived public key against a recorded one, such as the
    /// constant compiled into device firmware.
    pub fn ensure_public_matches(&self, expected_hex: &str) -> Result<(), SigningError> {
        let expected = expected_hex.trim().to_ascii_lowercase();
        let derived = self.public.to_hex();
        if expected != derived {
            return Err(SigningError::KeyMismatch { expected, derived });
        }
        Ok(())
    }

    /// PKCS#8 PEM encoding of the private key.
    pub fn to_pkcs8_pem(&self) -> Result<Zeroizing<String>, SigningError> {
        let pem = match self.algorithm {
            Algorithm::EcdsaP256Sha256 => {
                use p256::pkcs8::EncodePrivateKey;
                let key = p256::SecretKey::from_slice(&self.private[..])
                    .map_err(|_| SigningError::InvalidKeyEncoding("ECDSA private scalar out of range".to_string()))?;
                key.to_pkcs8_pem(PEM_LINE_ENDING)
            }
            Algorithm::Ed25519 => {
                use ed25519_dalek::pkcs8::EncodePrivateKey;
                ed25519_dalek::SigningKey::from_bytes(&self.private).to_pkcs8_pem(PEM_LINE_ENDING)
            }
        };
        pem.map_err(|e| SigningError::InvalidKeyEncoding(format!("PEM encoding: {e}")))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm)
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Generate a new keypair from the OS random number generator.
pub fn generate(algorithm: Algorithm) -> KeyPair {
    let private: [u8; PRIVATE_KEY_LEN] = match algorithm {
        Algorithm::EcdsaP256Sha256 => {
            let key = p256::ecdsa::SigningKey::random(&mut rand_core::OsRng);
            let mut out = [0u8; PRIVATE_KEY_LEN];
            out.copy_from_slice(&key.to_bytes());
            out
        }
        Algorithm::Ed25519 => ed25519_dalek::SigningKey::generate(&mut rand_core::OsRng).to_bytes(),
    };
    let private = Zeroizing::new(private);
    // Fresh keys are valid by construction: a nonzero P-256 scalar or any seed.
    let public = match derive_public(algorithm, &private) {
        Ok(public) => public,
        Err(e) => unreachable!("freshly generated {algorithm} key failed to derive: {e}"),
    };
    KeyPair {
        algorithm,
        private,
        public,
    }
}

/// Derive the public key for a private key.
pub fn derive_public(algorithm: Algorithm, private: &[u8; PRIVATE_KEY_LEN]) -> Result<PublicKey, SigningError> {
    let bytes = scheme::derive_public(algorithm, private)?;
    Ok(PublicKey { algorithm, bytes })
}

/// Save a private key to a file in hex format.
///
/// Sets file permissions to 0o600 on Unix.
pub fn save_secret_key(path: &Path, key: &KeyPair) -> Result<(), SigningError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let (private_hex, _) = key.encode_hex();

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // `mode` only applies on creation; tighten a pre-existing file too.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(private_hex.as_bytes())?;

    Ok(())
}

/// Load a private key from a file holding either hex or PKCS#8 PEM.
pub fn load_secret_key(path: &Path, algorithm: Algorithm) -> Result<KeyPair, SigningError> {
    let contents = Zeroizing::new(std::fs::read_to_string(path)?);
    if contents.trim_start().starts_with("-----BEGIN") {
        KeyPair::from_pkcs8_pem(algorithm, &contents)
    } else {
        KeyPair::from_private_hex(algorithm, &contents)
    }
}
