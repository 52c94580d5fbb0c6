//! SHA-256 digest of firmware images.
//!
//! The digest is computed over the exact bytes of the image with no framing
//! or padding. It is the message that gets signed for both algorithms.

use std::fmt;
use std::io::Read;
use std::path::Path;

use sha2::Digest as _;
use sha2::Sha256;

use crate::error::SigningError;

/// Size of a SHA-256 digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// Read buffer used when hashing streams.
const CHUNK_SIZE: usize = 4096;

/// SHA-256 digest of a firmware image.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Wrap raw digest bytes.
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Decode a 64-char hex digest.
    pub fn from_hex(s: &str) -> Result<Self, SigningError> {
        let bytes = hex::decode(s).map_err(|e| SigningError::InvalidManifest(format!("digest hex: {e}")))?;
        let array: [u8; DIGEST_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            SigningError::InvalidManifest(format!("digest must be {DIGEST_LEN} bytes, got {}", b.len()))
        })?;
        Ok(Self(array))
    }

    /// The raw 32 bytes. These are the bytes passed to `sign` and `verify`.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex, 64 chars.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compute the SHA-256 digest of a firmware image.
pub fn digest(bytes: &[u8]) -> Digest {
    Digest(Sha256::digest(bytes).into())
}

/// Compute the digest of a stream, reading it in fixed-size chunks.
pub fn digest_reader<R: Read>(mut reader: R) -> std::io::Result<Digest> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(Digest(hasher.finalize().into()))
}

/// Compute the digest of a firmware file.
pub fn digest_file(path: &Path) -> Result<Digest, SigningError> {
    let unavailable = |source: std::io::Error| SigningError::DigestInputUnavailable {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::open(path).map_err(unavailable)?;
    let digest = digest_reader(std::io::BufReader::new(file)).map_err(unavailable)?;
    tracing::debug!(path = %path.display(), digest = %digest, "digested firmware file");
    Ok(digest)
}
