//! Firmware manifest: the signed description shipped next to the binary.
//!
//! Canonical on-disk form (`manifest.json`):
//!
//! ```json
//! {
//!   "version": "a1b2c3d-20250101T1200-build",
//!   "algorithm": "ed25519",
//!   "signed_message": "sha256-digest",
//!   "hash": "<64 hex chars>",
//!   "signature": "<128 hex chars>"
//! }
//! ```
//!
//! Field order is fixed by the struct definition. The device updater reads
//! `version`, `hash` and `signature`; the other two fields pin down how the
//! signature was made. `version` is informational and not signed.

use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::algorithm::Algorithm;
use crate::digest::Digest;
use crate::error::SigningError;
use crate::scheme::FirmwareSignature;

/// Which bytes were handed to the signature algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignedMessage {
    /// The 32-byte SHA-256 digest of the firmware image.
    #[default]
    #[serde(rename = "sha256-digest")]
    Sha256Digest,
}

/// Versioned, signed record describing one firmware artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Free-form build identifier (not covered by the signature).
    pub version: String,
    /// Signature algorithm. Legacy manifests without this field are Ed25519.
    #[serde(default)]
    pub algorithm: Algorithm,
    /// Signed-message convention.
    #[serde(default)]
    pub signed_message: SignedMessage,
    /// SHA-256 of the firmware image (64 lowercase hex chars).
    pub hash: String,
    /// Signature over the digest (128 lowercase hex chars).
    pub signature: String,
}

impl Manifest {
    /// Assemble a manifest. Pure; does not re-verify the signature.
    pub fn build(version: impl Into<String>, algorithm: Algorithm, digest: &Digest, signature: &FirmwareSignature) -> Self {
        Self {
            version: version.into(),
            algorithm,
            signed_message: SignedMessage::Sha256Digest,
            hash: digest.to_hex(),
            signature: signature.to_hex(),
        }
    }

    /// Canonical bytes: two-space indented JSON with a trailing newline.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SigningError> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Parse a manifest and check that its hex fields decode.
    pub fn parse(bytes: &[u8]) -> Result<Self, SigningError> {
        let manifest: Manifest = serde_json::from_slice(bytes)?;
        manifest.digest()?;
        manifest.signature_bytes()?;
        Ok(manifest)
    }

    /// Decoded `hash` field.
    pub fn digest(&self) -> Result<Digest, SigningError> {
        require_lowercase_hex("hash", &self.hash)?;
        Digest::from_hex(&self.hash)
    }

    /// Decoded `signature` field.
    pub fn signature_bytes(&self) -> Result<FirmwareSignature, SigningError> {
        require_lowercase_hex("signature", &self.signature)?;
        FirmwareSignature::from_hex(self.algorithm, &self.signature)
    }

    /// Write the canonical form to `path`, creating parent directories.
    ///
    /// The file is written next to `path` and renamed into place, so a
    /// failed write never leaves a truncated manifest behind.
    pub fn write(&self, path: &Path) -> Result<(), SigningError> {
        let bytes = self.to_bytes()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::write(&tmp, bytes)?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, SigningError> {
        let data = std::fs::read(path)?;
        Self::parse(&data)
    }
}

/// The device compares `hash` as a string against its own lowercase hex, so
/// uppercase digits or surrounding whitespace would never verify there.
/// Length is checked by the decoders.
fn require_lowercase_hex(field: &str, value: &str) -> Result<(), SigningError> {
    if value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        Ok(())
    } else {
        Err(SigningError::InvalidManifest(format!("{field} must be lowercase hex without whitespace")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::digest;

    fn sample() -> Manifest {
        let d = digest(b"firmware");
        let sig = FirmwareSignature::from_bytes(Algorithm::Ed25519, &[0xab; 64]).unwrap();
        Manifest::build("abc1234-20250101T1200-build", Algorithm::Ed25519, &d, &sig)
    }

    #[test]
    fn build_encodes_lowercase_hex() {
        let manifest = sample();
        assert_eq!(manifest.hash, digest(b"firmware").to_hex());
        assert_eq!(manifest.signature, "ab".repeat(64));
        assert_eq!(manifest.signed_message, SignedMessage::Sha256Digest);
    }

    #[test]
    fn serialized_field_order_is_stable() {
        let bytes = sample().to_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let positions: Vec<usize> = ["\"version\"", "\"algorithm\"", "\"signed_message\"", "\"hash\"", "\"signature\""]
            .iter()
            .map(|field| text.find(field).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "unexpected order in {text}");
        assert!(text.contains("\n  \"version\""));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn serialization_is_deterministic() {
        assert_eq!(sample().to_bytes().unwrap(), sample().to_bytes().unwrap());
    }

    #[test]
    fn parse_roundtrip() {
        let manifest = sample();
        let parsed = Manifest::parse(&manifest.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn legacy_three_field_manifest_defaults() {
        let json = format!(
            r#"{{"version": "abc-20240101T0000-local", "hash": "{}", "signature": "{}"}}"#,
            digest(b"x").to_hex(),
            "00".repeat(64)
        );
        let manifest = Manifest::parse(json.as_bytes()).unwrap();
        assert_eq!(manifest.algorithm, Algorithm::Ed25519);
        assert_eq!(manifest.signed_message, SignedMessage::Sha256Digest);
    }

    #[test]
    fn unknown_convention_rejected() {
        let json = format!(
            r#"{{"version": "v", "signed_message": "raw-image", "hash": "{}", "signature": "{}"}}"#,
            digest(b"x").to_hex(),
            "00".repeat(64)
        );
        let err = Manifest::parse(json.as_bytes()).unwrap_err();
        assert!(matches!(err, SigningError::ManifestSerialization(_)));
    }

    #[test]
    fn unknown_algorithm_rejected() {
        let json = format!(
            r#"{{"version": "v", "algorithm": "rsa", "hash": "{}", "signature": "{}"}}"#,
            digest(b"x").to_hex(),
            "00".repeat(64)
        );
        assert!(Manifest::parse(json.as_bytes()).is_err());
    }

    #[test]
    fn short_signature_rejected() {
        let json = format!(r#"{{"version": "v", "hash": "{}", "signature": "abcd"}}"#, digest(b"x").to_hex());
        let err = Manifest::parse(json.as_bytes()).unwrap_err();
        assert!(matches!(err, SigningError::MalformedSignature { expected: 64, actual: 2 }));
    }

    #[test]
    fn bad_hash_rejected() {
        let json = format!(r#"{{"version": "v", "hash": "xyz", "signature": "{}"}}"#, "00".repeat(64));
        let err = Manifest::parse(json.as_bytes()).unwrap_err();
        assert!(matches!(err, SigningError::InvalidManifest(_)));
    }

    #[test]
    fn non_canonical_hex_rejected() {
        let manifest = sample();
        let variants = [
            Manifest {
                hash: manifest.hash.to_ascii_uppercase(),
                ..manifest.clone()
            },
            Manifest {
                hash: format!(" {} ", manifest.hash),
                ..manifest.clone()
            },
            Manifest {
                signature: manifest.signature.to_ascii_uppercase(),
                ..manifest.clone()
            },
            Manifest {
                signature: format!("{}\n", manifest.signature),
                ..manifest.clone()
            },
        ];
        for variant in variants {
            let err = Manifest::parse(&variant.to_bytes().unwrap()).unwrap_err();
            assert!(matches!(err, SigningError::InvalidManifest(_)), "accepted {variant:?}");
        }
    }

    #[test]
    fn missing_field_rejected() {
        let err = Manifest::parse(br#"{"version": "v", "hash": "00"}"#).unwrap_err();
        assert!(matches!(err, SigningError::ManifestSerialization(_)));
    }

    #[test]
    fn write_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("manifest.json");
        let manifest = sample();
        manifest.write(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), manifest.to_bytes().unwrap());
        assert_eq!(Manifest::load(&path).unwrap(), manifest);
    }
}
