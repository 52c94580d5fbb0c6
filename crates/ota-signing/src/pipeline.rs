//! End-to-end signing of a firmware file into a manifest file.
//!
//! Stages run strictly in order: digest the artifact, load the key, sign,
//! write the manifest. Any manifest already at the output path is removed
//! before the first stage, so a failed run leaves no manifest behind; there is
//! no degraded mode for a signed artifact.

use std::fmt;
use std::path::Path;

use crate::config::SigningConfig;
use crate::digest::digest_file;
use crate::digest::Digest;
use crate::error::SigningError;
use crate::keys::PublicKey;
use crate::manifest::Manifest;
use crate::secret;
use crate::signer;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Digest,
    Key,
    Sign,
    Manifest,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Digest => "digest",
            Stage::Key => "key",
            Stage::Sign => "sign",
            Stage::Manifest => "manifest",
        })
    }
}

/// A signing failure and the stage it happened in.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: SigningError,
}

fn at(stage: Stage) -> impl Fn(SigningError) -> PipelineError {
    move |source| PipelineError { stage, source }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct SignedRelease {
    pub manifest: Manifest,
    pub digest: Digest,
    /// Public key that verifies the release; must match the device constant.
    pub public_key: PublicKey,
}

/// Signs one firmware artifact per [`run`](SigningPipeline::run).
#[derive(Debug, Clone)]
pub struct SigningPipeline {
    config: SigningConfig,
}

impl SigningPipeline {
    pub fn new(config: SigningConfig) -> Self {
        Self { config }
    }

    /// Digest `firmware`, sign it, and write the manifest to `manifest_path`.
    pub fn run(&self, firmware: &Path, manifest_path: &Path) -> Result<SignedRelease, PipelineError> {
        remove_stale_manifest(manifest_path).map_err(at(Stage::Manifest))?;

        let digest = digest_file(firmware).map_err(at(Stage::Digest))?;
        tracing::debug!(firmware = %firmware.display(), %digest, "digest stage complete");

        // Key material lives only inside this block.
        let (manifest, public_key) = {
            let key = secret::load_keypair(&self.config.key_source, self.config.algorithm).map_err(at(Stage::Key))?;
            if let Some(expected) = &self.config.expected_public_key {
                key.ensure_public_matches(expected).map_err(at(Stage::Key))?;
            }
            let manifest = signer::sign_digest(&digest, &key, &self.config.version).map_err(at(Stage::Sign))?;
            (manifest, key.public_key().clone())
        };

        manifest.write(manifest_path).map_err(at(Stage::Manifest))?;

        tracing::info!(
            version = %manifest.version,
            algorithm = %manifest.algorithm,
            %digest,
            public_key = %public_key.to_hex(),
            manifest = %manifest_path.display(),
            "firmware signed"
        );
        Ok(SignedRelease {
            manifest,
            digest,
            public_key,
        })
    }
}

fn remove_stale_manifest(path: &Path) -> Result<(), SigningError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(manifest = %path.display(), "removed previous manifest");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::algorithm::Algorithm;
    use crate::config::KeySource;
    use crate::keys;
    use crate::verifier::verify_firmware;

    struct Fixture {
        _dir: tempfile::TempDir,
        firmware: PathBuf,
        key_file: PathBuf,
        manifest: PathBuf,
    }

    fn fixture(key: &keys::KeyPair) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let firmware = dir.path().join("firmware.bin");
        std::fs::write(&firmware, vec![0x5a; 10_000]).unwrap();
        let key_file = dir.path().join("signing.key");
        keys::save_secret_key(&key_file, key).unwrap();
        let manifest = dir.path().join("dist").join("manifest.json");
        Fixture {
            _dir: dir,
            firmware,
            key_file,
            manifest,
        }
    }

    fn config(algorithm: Algorithm, key_file: &Path) -> SigningConfig {
        SigningConfig {
            version: "abc1234-20250101T1200-build".to_string(),
            algorithm,
            key_source: KeySource::File(key_file.to_path_buf()),
            expected_public_key: None,
        }
    }

    #[test]
    fn run_writes_verifiable_manifest() {
        for algorithm in [Algorithm::Ed25519, Algorithm::EcdsaP256Sha256] {
            let key = keys::generate(algorithm);
            let fx = fixture(&key);

            let release = SigningPipeline::new(config(algorithm, &fx.key_file)).run(&fx.firmware, &fx.manifest).unwrap();
            assert_eq!(&release.public_key, key.public_key());

            let written = Manifest::load(&fx.manifest).unwrap();
            assert_eq!(written, release.manifest);
            let firmware = std::fs::read(&fx.firmware).unwrap();
            assert_eq!(verify_firmware(&firmware, &written, key.public_key()).unwrap(), release.digest);
        }
    }

    #[test]
    fn missing_firmware_fails_digest_stage() {
        let key = keys::generate(Algorithm::Ed25519);
        let fx = fixture(&key);
        let err = SigningPipeline::new(config(Algorithm::Ed25519, &fx.key_file))
            .run(&fx.firmware.with_extension("missing"), &fx.manifest)
            .unwrap_err();
        assert_eq!(err.stage, Stage::Digest);
        assert!(matches!(err.source, SigningError::DigestInputUnavailable { .. }));
        assert!(!fx.manifest.exists());
    }

    #[test]
    fn failed_run_removes_previous_manifest() {
        let key = keys::generate(Algorithm::Ed25519);
        let fx = fixture(&key);
        SigningPipeline::new(config(Algorithm::Ed25519, &fx.key_file)).run(&fx.firmware, &fx.manifest).unwrap();
        assert!(fx.manifest.exists());

        // Next release: the new image is missing, so the old manifest must not survive.
        std::fs::remove_file(&fx.firmware).unwrap();
        let err = SigningPipeline::new(config(Algorithm::Ed25519, &fx.key_file))
            .run(&fx.firmware, &fx.manifest)
            .unwrap_err();
        assert_eq!(err.stage, Stage::Digest);
        assert!(!fx.manifest.exists());

        std::fs::write(&fx.firmware, b"next release").unwrap();
        std::fs::write(&fx.manifest, b"{}").unwrap();
        let mut cfg = config(Algorithm::Ed25519, &fx.key_file);
        cfg.key_source = KeySource::Env("OTA_SIGNING_TEST_UNSET_SECRET".to_string());
        let err = SigningPipeline::new(cfg).run(&fx.firmware, &fx.manifest).unwrap_err();
        assert_eq!(err.stage, Stage::Key);
        assert!(!fx.manifest.exists());
    }

    #[test]
    fn missing_secret_fails_key_stage() {
        let key = keys::generate(Algorithm::Ed25519);
        let fx = fixture(&key);
        let mut cfg = config(Algorithm::Ed25519, &fx.key_file);
        cfg.key_source = KeySource::Env("OTA_SIGNING_TEST_UNSET_SECRET".to_string());
        let err = SigningPipeline::new(cfg).run(&fx.firmware, &fx.manifest).unwrap_err();
        assert_eq!(err.stage, Stage::Key);
        assert!(matches!(err.source, SigningError::MissingSecret { .. }));
        assert!(!fx.manifest.exists());
    }

    #[test]
    fn device_key_mismatch_fails_before_signing() {
        let key = keys::generate(Algorithm::Ed25519);
        let other = keys::generate(Algorithm::Ed25519);
        let fx = fixture(&key);
        let mut cfg = config(Algorithm::Ed25519, &fx.key_file);
        cfg.expected_public_key = Some(other.public_key().to_hex());

        let err = SigningPipeline::new(cfg).run(&fx.firmware, &fx.manifest).unwrap_err();
        assert_eq!(err.stage, Stage::Key);
        assert!(matches!(err.source, SigningError::KeyMismatch { .. }));
        assert!(err.to_string().starts_with("key stage failed"));
        assert!(!fx.manifest.exists());
    }

    #[test]
    fn matching_device_key_is_accepted() {
        let key = keys::generate(Algorithm::EcdsaP256Sha256);
        let fx = fixture(&key);
        let mut cfg = config(Algorithm::EcdsaP256Sha256, &fx.key_file);
        cfg.expected_public_key = Some(key.public_key().to_hex().to_ascii_uppercase());
        SigningPipeline::new(cfg).run(&fx.firmware, &fx.manifest).unwrap();
    }

    #[test]
    fn unwritable_manifest_fails_manifest_stage() {
        let key = keys::generate(Algorithm::Ed25519);
        let fx = fixture(&key);
        // A regular file where the parent directory should be.
        let blocker = fx.firmware.parent().unwrap().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let err = SigningPipeline::new(config(Algorithm::Ed25519, &fx.key_file))
            .run(&fx.firmware, &blocker.join("manifest.json"))
            .unwrap_err();
        assert_eq!(err.stage, Stage::Manifest);
    }
}
