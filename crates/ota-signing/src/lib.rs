//! ECDSA-P256 and Ed25519 signing and verification for OTA firmware images.
//!
//! Firmware is signed by computing `SHA-256(firmware)` and signing the 32-byte
//! digest. The [`Manifest`] carries the version, algorithm, signed-message
//! convention, hex digest and hex signature, and is shipped next to the binary.
//!
//! # Signing
//!
//! ```
//! use ota_signing::{keys, signer, verifier, Algorithm};
//!
//! let key = keys::generate(Algorithm::Ed25519);
//! let firmware = b"\x7fELF firmware image";
//! let manifest = signer::sign_firmware(firmware, &key, "abc1234-20250101T1200-build").unwrap();
//! assert!(verifier::verify_firmware(firmware, &manifest, key.public_key()).is_ok());
//! ```
//!
//! # Build pipelines
//!
//! [`SigningConfig::from_env`] resolves `FIRMWARE_VERSION`,
//! `FIRMWARE_ALGORITHM` and the key source once, and [`SigningPipeline`] turns
//! a firmware file into a `manifest.json`, attributing any failure to the
//! stage it happened in.

pub mod algorithm;
pub mod config;
pub mod digest;
pub mod error;
pub mod keys;
pub mod manifest;
pub mod pipeline;
pub mod scheme;
pub mod secret;
pub mod signer;
pub mod verifier;

pub use algorithm::Algorithm;
pub use config::KeySource;
pub use config::SigningConfig;
pub use digest::Digest;
pub use error::SigningError;
pub use keys::KeyPair;
pub use keys::PublicKey;
pub use manifest::Manifest;
pub use pipeline::PipelineError;
pub use pipeline::SigningPipeline;
pub use scheme::FirmwareSignature;
