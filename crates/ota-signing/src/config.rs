//! Signing configuration, resolved once from the build environment.

use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

use chrono::DateTime;
use chrono::Utc;

use crate::algorithm::Algorithm;
use crate::error::SigningError;

/// Firmware version string.
pub const VERSION_VAR: &str = "FIRMWARE_VERSION";
/// Signing algorithm name.
pub const ALGORITHM_VAR: &str = "FIRMWARE_ALGORITHM";
/// Path to a private key file; takes precedence over the per-algorithm secret variable.
pub const KEY_FILE_VAR: &str = "FIRMWARE_SIGNING_KEY_FILE";
/// Public key compiled into the device firmware.
pub const PUBLIC_KEY_VAR: &str = "FIRMWARE_PUBLIC_KEY_HEX";

/// Where the private signing key is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Hex private key held in an environment variable (a CI secret).
    Env(String),
    /// Hex or PKCS#8 PEM private key file.
    File(PathBuf),
}

/// Everything the signing pipeline needs before touching key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningConfig {
    pub version: String,
    pub algorithm: Algorithm,
    pub key_source: KeySource,
    /// When set, the loaded key must derive exactly this public key.
    pub expected_public_key: Option<String>,
}

impl SigningConfig {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self, SigningError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SigningError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let algorithm = match get(ALGORITHM_VAR) {
            Some(name) => name.parse()?,
            None => Algorithm::default(),
        };
        let version = get(VERSION_VAR).unwrap_or_else(local_version);
        let key_source = match get(KEY_FILE_VAR) {
            Some(path) => KeySource::File(PathBuf::from(path)),
            None => KeySource::Env(algorithm.secret_env_var().to_string()),
        };
        let expected_public_key = get(PUBLIC_KEY_VAR);

        tracing::debug!(%version, %algorithm, ?key_source, "resolved signing configuration");
        Ok(Self {
            version,
            algorithm,
            key_source,
            expected_public_key,
        })
    }
}

/// Version for builds without `FIRMWARE_VERSION`: `<git short rev>-<UTC YYYYMMDDTHHMM>-local`.
pub fn local_version() -> String {
    let rev = git_short_rev().unwrap_or_else(|| "unknown".to_string());
    format!("{rev}-{}-local", format_build_timestamp(Utc::now()))
}

fn git_short_rev() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let rev = String::from_utf8(output.stdout).ok()?.trim().to_string();
    (!rev.is_empty()).then_some(rev)
}

/// Formats a build time as `YYYYMMDDTHHMM` in UTC.
pub fn format_build_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M").to_string()
}
