//! `ota-sign sign`: sign a firmware image and write its manifest.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use ota_signing::config;
use ota_signing::SigningConfig;
use ota_signing::SigningPipeline;

/// Command-line values that take precedence over the build environment.
#[derive(Debug, Default)]
pub struct Overrides {
    pub version: Option<String>,
    pub algorithm: Option<String>,
    pub key: Option<PathBuf>,
    pub expect_public: Option<String>,
}

impl Overrides {
    fn into_vars(self) -> HashMap<&'static str, String> {
        let mut vars = HashMap::new();
        if let Some(version) = self.version {
            vars.insert(config::VERSION_VAR, version);
        }
        if let Some(algorithm) = self.algorithm {
            vars.insert(config::ALGORITHM_VAR, algorithm);
        }
        if let Some(key) = self.key {
            vars.insert(config::KEY_FILE_VAR, key.display().to_string());
        }
        if let Some(public) = self.expect_public {
            vars.insert(config::PUBLIC_KEY_VAR, public);
        }
        vars
    }
}

/// Resolve the signing configuration: command line first, then environment.
fn resolve_config(overrides: Overrides) -> anyhow::Result<SigningConfig> {
    let vars = overrides.into_vars();
    let config = SigningConfig::from_lookup(|name| vars.get(name).cloned().or_else(|| std::env::var(name).ok()))?;
    Ok(config)
}

pub fn run(firmware: &Path, output: &Path, overrides: Overrides) -> anyhow::Result<()> {
    let config = resolve_config(overrides)?;
    println!("Signing {} as {} ({})...", firmware.display(), config.version, config.algorithm);

    let release = SigningPipeline::new(config).run(firmware, output)?;

    println!("✓ Signed with key {}", &release.public_key.to_hex()[..16]);
    println!("  Firmware hash: {}", release.manifest.hash);
    println!("  Manifest written to {}", output.display());

    Ok(())
}
