//! `ota-sign verify`: verify a firmware image against its manifest.

use std::path::Path;

use anyhow::Context;
use ota_signing::verifier;
use ota_signing::Manifest;
use ota_signing::PublicKey;

pub fn run(firmware_path: &Path, manifest_path: &Path, public_key_hex: &str) -> anyhow::Result<()> {
    let manifest = Manifest::load(manifest_path)
        .with_context(|| format!("failed to read manifest {}", manifest_path.display()))?;
    let public_key = PublicKey::from_hex(manifest.algorithm, public_key_hex)?;

    let firmware = std::fs::read(firmware_path)
        .with_context(|| format!("failed to read firmware {}", firmware_path.display()))?;

    println!("Verifying {} ({} bytes)...", firmware_path.display(), firmware.len());

    let digest = verifier::verify_firmware(&firmware, &manifest, &public_key)?;

    println!("✓ Signature valid");
    println!("  Version: {}", manifest.version);
    println!("  Algorithm: {}", manifest.algorithm);
    println!("  Firmware hash: {}", &digest.to_hex()[..16]);

    Ok(())
}
