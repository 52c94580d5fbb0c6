//! `ota-sign digest`: print the SHA-256 of a firmware image.

use std::path::Path;

use ota_signing::digest::digest_file;

pub fn run(firmware: &Path) -> anyhow::Result<()> {
    let digest = digest_file(firmware)?;
    println!("{digest}");
    Ok(())
}
