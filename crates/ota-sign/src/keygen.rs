//! `ota-sign keygen`: generate a firmware signing keypair.

use std::path::Path;
use std::path::PathBuf;

use ota_signing::keys;
use ota_signing::Algorithm;

pub fn run(algorithm: Algorithm, output: Option<&Path>, pem: bool) -> anyhow::Result<()> {
    let key = keys::generate(algorithm);
    let public_hex = key.public_key().to_hex();

    let out_path = output.map(Path::to_path_buf).unwrap_or_else(|| default_key_path(algorithm));

    // Don't overwrite existing keys
    if out_path.exists() {
        anyhow::bail!("key file already exists at {}. Remove it first or use --output.", out_path.display());
    }

    keys::save_secret_key(&out_path, &key)?;

    println!("✓ Generated {algorithm} keypair");
    println!("  Private key: {}", out_path.display());
    println!("  Public key ({} bytes): {public_hex}", algorithm.public_key_len());
    println!();
    println!("  Store the private key hex as the {} CI secret.", algorithm.secret_env_var());
    println!("  Compile the public key into the device firmware:");
    println!("    #define PUBLIC_KEY_HEX \"{public_hex}\"");

    if pem {
        println!();
        print!("{}", key.to_pkcs8_pem()?.as_str());
        print!("{}", key.public_key().to_pem()?);
    }

    Ok(())
}

/// Default path for the signing key.
fn default_key_path(algorithm: Algorithm) -> PathBuf {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from("/tmp"));

    config_dir.join("ota-sign").join(format!("{algorithm}.key"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_loadable_key_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecdsa.key");

        run(Algorithm::EcdsaP256Sha256, Some(&path), false).unwrap();
        let key = keys::load_secret_key(&path, Algorithm::EcdsaP256Sha256).unwrap();
        assert_eq!(key.public_key().to_hex().len(), 128);

        assert!(run(Algorithm::EcdsaP256Sha256, Some(&path), false).is_err());
        let again = keys::load_secret_key(&path, Algorithm::EcdsaP256Sha256).unwrap();
        assert_eq!(again.public_key(), key.public_key());
    }
}
