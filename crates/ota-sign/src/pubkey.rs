//! `ota-sign pubkey`: derive the public key the device must embed.

use std::path::Path;

use ota_signing::secret;
use ota_signing::Algorithm;
use ota_signing::KeySource;

pub fn run(algorithm: Algorithm, key_path: Option<&Path>, expected: Option<&str>) -> anyhow::Result<()> {
    let source = match key_path {
        Some(path) => KeySource::File(path.to_path_buf()),
        None => KeySource::Env(algorithm.secret_env_var().to_string()),
    };
    let key = secret::load_keypair(&source, algorithm)?;
    let public_hex = key.public_key().to_hex();

    println!("{public_hex}");

    if let Some(expected) = expected {
        key.ensure_public_matches(expected)?;
        println!("✓ Matches the expected device public key");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ota_signing::keys;
    use ota_signing::KeyPair;
    use ota_signing::SigningError;

    use super::*;

    const SEED_HEX: &str = "ba89c973ffb9836d7c3c9f0b6bc869455cdb6db33aa299c297fd1726f567abd9";

    #[test]
    fn mismatched_expectation_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.key");
        std::fs::write(&path, SEED_HEX).unwrap();

        run(Algorithm::Ed25519, Some(&path), Some("0bc12f3d718204686b669042d921c91db12f83340e80c4837892828051fafcd8"))
            .unwrap();

        let err = run(Algorithm::Ed25519, Some(&path), Some("0bc12f3d7182046866669042d921c91db12f83340e80c4837892828051fafcd8"))
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<SigningError>(), Some(SigningError::KeyMismatch { .. })));
    }

    #[test]
    fn pem_key_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.pem");
        let key = keys::generate(Algorithm::EcdsaP256Sha256);
        std::fs::write(&path, key.to_pkcs8_pem().unwrap().as_bytes()).unwrap();

        run(Algorithm::EcdsaP256Sha256, Some(&path), Some(&key.public_key().to_hex())).unwrap();
        let reloaded = KeyPair::from_pkcs8_pem(Algorithm::EcdsaP256Sha256, &std::fs::read_to_string(&path).unwrap());
        assert_eq!(reloaded.unwrap().public_key(), key.public_key());
    }
}
