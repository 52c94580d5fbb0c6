//! Loading private signing keys from their configured source.
//!
//! Keys are loaded once, right before signing, and returned by value so they
//! are zeroized as soon as the caller's scope ends. A load failure is a
//! configuration error and is never retried.

use zeroize::Zeroizing;

use crate::algorithm::Algorithm;
use crate::config::KeySource;
use crate::error::SigningError;
use crate::keys;
use crate::keys::KeyPair;

/// Load the signing keypair from the process environment or a key file.
pub fn load_keypair(source: &KeySource, algorithm: Algorithm) -> Result<KeyPair, SigningError> {
    load_keypair_with(source, algorithm, |name| std::env::var(name).ok())
}

/// Load the signing keypair, resolving `KeySource::Env` through `lookup`.
pub fn load_keypair_with<F>(source: &KeySource, algorithm: Algorithm, lookup: F) -> Result<KeyPair, SigningError>
where
    F: Fn(&str) -> Option<String>,
{
    let key = match source {
        KeySource::Env(name) => {
            let value = Zeroizing::new(lookup(name).unwrap_or_default());
            if value.trim().is_empty() {
                return Err(SigningError::MissingSecret { name: name.clone() });
            }
            KeyPair::from_private_hex(algorithm, &value)?
        }
        KeySource::File(path) => keys::load_secret_key(path, algorithm)?,
    };
    tracing::debug!(%algorithm, public_key = %key.public_key().to_hex(), "loaded signing key");
    Ok(key)
}
