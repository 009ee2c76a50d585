//! Loading the signing key from an encrypted keystore file.

use std::path::Path;

use alloy::signers::local::PrivateKeySigner;
use eyre::{Context, Result};

/// Decrypts a V3 JSON keystore into a signer.
///
/// # Errors
/// Returns error if the file cannot be read or the passphrase is wrong.
pub fn private_key_by_key_file(path: &Path, passphrase: &str) -> Result<PrivateKeySigner> {
    let signer = PrivateKeySigner::decrypt_keystore(path, passphrase)
        .wrap_err_with(|| format!("unable to decrypt keystore {}", path.display()))?;

    tracing::debug!(address = %signer.address(), "loaded signing key");
    Ok(signer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypted_key_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = rand::thread_rng();
        let (signer, file_name) =
            PrivateKeySigner::new_keystore(dir.path(), &mut rng, "secret", None).unwrap();

        let loaded = private_key_by_key_file(&dir.path().join(file_name), "secret").unwrap();
        assert_eq!(loaded.address(), signer.address());
    }

    #[test]
    fn wrong_passphrase_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = rand::thread_rng();
        let (_, file_name) =
            PrivateKeySigner::new_keystore(dir.path(), &mut rng, "secret", None).unwrap();

        assert!(private_key_by_key_file(&dir.path().join(file_name), "other").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(private_key_by_key_file(&dir.path().join("absent.json"), "x").is_err());
    }
}
