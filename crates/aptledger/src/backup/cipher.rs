//! Password encryption for backup files.
//!
//! Layout of an encrypted file, before base64: 16-byte PBKDF2 salt, 12-byte
//! AES-GCM nonce, then the ciphertext with its authentication tag.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{Error, Result};

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const KDF_ITERATIONS: u32 = 100_000;

fn derive_key(passphrase: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, KDF_ITERATIONS, &mut key);
    key
}

/// Encrypt `plaintext` and return the base64 file body.
///
/// # Errors
///
/// Returns [`Error::Encryption`] if the passphrase is empty or the cipher fails.
pub fn encrypt(plaintext: &[u8], passphrase: &str) -> Result<String> {
    if passphrase.is_empty() {
        return Err(Error::Encryption("a passphrase is required".to_string()));
    }

    let mut rng = rand::thread_rng();
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut nonce);

    let key = derive_key(passphrase, &salt);
    let cipher =
        Aes256Gcm::new_from_slice(&key).map_err(|e| Error::Encryption(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| Error::Encryption(e.to_string()))?;

    let mut body = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    body.extend_from_slice(&salt);
    body.extend_from_slice(&nonce);
    body.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(body))
}

/// Decrypt a base64 file body produced by [`encrypt`].
///
/// # Errors
///
/// Returns [`Error::InvalidBackup`] if the body is not base64 or too short,
/// and [`Error::Decryption`] for a wrong passphrase or tampered data.
pub fn decrypt(body: &str, passphrase: &str) -> Result<Vec<u8>> {
    let raw = STANDARD
        .decode(body.trim())
        .map_err(|e| Error::invalid_backup(format!("encrypted body is not base64: {e}")))?;
    if raw.len() <= SALT_LEN + NONCE_LEN {
        return Err(Error::invalid_backup("encrypted body is too short"));
    }

    let (salt, rest) = raw.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let key = derive_key(passphrase, salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| Error::Decryption)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| Error::Decryption)
}
