//! # Settle Vault
//!
//! Symmetric encryption of provider credentials at rest.
//!
//! Secrets are encrypted with AES-256-GCM under a key derived from an
//! install-wide secret (SHA-256 digest of the secret, never the secret
//! itself). The stored form is `nonce:tag:ciphertext`, each component
//! base64-encoded and colon-joined, so a fresh 96-bit nonce travels with
//! every value.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// GCM authentication tag length in bytes.
const TAG_LEN: usize = 16;

/// Errors raised by the vault.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    Encrypt(String),

    /// Authentication-tag mismatch or corrupted ciphertext. Fatal: callers
    /// must not swallow this.
    #[error("Decryption failed: {0}")]
    Decrypt(String),

    #[error("Malformed ciphertext component: {0}")]
    Decode(String),
}

/// Vault for provider secrets.
///
/// Cheap to clone; holds only the derived 32-byte key.
#[derive(Clone)]
pub struct SecretVault {
    key: [u8; 32],
}

impl SecretVault {
    /// Derives the AES-256 key from the install-wide secret.
    pub fn new(install_secret: &str) -> Self {
        let digest = Sha256::digest(install_secret.as_bytes());
        Self { key: digest.into() }
    }

    /// Encrypts a plaintext secret into `nonce:tag:ciphertext` form.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

        let mut nonce_bytes = [0u8; 12];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from(nonce_bytes);

        // aes-gcm appends the 16-byte tag to the ciphertext; split it back
        // out so the stored form keeps nonce, tag and ciphertext separate.
        let sealed = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::Encrypt(e.to_string()))?;
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        Ok(format!(
            "{}:{}:{}",
            BASE64.encode(nonce_bytes),
            BASE64.encode(tag),
            BASE64.encode(ciphertext),
        ))
    }

    /// Decrypts a `nonce:tag:ciphertext` value.
    ///
    /// A value that is not three colon-joined parts is returned unchanged:
    /// legacy rows may still hold plaintext secrets, and those must keep
    /// working until they are re-saved through the vault. A three-part value
    /// that fails authentication is a hard [`CryptoError::Decrypt`].
    pub fn decrypt(&self, stored: &str) -> Result<String, CryptoError> {
        let parts: Vec<&str> = stored.split(':').collect();
        if parts.len() != 3 {
            tracing::warn!("vault value is not encrypted, passing through");
            return Ok(stored.to_string());
        }

        let nonce_bytes = BASE64
            .decode(parts[0])
            .map_err(|e| CryptoError::Decode(e.to_string()))?;
        let tag = BASE64
            .decode(parts[1])
            .map_err(|e| CryptoError::Decode(e.to_string()))?;
        let ciphertext = BASE64
            .decode(parts[2])
            .map_err(|e| CryptoError::Decode(e.to_string()))?;

        let nonce_array: [u8; 12] = nonce_bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::Decode("invalid nonce length".to_string()))?;
        let nonce = Nonce::from(nonce_array);

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CryptoError::Decrypt(e.to_string()))?;

        let mut sealed = ciphertext;
        sealed.extend_from_slice(&tag);

        let plaintext = cipher
            .decrypt(&nonce, sealed.as_slice())
            .map_err(|_| CryptoError::Decrypt("authentication tag mismatch".to_string()))?;

        String::from_utf8(plaintext).map_err(|e| CryptoError::Decrypt(e.to_string()))
    }
}

/// Masks a secret for display: first three and last three characters kept,
/// the middle replaced (`sk_live_abc...xyz` becomes `sk_***xyz`).
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 8 {
        return "***".to_string();
    }
    // Char-based slicing: secrets are not guaranteed to be ASCII.
    let head: String = secret.chars().take(3).collect();
    let tail: String = secret.chars().skip(count - 3).collect();
    format!("{head}***{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let vault = SecretVault::new("install-secret");
        let stored = vault.encrypt("sk_live_abc123").unwrap();

        assert_eq!(stored.split(':').count(), 3);
        assert_eq!(vault.decrypt(&stored).unwrap(), "sk_live_abc123");
    }

    #[test]
    fn test_fresh_nonce_per_encryption() {
        let vault = SecretVault::new("install-secret");
        let a = vault.encrypt("same-plaintext").unwrap();
        let b = vault.encrypt("same-plaintext").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_value_passes_through() {
        let vault = SecretVault::new("install-secret");
        assert_eq!(vault.decrypt("legacy-plaintext").unwrap(), "legacy-plaintext");
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let vault = SecretVault::new("install-secret");
        let stored = vault.encrypt("sk_live_abc123").unwrap();

        let mut parts: Vec<String> = stored.split(':').map(String::from).collect();
        parts[2] = BASE64.encode(b"tampered-ciphertext!");
        let tampered = parts.join(":");

        assert!(matches!(
            vault.decrypt(&tampered),
            Err(CryptoError::Decrypt(_))
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let vault = SecretVault::new("install-secret");
        let other = SecretVault::new("different-secret");
        let stored = vault.encrypt("sk_live_abc123").unwrap();

        assert!(other.decrypt(&stored).is_err());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("sk_live_abc123xyz"), "sk_***xyz");
        assert_eq!(mask_secret("short"), "***");
    }

    #[test]
    fn test_mask_secret_multibyte() {
        assert_eq!(mask_secret("éé-secret-chave"), "éé-***ave");
        assert_eq!(mask_secret("chave-secreta-éé"), "cha***-éé");
        assert_eq!(mask_secret("ééééééé"), "***");
    }
}
