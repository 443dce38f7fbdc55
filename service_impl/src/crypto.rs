use std::sync::Arc;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use service::crypto::CredentialCipher;
use service::ServiceError;
use sha2::{Digest, Sha256};

const NONCE_LENGTH: usize = 12;

/// AES-256-GCM with the SHA-256 hash of a configured secret as key. The
/// ciphertext is `base64(nonce || sealed)`.
pub struct AesGcmCredentialCipher {
    cipher: Option<Aes256Gcm>,
}

fn crypto_error(message: &str) -> ServiceError {
    ServiceError::CryptoError(message.into())
}

impl AesGcmCredentialCipher {
    /// Without a secret every operation fails, so no credentials are ever
    /// stored unencrypted.
    pub fn new(secret: Option<&str>) -> Self {
        let cipher = secret
            .map(|secret| Sha256::digest(secret.as_bytes()))
            .and_then(|key| Aes256Gcm::new_from_slice(&key).ok());
        Self { cipher }
    }

    fn cipher(&self) -> Result<&Aes256Gcm, ServiceError> {
        self.cipher
            .as_ref()
            .ok_or_else(|| crypto_error("no encryption key configured"))
    }
}

impl CredentialCipher for AesGcmCredentialCipher {
    fn encrypt(&self, plaintext: &str) -> Result<Arc<str>, ServiceError> {
        let cipher = self.cipher()?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| crypto_error("encryption failed"))?;
        let mut payload = nonce.to_vec();
        payload.extend_from_slice(&sealed);
        Ok(STANDARD.encode(payload).into())
    }

    fn decrypt(&self, ciphertext: &str) -> Result<Arc<str>, ServiceError> {
        let cipher = self.cipher()?;
        let payload = STANDARD
            .decode(ciphertext.trim())
            .map_err(|_| crypto_error("ciphertext is not base64"))?;
        if payload.len() <= NONCE_LENGTH {
            return Err(crypto_error("ciphertext too short"));
        }
        let (nonce, sealed) = payload.split_at(NONCE_LENGTH);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| crypto_error("decryption failed"))?;
        String::from_utf8(plaintext)
            .map(Arc::from)
            .map_err(|_| crypto_error("plaintext is not UTF-8"))
    }
}
