use std::sync::Arc;

use mockall::automock;

use crate::ServiceError;

/// Symmetric encryption of provider credentials at rest.
#[automock]
pub trait CredentialCipher {
    /// Returns a printable ciphertext containing everything needed for
    /// decryption except the key.
    fn encrypt(&self, plaintext: &str) -> Result<Arc<str>, ServiceError>;

    fn decrypt(&self, ciphertext: &str) -> Result<Arc<str>, ServiceError>;
}
