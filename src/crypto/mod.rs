//! Client-side password transform used by the identity provider
//!
//! The login page ships a salt (`pwdEncryptSalt`) and expects the password
//! field to carry `base64(AES-CBC(key = salt, iv = rand16, rand64 || password))`
//! with PKCS#7 padding. The server rejects anything else, so a mismatch here
//! looks exactly like a wrong password.
//!
//! The transform sits behind [`PasswordCipher`] so the session acquirer never
//! depends on the concrete algorithm.

use aes::{Aes128, Aes192, Aes256};
use base64::{engine::general_purpose::STANDARD, Engine};
use cbc::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Mutex;
use thiserror::Error;

/// Characters the provider's script draws its random prefix and IV from
const NONCE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTWXYZabcdefhijkmnprstwxyz2345678";

/// Length of the random prefix prepended to the password
const PREFIX_LEN: usize = 64;

/// Length of the IV (one AES block)
const IV_LEN: usize = 16;

/// Errors raised by a password transform
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Salt length does not select an AES variant
    #[error("Salt of {0} bytes is not a valid AES key length")]
    InvalidKeyLength(usize),

    /// Nonce generator could not be used
    #[error("Nonce generator unavailable")]
    NonceUnavailable,
}

/// Transform turning a raw password into what the login form submits
pub trait PasswordCipher: Send + Sync {
    /// Encrypt `password` with the page-provided `salt`
    fn encrypt(&self, password: &str, salt: &str) -> Result<String, CryptoError>;
}

/// The provider's `encryptAES` routine
///
/// Output for a given `(password, salt)` is deterministic once the nonce
/// generator is seeded with [`CasAesCipher::seeded`].
pub struct CasAesCipher {
    rng: Mutex<ChaCha8Rng>,
}

impl CasAesCipher {
    /// Create a cipher seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::from_entropy()),
        }
    }

    /// Create a cipher with a fixed nonce seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    fn random_string(rng: &mut ChaCha8Rng, len: usize) -> String {
        (0..len)
            .map(|_| NONCE_CHARS[rng.gen_range(0..NONCE_CHARS.len())] as char)
            .collect()
    }
}

impl Default for CasAesCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordCipher for CasAesCipher {
    fn encrypt(&self, password: &str, salt: &str) -> Result<String, CryptoError> {
        let key = salt.trim();
        if key.is_empty() {
            return Ok(password.to_string());
        }

        let (prefix, iv) = {
            let mut rng = self.rng.lock().map_err(|_| CryptoError::NonceUnavailable)?;
            let prefix = Self::random_string(&mut rng, PREFIX_LEN);
            let iv = Self::random_string(&mut rng, IV_LEN);
            (prefix, iv)
        };

        let plaintext = format!("{prefix}{password}");
        let ciphertext = aes_cbc_encrypt(key.as_bytes(), iv.as_bytes(), plaintext.as_bytes())?;

        Ok(STANDARD.encode(ciphertext))
    }
}

/// AES-CBC with PKCS#7, key size chosen by key length like CryptoJS does
fn aes_cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let invalid = |_| CryptoError::InvalidKeyLength(key.len());

    match key.len() {
        16 => Ok(cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        24 => Ok(cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        32 => Ok(cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        n => Err(CryptoError::InvalidKeyLength(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbc::cipher::BlockDecryptMut;

    const SALT: &str = "rjBFAaHsNkKAhpoi";

    /// Replays the generator to recover the IV the cipher used
    fn expected_iv(seed: u64) -> String {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let _prefix = CasAesCipher::random_string(&mut rng, PREFIX_LEN);
        CasAesCipher::random_string(&mut rng, IV_LEN)
    }

    #[test]
    fn test_seeded_output_is_deterministic() {
        let a = CasAesCipher::seeded(7).encrypt("hunter2", SALT).unwrap();
        let b = CasAesCipher::seeded(7).encrypt("hunter2", SALT).unwrap();
        assert_eq!(a, b);

        let c = CasAesCipher::seeded(8).encrypt("hunter2", SALT).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_plaintext_layout() {
        let encoded = CasAesCipher::seeded(42).encrypt("hunter2", SALT).unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();

        // 64-byte prefix + 7-byte password, padded to a block boundary
        assert_eq!(bytes.len(), 80);

        let iv = expected_iv(42);
        let plain = cbc::Decryptor::<Aes128>::new_from_slices(SALT.as_bytes(), iv.as_bytes())
            .unwrap()
            .decrypt_padded_vec_mut::<Pkcs7>(&bytes)
            .unwrap();
        let plain = String::from_utf8(plain).unwrap();

        assert!(plain.ends_with("hunter2"));
        assert!(plain[..PREFIX_LEN]
            .bytes()
            .all(|b| NONCE_CHARS.contains(&b)));
    }

    #[test]
    fn test_empty_salt_passes_password_through() {
        let cipher = CasAesCipher::seeded(1);
        assert_eq!(cipher.encrypt("hunter2", "").unwrap(), "hunter2");
        assert_eq!(cipher.encrypt("hunter2", "   ").unwrap(), "hunter2");
    }

    #[test]
    fn test_salt_is_trimmed() {
        let a = CasAesCipher::seeded(3).encrypt("pw", SALT).unwrap();
        let b = CasAesCipher::seeded(3)
            .encrypt("pw", &format!(" {SALT}\n"))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_salt_length() {
        let err = CasAesCipher::seeded(1).encrypt("pw", "short").unwrap_err();
        assert_eq!(err, CryptoError::InvalidKeyLength(5));
    }

    #[test]
    fn test_longer_keys_select_wider_aes() {
        let cipher = CasAesCipher::seeded(5);
        assert!(cipher.encrypt("pw", &"k".repeat(24)).is_ok());
        assert!(cipher.encrypt("pw", &"k".repeat(32)).is_ok());
    }
}
