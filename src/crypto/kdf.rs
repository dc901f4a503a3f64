//! Password-based key derivation

use crate::crypto::constants::KEY_SIZE;
use crate::error::{CryptoError, CryptoResult};
use hmac::Hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Derive a 256-bit key with PBKDF2-HMAC-SHA256.
///
/// The returned buffer is wiped on drop.
pub fn derive_key(
    passphrase: &str,
    salt: &[u8],
    iterations: u32,
) -> CryptoResult<Zeroizing<[u8; KEY_SIZE]>> {
    if iterations == 0 {
        return Err(CryptoError::KeyDerivationFailed {
            reason: "iteration count must be positive".to_string(),
        });
    }

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2::pbkdf2::<Hmac<Sha256>>(passphrase.as_bytes(), salt, iterations, &mut key[..])
        .map_err(|e| CryptoError::KeyDerivationFailed {
            reason: format!("PBKDF2 failed: {}", e),
        })?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_deterministic() {
        let a = derive_key("password", b"0123456789abcdef", 1000).unwrap();
        let b = derive_key("password", b"0123456789abcdef", 1000).unwrap();
        assert_eq!(*a, *b);

        let c = derive_key("password", b"fedcba9876543210", 1000).unwrap();
        assert_ne!(*a, *c);
    }

    #[test]
    fn test_derive_key_known_vector() {
        // RFC 7914 section 11, PBKDF2-HMAC-SHA256 with c = 1
        let key = derive_key("passwd", b"salt", 1).unwrap();
        assert_eq!(
            hex::encode(&key[..]),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
    }

    #[test]
    fn test_zero_iterations_rejected() {
        assert!(derive_key("password", b"salt", 0).is_err());
    }
}
