//! Cryptography module
//!
//! Key derivation, the pluggable envelope backends and the
//! [`EncryptionService`] that the storage pipeline talks to.

pub mod backend;
pub mod kdf;
pub mod service;

// Re-export main types for convenience
pub use backend::{AeadBackend, Base64Backend, CryptoBackend};
pub use kdf::derive_key;
pub use service::EncryptionService;

/// Envelope and key-derivation constants
pub mod constants {
    //! Sizes that define the envelope wire format

    use std::num::NonZeroU32;

    const fn positive(count: u32) -> NonZeroU32 {
        match NonZeroU32::new(count) {
            Some(count) => count,
            None => panic!("iteration count must be positive"),
        }
    }

    /// Salt length in bytes
    pub const SALT_SIZE: usize = 16;

    /// AES-GCM IV length in bytes
    pub const IV_SIZE: usize = 12;

    /// Derived key length in bytes (AES-256)
    pub const KEY_SIZE: usize = 32;

    /// Bytes preceding the ciphertext in a decoded envelope
    pub const ENVELOPE_HEADER_SIZE: usize = SALT_SIZE + IV_SIZE;

    /// PBKDF2 iterations for the secure preset
    pub const SECURE_ITERATIONS: NonZeroU32 = positive(100_000);

    /// PBKDF2 iterations for the balanced preset
    pub const BALANCED_ITERATIONS: NonZeroU32 = positive(10_000);
}
