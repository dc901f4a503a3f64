//! Error types for the sealed storage library
//!
//! Every concern gets its own `thiserror` enum; the top-level [`Error`]
//! wraps them so public operations can return a single result type.

use thiserror::Error;

/// The main error type for the sealed storage library
#[derive(Error, Debug)]
pub enum Error {
    /// Cryptographic errors
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Storage adapter errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Value (de)serialization errors
    #[error("Serializer error: {0}")]
    Serializer(#[from] SerializerError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Crypto-specific error types
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key derivation failed
    #[error("Key derivation failed: {reason}")]
    KeyDerivationFailed {
        /// Underlying cause
        reason: String,
    },

    /// Authenticated encryption failed
    #[error("Encryption failed: {reason}")]
    EncryptionFailed {
        /// Underlying cause
        reason: String,
    },

    /// Authenticated decryption failed (wrong key, tampered data, ...)
    #[error("Decryption failed: {reason}")]
    DecryptionFailed {
        /// Underlying cause
        reason: String,
    },

    /// Envelope is not laid out as `salt || iv || ciphertext`
    #[error("Malformed envelope: expected at least {expected} bytes, got {actual}")]
    MalformedEnvelope {
        /// Minimum length in bytes
        expected: usize,
        /// Actual decoded length
        actual: usize,
    },

    /// Base64 decoding failed
    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decrypted bytes were not valid UTF-8
    #[error("Invalid UTF-8 plaintext: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The OS random source could not be read
    #[error("Random source unavailable: {reason}")]
    RandomUnavailable {
        /// Underlying cause
        reason: String,
    },

    /// The blocking crypto task did not complete
    #[error("Crypto task aborted: {reason}")]
    TaskAborted {
        /// Underlying cause
        reason: String,
    },
}

/// Storage-specific error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// A runtime dependency (cookie primitive, response handle) is not installed yet
    #[error("Dependency not available: {dependency}")]
    DependencyUnavailable {
        /// Name of the missing dependency
        dependency: String,
    },

    /// Server-mode operation called without a request context
    #[error("Request context required for {operation}")]
    MissingContext {
        /// Operation that needed the context
        operation: String,
    },

    /// Server-mode write called without a response handle
    #[error("Response handle required for {operation}")]
    MissingResponse {
        /// Operation that needed the response
        operation: String,
    },

    /// Operation is not supported in the current execution mode
    #[error("{operation} is not supported in {mode} mode")]
    Unsupported {
        /// Operation name
        operation: String,
        /// Execution mode name
        mode: String,
    },

    /// The physical store cannot be used right now
    #[error("Storage backend unavailable: {backend}: {reason}")]
    Unavailable {
        /// Backend name
        backend: String,
        /// Underlying cause
        reason: String,
    },

    /// Storage quota exceeded
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    /// Key rejected by validation
    #[error("Invalid key {key:?}: {reason}")]
    InvalidKey {
        /// Offending key
        key: String,
        /// Why it was rejected
        reason: String,
    },

    /// Storage operation failed
    #[error("Storage operation failed: {operation}: {reason}")]
    OperationFailed {
        /// Operation name
        operation: String,
        /// Underlying cause
        reason: String,
    },
}

/// Serializer-specific error types
#[derive(Error, Debug)]
pub enum SerializerError {
    /// Serialization failed
    #[error("Serialization failed: {reason}")]
    SerializationFailed {
        /// Underlying cause
        reason: String,
    },

    /// Deserialization failed
    #[error("Deserialization failed: {reason}")]
    DeserializationFailed {
        /// Underlying cause
        reason: String,
    },
}

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable holds an unsupported value
    #[error("Invalid value for {variable}: {value:?}")]
    InvalidValue {
        /// Variable name
        variable: String,
        /// Offending value
        value: String,
    },
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

/// Convenience type alias for Crypto Results
pub type CryptoResult<T> = std::result::Result<T, CryptoError>;

/// Convenience type alias for Storage Results
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Convenience type alias for Serializer Results
pub type SerializerResult<T> = std::result::Result<T, SerializerError>;

/// Convenience type alias for Config Results
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
