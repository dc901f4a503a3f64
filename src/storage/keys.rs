//! Storage keys

use crate::error::{StorageError, StorageResult};

/// Maximum storage key length in bytes
pub const MAX_KEY_LENGTH: usize = 1024;

/// Reject keys no physical store can hold
pub fn validate_key(key: &str) -> StorageResult<()> {
    let reject = |reason: &str| StorageError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    if key.is_empty() {
        return Err(reject("key cannot be empty"));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(reject("key too long (max 1024 bytes)"));
    }
    if key.chars().any(char::is_control) {
        return Err(reject("key contains control characters"));
    }
    Ok(())
}

/// Stricter check for keys used as cookie names
pub fn validate_cookie_name(key: &str) -> StorageResult<()> {
    validate_key(key)?;
    if key.chars().any(|c| c == ';' || c == '=' || c == ',' || c.is_whitespace()) {
        return Err(StorageError::InvalidKey {
            key: key.to_string(),
            reason: "cookie names cannot contain separators or whitespace".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("nextapp_theme").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("key\0with\0nulls").is_err());
        assert!(validate_key("key\nwith\nnewlines").is_err());
        assert!(validate_key(&"k".repeat(MAX_KEY_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_cookie_name() {
        assert!(validate_cookie_name("nextapp_auth_token").is_ok());
        assert!(validate_cookie_name("bad name").is_err());
        assert!(validate_cookie_name("bad;name").is_err());
        assert!(validate_cookie_name("bad=name").is_err());
        // fine for local storage though
        assert!(validate_key("bad name").is_ok());
    }
}
