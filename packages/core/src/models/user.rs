//! User Records
//!
//! Users attribute nodes and give tree summaries a display name. The
//! password hash is stored next to the record but never part of it, so a
//! `User` can be serialized anywhere.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum username length (after trimming)
pub const MIN_USERNAME_LEN: usize = 3;

/// Maximum username length (after trimming)
pub const MAX_USERNAME_LEN: usize = 32;

/// Minimum password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Maximum password length; bounds hashing work per request
pub const MAX_PASSWORD_LEN: usize = 128;

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a user with a fresh UUID; the username is stored as given
    pub fn new(username: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            created_at: Utc::now().trunc_subsecs(6),
        }
    }
}

/// Trim and validate a username, returning the normalized form
pub fn normalize_username(raw: &str) -> Result<String, String> {
    let name = raw.trim();
    let len = name.chars().count();

    if len < MIN_USERNAME_LEN {
        return Err(format!(
            "Username must be at least {} characters",
            MIN_USERNAME_LEN
        ));
    }
    if len > MAX_USERNAME_LEN {
        return Err(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LEN
        ));
    }
    if name.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err("Username must not contain whitespace".to_string());
    }

    Ok(name.to_string())
}

/// Check a password against the length bounds (no trimming)
pub fn validate_password(password: &str) -> Result<(), String> {
    let len = password.chars().count();

    if len < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(format!(
            "Password must be at most {} characters",
            MAX_PASSWORD_LEN
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("  alice "), Ok("alice".to_string()));
        assert!(normalize_username("ab").is_err());
        assert!(normalize_username("   ").is_err());
        assert!(normalize_username("two words").is_err());
        assert!(normalize_username(&"x".repeat(33)).is_err());
        assert!(normalize_username(&"x".repeat(32)).is_ok());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"p".repeat(129)).is_err());
    }
}
