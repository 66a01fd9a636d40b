//! User Registration and Credentials
//!
//! Users attribute nodes to an author and give summaries a display name.
//! Passwords are stored as Argon2id PHC strings; the plain password never
//! reaches the store. Issuing and checking request tokens is the server's
//! access gate's job.

use crate::db::{DatabaseError, NodeStore};
use crate::models::{normalize_username, validate_password, User};
use crate::services::error::NodeServiceError;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Registers users, checks credentials and resolves users by id or name
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn NodeStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self { store }
    }

    /// Register a new username with a password
    ///
    /// The name is trimmed before validation and storage; the password is
    /// taken as given.
    ///
    /// # Errors
    ///
    /// - `InvalidUsername` if the trimmed name is too short, too long or
    ///   contains whitespace
    /// - `InvalidPassword` if the password is too short or too long
    /// - `UsernameTaken` if the name is already registered
    /// - `StorageError` if the insert fails
    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<User, NodeServiceError> {
        let username = normalize_username(username).map_err(|msg| {
            warn!(%msg, "rejected username");
            NodeServiceError::InvalidUsername(msg)
        })?;
        validate_password(password).map_err(NodeServiceError::InvalidPassword)?;

        if self.store.get_user_by_username(&username).await?.is_some() {
            return Err(NodeServiceError::UsernameTaken(username));
        }

        let password_hash = hash_password(password.to_string()).await?;

        let user = User::new(username);
        // A concurrent registration can still win the race; the UNIQUE
        // constraint reports it as a duplicate
        match self.store.insert_user(&user, &password_hash).await {
            Ok(()) => {}
            Err(DatabaseError::Duplicate(_)) => {
                return Err(NodeServiceError::UsernameTaken(user.username))
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, username = %user.username, "registered user");
        Ok(user)
    }

    /// Check a username/password pair
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` for an unknown name or a wrong password
    /// - `PasswordHash` if the stored hash cannot be parsed
    /// - `StorageError` if the lookup fails
    #[instrument(skip(self, password))]
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<User, NodeServiceError> {
        let Some((user, password_hash)) = self.store.get_credentials(username.trim()).await?
        else {
            warn!("login for unknown username");
            return Err(NodeServiceError::InvalidCredentials);
        };

        if verify_password(password.to_string(), password_hash).await? {
            Ok(user)
        } else {
            warn!(user_id = %user.id, "wrong password");
            Err(NodeServiceError::InvalidCredentials)
        }
    }

    /// Get a user by ID
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<User, NodeServiceError> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| NodeServiceError::UserNotFound(id.to_string()))
    }

    /// Look a user up by name (trimmed before the lookup)
    #[instrument(skip(self))]
    pub async fn find_by_username(&self, username: &str) -> Result<User, NodeServiceError> {
        let username = username.trim();
        self.store
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| NodeServiceError::UserNotFound(username.to_string()))
    }
}

/// Argon2id PHC string for `password`, computed off the async workers
async fn hash_password(password: String) -> Result<String, NodeServiceError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| NodeServiceError::PasswordHash(e.to_string()))
    })
    .await
    .map_err(|e| NodeServiceError::PasswordHash(e.to_string()))?
}

async fn verify_password(password: String, password_hash: String) -> Result<bool, NodeServiceError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&password_hash)
            .map_err(|e| NodeServiceError::PasswordHash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| NodeServiceError::PasswordHash(e.to_string()))?
}
