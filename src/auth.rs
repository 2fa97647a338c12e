mod token;

pub use token::{SessionCodec, SessionCookie, SessionKey};

use crate::config::AppConfig;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username and password cannot be empty")]
    EmptyCredentials,
    #[error("Username '{0}' already exists")]
    UsernameTaken(String),
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Password hashing failed: {0}")]
    Hash(String),
    #[error("Failed to access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Invalid session key: {0}")]
    InvalidKey(String),
    #[error("Session token encryption failed")]
    Encryption,
    #[error("Session expiry of {0} days is out of range")]
    ExpiryOutOfRange(u32),
}

impl AuthError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        AuthError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// A registered user as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Argon2 PHC string
    pub password: String,
}

/// Users persisted as one JSON object: username → record
#[derive(Debug, Clone)]
pub struct UserStore {
    path: PathBuf,
}

impl UserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// All users; a missing or unreadable file means no users.
    pub fn load(&self) -> BTreeMap<String, UserRecord> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                log::warn!("could not read users file '{}': {}", self.path.display(), e);
                return BTreeMap::new();
            }
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            log::warn!("users file '{}' is corrupt: {}", self.path.display(), e);
            BTreeMap::new()
        })
    }

    fn save(&self, users: &BTreeMap<String, UserRecord>) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AuthError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(users)?;
        fs::write(&self.path, json).map_err(|e| AuthError::io(&self.path, e))
    }

    /// Register a new user with a freshly salted hash of `password`.
    pub fn register(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::EmptyCredentials);
        }

        let mut users = self.load();
        if users.contains_key(username) {
            return Err(AuthError::UsernameTaken(username.to_string()));
        }

        let password = hash_password(password)?;
        users.insert(username.to_string(), UserRecord { password });
        self.save(&users)?;
        log::info!("registered user '{}'", username);
        Ok(())
    }

    /// Check a username/password pair; unknown users simply fail.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.load()
            .get(username.trim())
            .is_some_and(|user| verify_password(password, &user.password))
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        log::warn!("stored password hash has an invalid format");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Verify credentials and persist an encrypted session token.
pub fn login(config: &AppConfig, username: &str, password: &str) -> Result<(), AuthError> {
    let users = UserStore::new(&config.storage.users);
    if !users.verify(username, password) {
        return Err(AuthError::InvalidCredentials);
    }

    let key = SessionKey::load_or_create(&config.storage.session_key)?;
    let codec = SessionCodec::new(key, config.session.expiry_days);
    let token = codec.issue(username.trim(), chrono::Utc::now())?;
    SessionCookie::new(&config.storage.session_token).write(&token)
}

pub fn logout(config: &AppConfig) -> Result<(), AuthError> {
    SessionCookie::new(&config.storage.session_token).clear()
}

/// The user of a valid, unexpired session token, if any.
///
/// Every failure (no token, no key, tampered or expired token) reads as
/// "not logged in".
pub fn current_user(config: &AppConfig) -> Option<String> {
    let token = SessionCookie::new(&config.storage.session_token).read()?;
    let key = match SessionKey::load(&config.storage.session_key) {
        Ok(key) => key?,
        Err(e) => {
            log::debug!("session key unavailable: {}", e);
            return None;
        }
    };
    SessionCodec::new(key, config.session.expiry_days).validate(&token, chrono::Utc::now())
}
