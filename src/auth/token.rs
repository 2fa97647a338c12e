use super::AuthError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Symmetric key that seals session tokens, stored base64-encoded
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; KEY_LEN]);

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey").finish_non_exhaustive()
    }
}

impl SessionKey {
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn encode(&self) -> String {
        STANDARD_NO_PAD.encode(self.0)
    }

    pub fn decode(encoded: &str) -> Result<Self, AuthError> {
        let decoded = STANDARD_NO_PAD
            .decode(encoded.trim())
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        let bytes: [u8; KEY_LEN] = decoded.try_into().map_err(|v: Vec<u8>| {
            AuthError::InvalidKey(format!("expected {KEY_LEN} bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }

    /// Read the key file; `Ok(None)` when it does not exist yet.
    pub fn load(path: &Path) -> Result<Option<Self>, AuthError> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::decode(&contents).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AuthError::io(path, e)),
        }
    }

    pub fn load_or_create(path: &Path) -> Result<Self, AuthError> {
        if let Some(key) = Self::load(path)? {
            return Ok(key);
        }

        let key = Self::generate();
        write_private(path, &key.encode())?;
        log::info!("created session key at '{}'", path.display());
        Ok(key)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    /// Unix seconds
    exp: i64,
}

/// Seals and opens login tokens: AES-256-GCM over `{sub, exp}`
#[derive(Debug, Clone)]
pub struct SessionCodec {
    key: SessionKey,
    expiry_days: u32,
}

impl SessionCodec {
    pub fn new(key: SessionKey, expiry_days: u32) -> Self {
        Self { key, expiry_days }
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key.0))
    }

    /// Token for `username`, valid for `expiry_days` from `now`.
    pub fn issue(&self, username: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let exp = Duration::try_days(i64::from(self.expiry_days))
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or(AuthError::ExpiryOutOfRange(self.expiry_days))?;
        let claims = Claims {
            sub: username.to_string(),
            exp: exp.timestamp(),
        };
        let plaintext = serde_json::to_vec(&claims)?;

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| AuthError::Encryption)?;

        let mut sealed = nonce.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD_NO_PAD.encode(sealed))
    }

    /// Username carried by `token` if it opens with this key and has not expired.
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Option<String> {
        let sealed = STANDARD_NO_PAD.decode(token.trim()).ok()?;
        if sealed.len() <= NONCE_LEN {
            return None;
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .ok()?;
        let claims: Claims = serde_json::from_slice(&plaintext).ok()?;

        if claims.exp <= now.timestamp() {
            log::debug!("session token for '{}' has expired", claims.sub);
            return None;
        }
        Some(claims.sub)
    }
}

/// The file that keeps a token between invocations
#[derive(Debug, Clone)]
pub struct SessionCookie {
    path: PathBuf,
}

impl SessionCookie {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn read(&self) -> Option<String> {
        let token = fs::read_to_string(&self.path).ok()?;
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    pub fn write(&self, token: &str) -> Result<(), AuthError> {
        write_private(&self.path, token)
    }

    /// Remove the token; clearing an absent token is not an error.
    pub fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::io(&self.path, e)),
        }
    }
}

fn write_private(path: &Path, contents: &str) -> Result<(), AuthError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AuthError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| AuthError::io(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| AuthError::io(path, e))?;
    }
    Ok(())
}
