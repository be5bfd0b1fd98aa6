use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::present::Currency;

pub const TOKEN_KEY: &str = "accessToken";
pub const USER_KEY: &str = "user";
pub const CURRENCY_KEY: &str = "selectedCurrency";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read session file: {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write session file: {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse session file: {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to encode session value: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },

    #[error("session store lock poisoned")]
    Poisoned,
}

/// Key-value area holding the persisted client state.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let values = self.values.lock().map_err(|_| SessionError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut values = self.values.lock().map_err(|_| SessionError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut values = self.values.lock().map_err(|_| SessionError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}

/// YAML map on disk. Every call goes to the file; nothing is cached.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, SessionError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(SessionError::Read {
                    path: self.path.display().to_string(),
                    source: e,
                })
            }
        };
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_yaml::from_str(&contents).map_err(|e| SessionError::Parse {
            path: self.path.display().to_string(),
            source: e,
        })
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<(), SessionError> {
        let write_err = |e: std::io::Error| SessionError::Write {
            path: self.path.display().to_string(),
            source: e,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let contents = serde_yaml::to_string(values).map_err(|e| SessionError::Parse {
            path: self.path.display().to_string(),
            source: e,
        })?;
        std::fs::write(&self.path, contents).map_err(write_err)
    }

    fn update<F>(&self, f: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.write_lock.lock().map_err(|_| SessionError::Poisoned)?;
        let mut values = self.load()?;
        f(&mut values);
        self.save(&values)
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.update(|values| {
            values.remove(key);
        })
    }
}

/// Explicit session context handed to whatever issues authenticated calls.
/// Cloning shares the same store.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    pub fn from_file(path: PathBuf) -> Self {
        Self::new(Arc::new(FileStore::new(path)))
    }

    /// Drops a stored token that has already expired. Returns whether the
    /// session is authenticated afterwards.
    pub fn initialize(&self) -> Result<bool, SessionError> {
        match self.store.get(TOKEN_KEY)? {
            Some(token) if !is_token_expired(&token, chrono::Utc::now().timestamp()) => Ok(true),
            Some(_) => {
                debug!("stored token expired, clearing session");
                self.logout()?;
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Current bearer token. Store failures read as "no token".
    pub fn token(&self) -> Option<String> {
        match self.store.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!("failed to read session token: {e}");
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn login(&self, token: &str, user: Option<&serde_json::Value>) -> Result<(), SessionError> {
        self.store.set(TOKEN_KEY, token.trim())?;
        if let Some(user) = user {
            let encoded =
                serde_json::to_string(user).map_err(|e| SessionError::Encode { source: e })?;
            self.store.set(USER_KEY, &encoded)?;
        }
        Ok(())
    }

    pub fn logout(&self) -> Result<(), SessionError> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(USER_KEY)
    }

    pub fn user(&self) -> Option<serde_json::Value> {
        let raw = self.store.get(USER_KEY).ok().flatten()?;
        serde_json::from_str(&raw).ok()
    }

    pub fn currency(&self) -> Currency {
        match self.store.get(CURRENCY_KEY) {
            Ok(code) => Currency::parse_or_default(code.as_deref()),
            Err(e) => {
                warn!("failed to read currency preference: {e}");
                Currency::default()
            }
        }
    }

    pub fn set_currency(&self, currency: Currency) -> Result<(), SessionError> {
        self.store.set(CURRENCY_KEY, currency.code())
    }
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    exp: Option<f64>,
}

/// Reads the `exp` claim of a JWT without verifying it. Tokens that cannot
/// be decoded count as expired.
pub fn is_token_expired(token: &str, now_secs: i64) -> bool {
    let Some(payload) = token.split('.').nth(1) else {
        return true;
    };
    let Ok(bytes) = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')) else {
        return true;
    };
    match serde_json::from_slice::<TokenClaims>(&bytes) {
        Ok(TokenClaims { exp: Some(exp) }) => exp < now_secs as f64,
        _ => true,
    }
}
