//! Session state read from persisted storage.
//!
//! The token is owned by the authentication flow; the profile store only
//! reads it to decide whether fetching is enabled.

use crate::storage::{KeyValueStorage, StorageError, keys};

#[derive(Debug, Clone)]
pub struct Session<S> {
    storage: S,
}

impl<S: KeyValueStorage> Session<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Current token; blank values count as absent.
    pub fn token(&self) -> Option<String> {
        self.storage
            .get(keys::TOKEN)
            .filter(|t| !t.trim().is_empty())
    }

    pub fn user_type(&self) -> Option<String> {
        self.storage.get(keys::USER_TYPE)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Record a fresh login.
    pub fn establish(&self, token: &str, user_type: Option<&str>) -> Result<(), StorageError> {
        self.storage.set(keys::TOKEN, token)?;
        match user_type {
            Some(user_type) => self.storage.set(keys::USER_TYPE, user_type),
            None => self.storage.remove(keys::USER_TYPE),
        }
    }

    /// Forget the session.
    pub fn end(&self) -> Result<(), StorageError> {
        self.storage.remove(keys::TOKEN)?;
        self.storage.remove(keys::USER_TYPE)
    }
}
