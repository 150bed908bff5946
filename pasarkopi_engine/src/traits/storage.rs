use std::sync::{Arc, Mutex};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not encode value for storage: {0}")]
    Encoding(String),
    #[error("The storage lock was poisoned")]
    Poisoned,
}

/// Synchronous, string-valued durable storage.
///
/// This is deliberately tiny: the storefront keeps exactly two things durable (the cart snapshot and the auth
/// token), both as JSON strings under fixed keys. Writes must be visible to subsequent reads as soon as the call
/// returns; there is no flushing, batching or async I/O at this seam.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn delete(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Lets one underlying store back several owners (e.g. the cart store and the credential store sharing one file).
impl<S: KeyValueStore> KeyValueStore for Arc<Mutex<S>> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.lock().map_err(|_| StorageError::Poisoned)?.get(key)
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().map_err(|_| StorageError::Poisoned)?.put(key, value)
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        self.lock().map_err(|_| StorageError::Poisoned)?.delete(key)
    }
}
