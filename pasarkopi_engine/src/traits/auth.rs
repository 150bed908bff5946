use log::error;
use pasar_common::Secret;

use crate::traits::{KeyValueStore, StorageError};

/// Storage key for the bearer credential. Shares the durable store with the cart snapshot.
pub const AUTH_TOKEN_KEY: &str = "pasarkopi.auth_token";

/// Source of the signed-in buyer's bearer credential.
///
/// The engine treats the credential as completely opaque. `None` means nobody is signed in, which blocks checkout
/// (the UI reacts by redirecting to sign-in).
pub trait AuthProvider {
    fn bearer_token(&self) -> Option<Secret<String>>;

    fn is_signed_in(&self) -> bool {
        self.bearer_token().is_some()
    }
}

//--------------------------------------   CredentialStore   ---------------------------------------------------------

/// Durable [`AuthProvider`] that keeps the token in the key-value store under [`AUTH_TOKEN_KEY`].
#[derive(Debug, Clone)]
pub struct CredentialStore<S> {
    storage: S,
}

impl<S: KeyValueStore> CredentialStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn store_token(&mut self, token: &str) -> Result<(), StorageError> {
        self.storage.put(AUTH_TOKEN_KEY, token)
    }

    pub fn clear_token(&mut self) -> Result<(), StorageError> {
        self.storage.delete(AUTH_TOKEN_KEY)
    }
}

impl<S: KeyValueStore> AuthProvider for CredentialStore<S> {
    fn bearer_token(&self) -> Option<Secret<String>> {
        match self.storage.get(AUTH_TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()).map(Secret::new),
            Err(e) => {
                error!("🔑️ Could not read the stored credential: {e}");
                None
            },
        }
    }
}
