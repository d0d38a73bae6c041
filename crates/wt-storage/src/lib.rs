//! Session-scoped storage: the key-value store contract and the allow-list on top of it.

use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;
use tracing::warn;
use wt_core::TrackerError;
use wt_core::TrackerResult;

/// Prefix for per-domain allow decisions in the session store.
pub const ALLOW_KEY_PREFIX: &str = "allow_";

/// Ephemeral key-value storage scoped to the current browsing session.
///
/// Values are last-writer-wins; everything is dropped when the session ends.
pub trait SessionStore {
    fn get(&self, key: &str) -> TrackerResult<Option<bool>>;

    fn set(&mut self, key: &str, value: bool) -> TrackerResult<()>;

    fn clear(&mut self) -> TrackerResult<()>;
}

/// In-process session store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySessionStore {
    values: BTreeMap<String, bool>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> TrackerResult<Option<bool>> {
        Ok(self.values.get(key).copied())
    }

    fn set(&mut self, key: &str, value: bool) -> TrackerResult<()> {
        self.values.insert(key.to_owned(), value);
        Ok(())
    }

    fn clear(&mut self) -> TrackerResult<()> {
        self.values.clear();
        Ok(())
    }
}

/// Session store key holding the allow decision for a domain.
pub fn allow_key(domain: &str) -> String {
    format!("{ALLOW_KEY_PREFIX}{domain}")
}

/// Result of checking whether the user already proceeded past a domain's warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowLookup {
    Allowed,
    NotAllowed,
    /// No store was configured or the read failed.
    Unavailable,
}

/// Per-session allow-list over an optional session store.
pub struct AllowList {
    store: Option<Box<dyn SessionStore>>,
}

impl fmt::Debug for AllowList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllowList")
            .field("store_available", &self.is_available())
            .finish()
    }
}

impl AllowList {
    pub fn new(store: Option<Box<dyn SessionStore>>) -> Self {
        Self { store }
    }

    pub fn with_store(store: impl SessionStore + 'static) -> Self {
        Self::new(Some(Box::new(store)))
    }

    /// An allow-list with no backing store; every lookup reports `Unavailable`.
    pub fn detached() -> Self {
        Self::new(None)
    }

    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    pub fn lookup(&self, domain: &str) -> AllowLookup {
        let Some(store) = self.store.as_ref() else {
            return AllowLookup::Unavailable;
        };

        match store.get(&allow_key(domain)) {
            Ok(Some(true)) => AllowLookup::Allowed,
            Ok(_) => AllowLookup::NotAllowed,
            Err(error) => {
                warn!(domain, %error, "session store read failed; treating domain as not allowed");
                AllowLookup::Unavailable
            }
        }
    }

    /// Records that the user proceeded past the warning for `domain`.
    pub fn allow(&mut self, domain: &str) -> TrackerResult<()> {
        let store = self.store.as_mut().ok_or_else(|| {
            TrackerError::new(
                "storage.unavailable",
                "no session store is configured for allow decisions",
            )
        })?;

        store.set(&allow_key(domain), true)?;
        debug!(domain, "recorded allow decision");
        Ok(())
    }

    /// Drops every allow decision at the end of the browsing session.
    pub fn end_session(&mut self) -> TrackerResult<()> {
        match self.store.as_mut() {
            Some(store) => store.clear(),
            None => Ok(()),
        }
    }
}
