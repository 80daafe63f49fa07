//! Write-Once Value Cache
//!
//! Holds a lazily fetched value (the signer's root public key) for the
//! lifetime of its owner. The first successful write wins; later writes
//! return the value already stored. `invalidate` clears the slot.

use std::sync::RwLock;

/// Single-slot cache shared across concurrent requests
#[derive(Debug, Default)]
pub struct OnceCache<T> {
    slot: RwLock<Option<T>>,
}

impl<T: Clone> OnceCache<T> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    pub fn get(&self) -> Option<T> {
        self.slot.read().ok().and_then(|slot| slot.clone())
    }

    /// Store `value` unless a value is already present; returns the stored value
    pub fn set(&self, value: T) -> T {
        match self.slot.write() {
            Ok(mut slot) => slot.get_or_insert(value).clone(),
            // Poisoned lock: nothing was cached, hand back the fresh value
            Err(_) => value,
        }
    }

    pub fn invalidate(&self) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = None;
        }
    }

    pub fn is_populated(&self) -> bool {
        self.slot.read().map(|slot| slot.is_some()).unwrap_or(false)
    }
}
