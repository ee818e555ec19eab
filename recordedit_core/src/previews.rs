//! Local preview handles for staged files.
//!
//! A preview handle is a transient, renderable reference to bytes that have not
//! been uploaded yet. Every handle that is created must be released exactly once.

use std::collections::HashSet;
use std::sync::Mutex;

use uuid::Uuid;

use crate::models::FileHandle;

pub trait PreviewUrls: Send + Sync {
    fn create(&self, file: &FileHandle) -> String;
    fn release(&self, url: &str);
}

/// In-process registry issuing `blob:` handles and tracking which are still live.
#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    inner: Mutex<RegistryState>,
}

#[derive(Debug, Default)]
struct RegistryState {
    live: HashSet<String>,
    created: usize,
    released: usize,
    invalid_releases: usize,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.with_state(|state| state.live.len())
    }

    pub fn created_count(&self) -> usize {
        self.with_state(|state| state.created)
    }

    pub fn released_count(&self) -> usize {
        self.with_state(|state| state.released)
    }

    /// Releases of handles that were unknown or already released.
    pub fn invalid_release_count(&self) -> usize {
        self.with_state(|state| state.invalid_releases)
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.with_state(|state| state.live.contains(url))
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut RegistryState) -> T) -> T {
        // Counters stay meaningful even if a holder panicked mid-update.
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

impl PreviewUrls for ObjectUrlRegistry {
    fn create(&self, file: &FileHandle) -> String {
        let url = format!("blob:{}", Uuid::new_v4());
        tracing::trace!(%url, name = %file.name, bytes = file.len(), "created preview handle");
        self.with_state(|state| {
            state.live.insert(url.clone());
            state.created += 1;
        });
        url
    }

    fn release(&self, url: &str) {
        let released = self.with_state(|state| {
            if state.live.remove(url) {
                state.released += 1;
                true
            } else {
                state.invalid_releases += 1;
                false
            }
        });
        if !released {
            tracing::warn!(%url, "released a preview handle that is not live");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_release_balance() {
        let registry = ObjectUrlRegistry::new();
        let file = FileHandle::new("a.png", vec![1u8, 2, 3]);
        let first = registry.create(&file);
        let second = registry.create(&file);

        assert_ne!(first, second);
        assert!(first.starts_with("blob:"));
        assert_eq!(registry.live_count(), 2);

        registry.release(&first);
        assert!(!registry.is_live(&first));
        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.released_count(), 1);
        assert_eq!(registry.invalid_release_count(), 0);
    }

    #[test]
    fn double_release_is_counted() {
        let registry = ObjectUrlRegistry::new();
        let url = registry.create(&FileHandle::new("a.png", vec![0u8]));
        registry.release(&url);
        registry.release(&url);
        registry.release("blob:never-issued");

        assert_eq!(registry.released_count(), 1);
        assert_eq!(registry.invalid_release_count(), 2);
    }
}
