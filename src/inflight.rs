use std::collections::HashMap;
use std::sync::Mutex;

/// Tracks which keys have a fetch outstanding right now. Presence of a key
/// in the map is the in-flight state; the stored value is the requesting
/// URI, kept only for log output.
///
/// One instance is constructed at startup and handed to whatever needs it.
/// Nothing here is global.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    pending: Mutex<HashMap<String, String>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically inserts `key` if absent and returns whether this caller
    /// now owns it. The check and the insert happen under one lock
    /// acquisition with no await point in between.
    pub fn try_acquire(&self, key: &str, uri: &str) -> bool {
        let mut pending = self.pending.lock().unwrap();
        if pending.contains_key(key) {
            return false;
        }
        pending.insert(key.to_string(), uri.to_string());
        true
    }

    /// Removes the marker. Idempotent.
    pub fn release(&self, key: &str) {
        self.pending.lock().unwrap().remove(key);
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.pending.lock().unwrap().contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_of_same_key_fails() {
        let registry = InFlightRegistry::new();
        assert!(registry.try_acquire("k1", "http://example.com"));
        assert!(!registry.try_acquire("k1", "http://example.com"));
        assert!(registry.try_acquire("k2", "http://example.org"));
    }

    #[test]
    fn release_reopens_the_key() {
        let registry = InFlightRegistry::new();
        assert!(registry.try_acquire("k1", "http://example.com"));
        registry.release("k1");
        assert!(!registry.is_in_flight("k1"));
        assert!(registry.try_acquire("k1", "http://example.com"));
    }

    #[test]
    fn release_is_idempotent() {
        let registry = InFlightRegistry::new();
        registry.release("never-acquired");
        assert!(registry.try_acquire("never-acquired", "http://example.com"));
        registry.release("never-acquired");
        registry.release("never-acquired");
        assert!(!registry.is_in_flight("never-acquired"));
    }
}
