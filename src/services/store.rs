//! Document Store
//!
//! The persistence interface the user store, save store and chat log write
//! through: a key-value document store with per-key linearizability. The
//! in-process [`MemoryStore`] is the reference implementation; a remote
//! backend can be swapped in behind the same trait.

use dashmap::DashMap;

/// Key-value document store keyed by collection and document key.
pub trait DocumentStore: Send + Sync {
    fn get(&self, collection: &str, key: &str) -> Option<String>;
    fn put(&self, collection: &str, key: &str, value: String);
    /// Returns true when a document was removed.
    fn delete(&self, collection: &str, key: &str) -> bool;
    fn keys(&self, collection: &str) -> Vec<String>;
}

/// In-process reference implementation.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, key: &str) -> Option<String> {
        self.collections
            .get(collection)
            .and_then(|c| c.get(key).map(|v| v.clone()))
    }

    fn put(&self, collection: &str, key: &str, value: String) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    fn delete(&self, collection: &str, key: &str) -> bool {
        self.collections
            .get(collection)
            .map(|c| c.remove(key).is_some())
            .unwrap_or(false)
    }

    fn keys(&self, collection: &str) -> Vec<String> {
        self.collections
            .get(collection)
            .map(|c| c.iter().map(|e| e.key().clone()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let store = MemoryStore::new();
        store.put("users", "u1", "{}".to_string());

        assert_eq!(store.get("users", "u1"), Some("{}".to_string()));
        assert!(store.delete("users", "u1"));
        assert!(!store.delete("users", "u1"));
        assert_eq!(store.get("users", "u1"), None);
    }

    #[test]
    fn test_collections_are_isolated() {
        let store = MemoryStore::new();
        store.put("a", "k", "1".to_string());
        store.put("b", "k", "2".to_string());

        assert_eq!(store.get("a", "k"), Some("1".to_string()));
        assert_eq!(store.get("b", "k"), Some("2".to_string()));
        assert_eq!(store.keys("a"), vec!["k".to_string()]);
    }
}
