//! User Store
//!
//! Registered accounts with unique email/username indexes and lifetime
//! stats. Records are cached in memory and written through the document
//! store.

use crate::services::DocumentStore;
use crate::types::{Role, User, UserStats};
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

const COLLECTION: &str = "users";

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Username already registered")]
    DuplicateUsername,

    #[error("At least one of email or username is required")]
    MissingIdentifier,
}

/// Account storage with unique identifier indexes.
pub struct UserStore {
    users: DashMap<String, User>,
    by_email: DashMap<String, String>,
    by_username: DashMap<String, String>,
    store: Arc<dyn DocumentStore>,
}

impl UserStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let users = Self {
            users: DashMap::new(),
            by_email: DashMap::new(),
            by_username: DashMap::new(),
            store,
        };
        users.load_persisted();
        users
    }

    fn load_persisted(&self) {
        let mut loaded = 0usize;
        for key in self.store.keys(COLLECTION) {
            if let Some(value) = self.store.get(COLLECTION, &key) {
                match serde_json::from_str::<User>(&value) {
                    Ok(user) => {
                        self.index(&user);
                        self.users.insert(user.user_id.clone(), user);
                        loaded += 1;
                    }
                    Err(e) => warn!("Skipping unreadable user record {}: {}", key, e),
                }
            }
        }
        if loaded > 0 {
            info!("Loaded {} user records", loaded);
        }
    }

    fn index(&self, user: &User) {
        if let Some(ref email) = user.email {
            self.by_email
                .insert(email.to_lowercase(), user.user_id.clone());
        }
        if let Some(ref username) = user.username {
            self.by_username
                .insert(username.to_lowercase(), user.user_id.clone());
        }
    }

    fn persist(&self, user: &User) {
        if let Ok(json) = serde_json::to_string(user) {
            self.store.put(COLLECTION, &user.user_id, json);
        }
    }

    /// Create a new account. Identifiers are unique within their category.
    pub fn create(
        &self,
        email: Option<String>,
        username: Option<String>,
        display_name: String,
        password_hash: String,
        role: Role,
    ) -> Result<User, UserStoreError> {
        if email.is_none() && username.is_none() {
            return Err(UserStoreError::MissingIdentifier);
        }
        if let Some(ref email) = email {
            if self.by_email.contains_key(&email.to_lowercase()) {
                return Err(UserStoreError::DuplicateEmail);
            }
        }
        if let Some(ref username) = username {
            if self.by_username.contains_key(&username.to_lowercase()) {
                return Err(UserStoreError::DuplicateUsername);
            }
        }

        let user = User {
            user_id: Uuid::new_v4().to_string(),
            email,
            username,
            display_name,
            password_hash,
            role,
            stats: UserStats::default(),
            created_at: crate::types::timestamp::now(),
        };
        self.index(&user);
        self.persist(&user);
        self.users.insert(user.user_id.clone(), user.clone());
        info!(user_id = %user.user_id, role = %user.role, "user created");
        Ok(user)
    }

    pub fn get(&self, user_id: &str) -> Option<User> {
        self.users.get(user_id).map(|u| u.clone())
    }

    /// Resolve a login identifier: email when it contains '@', username
    /// otherwise (falling back to the other index).
    pub fn find_by_identifier(&self, identifier: &str) -> Option<User> {
        let lower = identifier.to_lowercase();
        let id = if identifier.contains('@') {
            self.by_email
                .get(&lower)
                .or_else(|| self.by_username.get(&lower))
        } else {
            self.by_username
                .get(&lower)
                .or_else(|| self.by_email.get(&lower))
        };
        id.and_then(|id| self.get(&id))
    }

    /// Fold a finished session's return into the owner's stats.
    pub fn record_game(&self, user_id: &str, return_pct: f64) {
        if let Some(mut user) = self.users.get_mut(user_id) {
            user.stats.record_game(return_pct);
            let snapshot = user.clone();
            drop(user);
            self.persist(&snapshot);
        }
    }

    /// Ensure an operator account (admin/tester) exists with the given
    /// credentials; updates role and password when it already does.
    pub fn upsert_operator(&self, identifier: &str, password_hash: String, role: Role) {
        if let Some(existing) = self.find_by_identifier(identifier) {
            if let Some(mut user) = self.users.get_mut(&existing.user_id) {
                user.role = role;
                user.password_hash = password_hash;
                let snapshot = user.clone();
                drop(user);
                self.persist(&snapshot);
            }
            return;
        }

        let (email, username) = if identifier.contains('@') {
            (Some(identifier.to_string()), None)
        } else {
            (None, Some(identifier.to_string()))
        };
        let _ = self.create(
            email,
            username,
            identifier.to_string(),
            password_hash,
            role,
        );
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;

    fn store() -> UserStore {
        UserStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_create_and_lookup() {
        let users = store();
        let user = users
            .create(
                Some("a@example.com".to_string()),
                Some("alice".to_string()),
                "Alice".to_string(),
                "hash".to_string(),
                Role::User,
            )
            .unwrap();

        assert_eq!(
            users.find_by_identifier("alice").unwrap().user_id,
            user.user_id
        );
        assert_eq!(
            users.find_by_identifier("A@Example.Com").unwrap().user_id,
            user.user_id
        );
    }

    #[test]
    fn test_duplicate_identifiers_rejected() {
        let users = store();
        users
            .create(
                None,
                Some("bob".to_string()),
                "Bob".to_string(),
                "hash".to_string(),
                Role::User,
            )
            .unwrap();

        let err = users
            .create(
                None,
                Some("BOB".to_string()),
                "Bob 2".to_string(),
                "hash".to_string(),
                Role::User,
            )
            .unwrap_err();
        assert!(matches!(err, UserStoreError::DuplicateUsername));
    }

    #[test]
    fn test_missing_identifier_rejected() {
        let users = store();
        let err = users
            .create(None, None, "Ghost".to_string(), "hash".to_string(), Role::User)
            .unwrap_err();
        assert!(matches!(err, UserStoreError::MissingIdentifier));
    }

    #[test]
    fn test_stats_rollup() {
        let users = store();
        let user = users
            .create(
                None,
                Some("carol".to_string()),
                "Carol".to_string(),
                "hash".to_string(),
                Role::User,
            )
            .unwrap();

        users.record_game(&user.user_id, 10.0);
        users.record_game(&user.user_id, -4.0);

        let stats = users.get(&user.user_id).unwrap().stats;
        assert_eq!(stats.games_played, 2);
        assert_eq!(stats.best_return, 10.0);
        assert!((stats.average_return - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_persistence_survives_reload() {
        let backing = Arc::new(MemoryStore::new());
        {
            let users = UserStore::new(backing.clone());
            users
                .create(
                    None,
                    Some("dave".to_string()),
                    "Dave".to_string(),
                    "hash".to_string(),
                    Role::Tester,
                )
                .unwrap();
        }
        let reloaded = UserStore::new(backing);
        assert!(reloaded.find_by_identifier("dave").is_some());
    }
}
