//! User & Chat Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access role attached to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Tester,
    Admin,
}

impl Role {
    /// Chat (read, post, and the push topic) is restricted to these roles.
    pub fn can_chat(&self) -> bool {
        matches!(self, Role::Tester | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Tester => write!(f, "tester"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Lifetime gameplay statistics rolled up when sessions end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserStats {
    pub games_played: u32,
    /// Best session return percentage seen so far
    pub best_return: f64,
    /// Mean session return percentage across all games
    pub average_return: f64,
}

impl UserStats {
    /// Fold one finished session's return percentage into the aggregate.
    pub fn record_game(&mut self, return_pct: f64) {
        let total = self.average_return * self.games_played as f64 + return_pct;
        self.games_played += 1;
        self.average_return = total / self.games_played as f64;
        if self.games_played == 1 || return_pct > self.best_return {
            self.best_return = return_pct;
        }
    }
}

/// A registered account. At least one of `email` / `username` is present,
/// each unique within its category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub display_name: String,
    /// Salted digest; clients only ever see [`UserProfile`]
    pub password_hash: String,
    pub role: Role,
    pub stats: UserStats,
    #[serde(with = "crate::types::timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Public view of a user, safe to return from the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub display_name: String,
    pub role: Role,
    pub stats: UserStats,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
            stats: user.stats.clone(),
        }
    }
}

/// One message in the global chat room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub user_id: String,
    pub display_name: String,
    pub text: String,
    #[serde(with = "crate::types::timestamp")]
    pub wall_timestamp: DateTime<Utc>,
    #[serde(with = "crate::types::timestamp")]
    pub sim_timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        user_id: &str,
        display_name: &str,
        text: String,
        sim_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            text,
            wall_timestamp: crate::types::timestamp::now(),
            sim_timestamp,
        }
    }
}
