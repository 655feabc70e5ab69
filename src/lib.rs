//! Paperfloor - multi-tenant stock-market simulation and trading-bot harness
//!
//! A synthetic live market per session, order execution for humans and
//! bots, a credential-gated push channel, and save-code persistence.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod types;
pub mod websocket;

use config::Config;
use services::{scheduler, AuthGate, Catalog, ChatLog, SaveStore, SessionRegistry, UserStore};
use std::sync::Arc;
use tracing::info;
use websocket::Hub;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    pub registry: Arc<SessionRegistry>,
    pub hub: Arc<Hub>,
    pub auth: Arc<AuthGate>,
    pub users: Arc<UserStore>,
    pub saves: Arc<SaveStore>,
    pub chat: Arc<ChatLog>,
    /// Server-owned session feeding the shared market tape
    pub reference_session: String,
}

impl AppState {
    /// Wire every component together and start the reference session's
    /// scheduler. Must run inside a tokio runtime.
    pub fn initialize(config: Config) -> Self {
        let config = Arc::new(config);
        let store: Arc<dyn services::DocumentStore> = Arc::new(services::MemoryStore::new());
        let catalog = Arc::new(Catalog::builtin());
        let users = Arc::new(UserStore::new(store.clone()));
        let auth = Arc::new(AuthGate::new(
            users.clone(),
            config.jwt_secret.as_bytes(),
            config.open_registration,
        ));
        let saves = Arc::new(SaveStore::new(store.clone()));
        let chat = Arc::new(ChatLog::new(store));
        let registry = SessionRegistry::new(catalog.clone());
        let hub = Hub::new();

        // Seed operator accounts from the environment.
        if let Some((identifier, password)) = &config.admin_account {
            users.upsert_operator(identifier, auth.hash_password(password), types::Role::Admin);
        }
        if let Some((identifier, password)) = &config.tester_account {
            users.upsert_operator(identifier, auth.hash_password(password), types::Role::Tester);
        }

        let reference = registry.create_system_session();
        scheduler::spawn(reference.clone(), hub.clone(), true);
        info!(
            instruments = catalog.len(),
            "market simulation initialized"
        );

        // Reap idle sessions, folding finished games into owner stats.
        {
            let registry = registry.clone();
            let users = users.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                    for handle in registry.reap_idle(services::registry::IDLE_SESSION_TIMEOUT) {
                        let (owner, return_pct) = {
                            let session = handle.lock();
                            (session.owner.clone(), session.return_pct())
                        };
                        if let services::SessionOwner::User(user_id) = owner {
                            users.record_game(&user_id, return_pct);
                        }
                    }
                }
            });
        }

        Self {
            config,
            catalog,
            registry,
            hub,
            auth,
            users,
            saves,
            chat,
            reference_session: reference.id.clone(),
        }
    }
}
