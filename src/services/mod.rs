pub mod auth;
pub mod catalog;
pub mod chat;
pub mod clock;
pub mod modes;
pub mod price_engine;
pub mod registry;
pub mod save_store;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod trader;
pub mod user_store;

pub use auth::{AuthError, AuthGate, Identity, RegisterRequest};
pub use catalog::Catalog;
pub use chat::{ChatError, ChatLog, ChatPage};
pub use clock::{ClockAdvance, SimClock};
pub use registry::{BotRecord, SessionHandle, SessionRegistry};
pub use save_store::{SaveError, SaveStore};
pub use session::{Session, SessionOwner, TickReport};
pub use store::{DocumentStore, MemoryStore};
pub use trader::TradeError;
pub use user_store::{UserStore, UserStoreError};
