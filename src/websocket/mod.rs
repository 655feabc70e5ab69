pub mod connection;
pub mod handler;
pub mod hub;

pub use connection::{CloseReason, Connection, OutboundFrame, DEFAULT_QUEUE_DEPTH};
pub use handler::ws_handler;
pub use hub::Hub;
