//! Realtime feed: committed changes fan out to live lists, which are pushed
//! to WebSocket clients as full snapshots.

pub mod connection;
pub mod dispatcher;
pub mod live;

pub use connection::{TokenVerifier, handle_connection};
pub use dispatcher::Dispatcher;
pub use live::LiveCollection;
