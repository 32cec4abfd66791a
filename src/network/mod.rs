//! Relay networking: hub, peers and connection loops

pub mod client;
pub mod hub;
pub mod peer;
pub mod server;
pub mod session;

pub use hub::{HubHandle, RelayHub};
pub use peer::Peer;
pub use server::RelayServer;
