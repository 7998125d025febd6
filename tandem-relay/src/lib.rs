mod cache;
mod client;
mod config;
mod envelope;
pub mod server;
mod transport;

pub use cache::SessionCache;
pub use client::RelayClient;
pub use config::{DEFAULT_PROXY_PREFIX, DEFAULT_RELAY_URL, RelayConfig};
pub use envelope::unwrap_latest;
pub use transport::{HttpTransport, RelayTransport, TransportError};
