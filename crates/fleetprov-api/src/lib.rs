// fleetprov-api: Async Rust client for the fleet provisioning control plane

pub mod call;
pub mod client;
pub mod error;
pub mod transport;

pub use call::ApiCall;
pub use client::ControlPlaneClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
