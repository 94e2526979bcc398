pub mod client;
pub mod service;

pub use client::RelayClient;
pub use service::{RelayPort, RelayService};
