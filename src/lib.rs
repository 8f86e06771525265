pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod inflight;
pub mod key;
pub mod logging;
pub mod server;
pub mod store;
