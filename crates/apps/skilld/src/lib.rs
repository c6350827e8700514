//! Library half of the `skilld` webhook daemon: configuration loading and
//! the demo skill it serves.

pub mod config;
pub mod greeter;

pub use config::{ConfigError, DaemonConfig, TlsConfig};
