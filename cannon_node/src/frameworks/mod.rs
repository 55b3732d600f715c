// Frameworks layer: configuration and node bootstrap.

pub mod config;
pub mod server;
