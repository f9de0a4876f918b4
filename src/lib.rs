pub mod config;
pub mod format;
pub mod output;
pub mod render;
pub mod server;
pub mod snapshot;
