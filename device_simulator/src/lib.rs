pub mod api;
pub mod config;
pub mod device;
pub mod logging;
pub mod server;
