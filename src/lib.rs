pub mod ai;
pub mod config;
pub mod core;
pub mod logging;
pub mod mail;
pub mod planner;
pub mod server;
pub mod store;

pub use logging::{debug_logging, set_debug_logging};
