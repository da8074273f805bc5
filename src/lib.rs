pub mod checks;
pub mod client;
pub mod config;
pub mod logging;
