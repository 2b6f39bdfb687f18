pub mod config;
pub mod domain;
pub mod identity;
pub mod messaging;
pub mod metrics;
pub mod persistence;
pub mod utils;
