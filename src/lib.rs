pub mod config;
pub mod env;
pub mod executor;
pub mod suite;
