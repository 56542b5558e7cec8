pub mod config;
pub mod requirement;
