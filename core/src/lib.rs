pub mod api;
pub mod config;
pub mod context;
pub mod depend;
pub mod error;
