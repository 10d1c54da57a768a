pub mod cli;
pub mod config;
pub mod exec;
pub mod serve;
