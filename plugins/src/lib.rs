pub mod factory;
pub mod policy;
pub mod rpc;
pub mod runner;
