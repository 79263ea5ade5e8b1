pub mod config;
pub mod error;
pub mod model;
pub mod security;
pub mod storage;
pub mod identity;
pub mod server;
pub mod tools;
