pub mod codec;
pub mod config;
pub mod database;
pub mod error;
pub mod record;
pub mod retry;
pub mod types;
