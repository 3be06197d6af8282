pub mod config;
pub mod db;
pub mod error;
pub mod shutdown;
pub mod types;
