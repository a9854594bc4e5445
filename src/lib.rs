//! Strength-training engine: workout rotation, set-by-set session tracking,
//! history analytics and backup reconciliation over a SQLite store.

pub mod analytics;
pub mod backup;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod rotation;
pub mod session;
pub mod storage;
pub mod store;
pub mod types;
pub mod utils;
pub mod volume;

pub use error::{Error, Result};
