//! Confluence - multi-timeframe trading signal engine

pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use config::Config;
pub use error::{AppError, Result};
pub use services::SignalStore;
