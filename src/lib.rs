pub mod game;
pub mod ai;
pub mod storage;
pub mod error;
pub mod config;

pub use error::{GameError, AIError, PersistenceError, Result};
pub use config::{Config, ConfigError};
