//! # Courseboard Config
//!
//! Configuration types for the Courseboard API, loaded from environment
//! variables (a `.env` file is read by the binaries through `dotenvy`).
//!
//! - [`jwt`]: token verification settings
//! - [`cors`]: allowed browser origins
//! - [`database`]: connection string and pool size
//! - [`server`]: listener addresses
//!
//! ```ignore
//! use courseboard_config::{CorsConfig, DatabaseConfig, JwtConfig, ServerConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let database_config = DatabaseConfig::from_env()?;
//! ```

pub mod cors;
pub mod database;
pub mod jwt;
pub mod server;

pub use cors::CorsConfig;
pub use database::{ConfigError, DatabaseConfig};
pub use jwt::JwtConfig;
pub use server::ServerConfig;

pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
