//! # Courseboard Auth
//!
//! Bearer token verification for the Courseboard API.
//!
//! Tokens are HS256 JWTs minted by an external identity provider that shares
//! `JWT_SECRET`. This crate only verifies them; [`create_access_token`] exists
//! for operator tooling and tests.
//!
//! ```ignore
//! use courseboard_auth::verify_token;
//! use courseboard_config::JwtConfig;
//!
//! let claims = verify_token(&token, &JwtConfig::from_env())?;
//! println!("{} is {}", claims.username, claims.role);
//! ```

pub mod caller;
pub mod claims;
pub mod jwt;
pub mod roles;

pub use caller::Caller;
pub use claims::Claims;
pub use jwt::{create_access_token, verify_token};
pub use roles::UserRole;
