//! # Courseboard Core
//!
//! Core types, errors, and utilities for the Courseboard API.
//!
//! This crate provides foundational types used throughout the application:
//!
//! - [`errors`]: Application error types with HTTP response conversion
//! - [`pagination`]: Pagination utilities for API responses
//! - [`password`]: Password hashing and verification
//! - [`serde`]: Custom serde helpers for query strings
//!
//! # Example
//!
//! ```ignore
//! use courseboard_core::errors::AppError;
//! use courseboard_core::pagination::{PaginationParams, PaginationMeta};
//!
//! // A field-keyed validation failure
//! let error = AppError::field("capacity", "capacity must be a positive number");
//!
//! // Use pagination
//! let params = PaginationParams::default();
//! let limit = params.limit();
//! ```

pub mod errors;
pub mod pagination;
pub mod password;
pub mod serde;

// Re-export commonly used types at crate root
pub use errors::{AppError, FieldErrors, NON_FIELD_ERRORS};
pub use pagination::{PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
