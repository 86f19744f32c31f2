//! HTTP middleware and extractors for admin.
//!
//! The layer stack itself (Sentry and request tracing) is assembled in
//! [`crate::routes::app`]; this module holds request extractors.

pub mod auth;

pub use auth::RequireAdmin;
