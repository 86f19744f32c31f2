//! Shelfmark Core - Shared domain types.
//!
//! This crate provides the types used across all Shelfmark components:
//! - `admin` - Admin product API and image upload proxy
//! - `cli` - Stress-test harnesses and admin tooling
//!
//! # Architecture
//!
//! The core crate contains only types and pure policy - no I/O, no HTTP
//! clients. The partial-update rules for products live here so that every
//! layer applies them identically.
//!
//! # Modules
//!
//! - [`types`] - Emails, slugs, product rows and partial updates

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
