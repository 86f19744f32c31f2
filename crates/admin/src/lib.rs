//! Shelfmark Admin library.
//!
//! This crate provides the admin product API as a library,
//! allowing it to be tested and reused.
//!
//! # Security
//!
//! This crate contains HIGH PRIVILEGE access:
//! - Managed database via the service-role key (bypasses row-level security)
//! - Managed object storage (write access to the product image bucket)
//!
//! Every `/admin/*` route except login requires a bearer token whose email
//! is on the configured admin allow-list.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
