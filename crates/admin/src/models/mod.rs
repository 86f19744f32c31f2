//! Domain models for admin.

pub mod session;

pub use session::{AdminSession, CurrentAdmin};
