//! `sm-cli` commands.
//!
//! - `stress` - Database and API stress harnesses
//! - `admin` - Allow-list checks

pub mod admin;
pub mod stress;
