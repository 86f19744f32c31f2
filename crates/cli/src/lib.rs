//! Shelfmark CLI library.
//!
//! The commands live here so the stress harnesses can be driven from tests
//! as well as from the `sm-cli` binary.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod commands;
