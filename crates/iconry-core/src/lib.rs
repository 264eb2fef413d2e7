//! Core types and rules for the Iconry icon catalog.
//!
//! This crate holds the pieces of the icon lifecycle engine that do not need
//! a database: the code-space allocator, the icon state machine, permission
//! and format rules, the audit batch model, and audit-trail events. Storage
//! backends implement [`store::IconStore`] on top of these.

pub mod audit;
pub mod code;
pub mod error;
pub mod icon;
pub mod lifecycle;
pub mod log;
pub mod naming;
pub mod permission;
pub mod store;
pub mod validate;

pub use error::{Error, Result};
