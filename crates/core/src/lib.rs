//! `provilink-core`: shared building blocks for the storefront session core.
//!
//! This crate contains **pure** primitives (no IO, no async).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::IdentityId;
