//! LinkBrain Core - Shared domain types and business rules.
//!
//! This crate provides the types and rules used across all LinkBrain components:
//! - `server` - User and admin HTTP API
//! - `cli` - Command-line tools for migrations, tokens and imports
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Every rule that decides an outcome (trial expiry,
//! referral bonuses, analytics buckets, legacy timestamp parsing) lives here so
//! it can be tested without a running service.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, colors, platforms and status enums
//! - [`timestamp`] - Normalizing the legacy timestamp formats found in clip documents
//! - [`subscription`] - Trial and subscription state computation
//! - [`referral`] - Referral codes, the bonus table and eligibility checks
//! - [`analytics`] - Admin dashboard aggregation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod analytics;
pub mod referral;
pub mod subscription;
pub mod timestamp;
pub mod types;

pub use types::*;
