//! Core types for LinkBrain.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod color;
pub mod email;
pub mod id;
pub mod platform;
pub mod status;

pub use color::{ColorError, HexColor};
pub use email::{Email, EmailError};
pub use id::*;
pub use platform::Platform;
pub use status::*;
