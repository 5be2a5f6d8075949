//! Domain models for the server.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`]. Response shapes are serialized in camelCase.

pub mod clip;
pub mod content;
pub mod settings;
pub mod user;

pub use clip::{Category, CategoryWithCount, Clip};
pub use content::{Announcement, Inquiry, Popup};
pub use settings::{AdminSettings, Credits, Preferences};
pub use user::{User, UserProfile};
