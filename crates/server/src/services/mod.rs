//! Business services sitting between the routes and the repositories.

pub mod ai;
pub mod analytics;
pub mod auth;
pub mod import;
pub mod referral;
