//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Account registration, login, tokens, and field validation
//! - `analytics` - Rating-trend math for the owner dashboard

pub mod analytics;
pub mod auth;
