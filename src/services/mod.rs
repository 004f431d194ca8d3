//! Services Layer
//!
//! This module contains pure business logic extracted from HTTP handlers.
//! Handlers translate requests into these calls and `DomainError`s into
//! responses.

pub mod blog_service;
pub mod mailing_service;
pub mod user_service;

pub use mailing_service::{DispatchReport, SavedMailing};
