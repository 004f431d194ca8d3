//! Domain layer - Pure business abstractions
//!
//! This layer contains NO framework dependencies (no SeaORM, no Axum).
//! Only trait definitions, the mailing schedule vocabulary and domain error types.

pub mod actor;
pub mod errors;
pub mod repositories;
pub mod schedule;

pub use actor::Actor;
pub use errors::DomainError;
pub use repositories::*;
pub use schedule::{DeliveryStatus, Frequency, MailingStatus, StartTime};
