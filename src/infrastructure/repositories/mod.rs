//! Repository implementations using SeaORM

pub mod client_repository;
pub mod message_repository;

pub use client_repository::SeaOrmClientRepository;
pub use message_repository::SeaOrmMessageRepository;
