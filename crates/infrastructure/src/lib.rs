//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_event_store;
mod in_memory_throttle_repository;
mod postgres_authorization_repository;
mod postgres_event_store;

pub use in_memory_event_store::InMemoryEventStore;
pub use in_memory_throttle_repository::InMemoryThrottleRepository;
pub use postgres_authorization_repository::PostgresAuthorizationRepository;
pub use postgres_event_store::PostgresEventStore;
