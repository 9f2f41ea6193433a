pub mod store;
pub use store::DocumentStore;
pub mod memory_store;
pub use memory_store::InMemoryStore;
pub mod pg_store;
pub use pg_store::PgStore;
