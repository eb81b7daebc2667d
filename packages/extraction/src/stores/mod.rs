//! Storage implementations and the upsert merge policy.

pub mod memory;
pub mod merge;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;
pub use merge::{merge_records, MergePolicy, FIELD_POLICIES};

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
