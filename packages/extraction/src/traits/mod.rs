//! Core trait abstractions for external collaborators and storage.

pub mod completion;
pub mod content;
pub mod store;

pub use completion::{Completion, ResponseFormat};
pub use content::{ContentSource, PageContent};
pub use store::{JobCatalog, RecordStore, Store};
