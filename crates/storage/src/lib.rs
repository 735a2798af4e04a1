#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AttemptRecorder, CatalogRepository, IdentityProvider, InMemoryRepository, LocalIdentity,
    ProfileRepository, QuestionProvider, QuestionRepository, Storage, StorageError,
};
