use std::sync::Arc;

use quiz_core::model::{DifficultyInfo, TopicInfo};
use storage::repository::{CatalogRepository, StorageError};

/// Read access to the topics and difficulty tiers a learner can pick from.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    pub async fn topics(&self) -> Result<Vec<TopicInfo>, StorageError> {
        self.catalog.list_topics().await
    }

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    pub async fn difficulties(&self) -> Result<Vec<DifficultyInfo>, StorageError> {
        self.catalog.list_difficulties().await
    }
}
