use std::sync::Arc;

use quiz_core::model::UserId;
use storage::repository::{IdentityProvider, Storage};

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::profile_service::ProfileService;
use crate::quiz_loop::QuizLoopService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    user_id: Option<UserId>,
    quiz_loop: Arc<QuizLoopService>,
    catalog: Arc<CatalogService>,
    profiles: Arc<ProfileService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        user_id: Option<UserId>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, user_id))
    }

    /// Build services over an already-opened storage, e.g. `Storage::in_memory()`.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, user_id: Option<UserId>) -> Self {
        let identity: Arc<dyn IdentityProvider> = Arc::new(storage.identity(user_id));
        let quiz_loop = Arc::new(QuizLoopService::new(
            clock,
            Arc::clone(&storage.provider),
            Arc::clone(&storage.attempts),
            Arc::clone(&identity),
        ));
        let catalog = Arc::new(CatalogService::new(Arc::clone(&storage.catalog)));
        let profiles = Arc::new(ProfileService::new(identity));

        Self {
            user_id,
            quiz_loop,
            catalog,
            profiles,
        }
    }

    /// Replace the quiz loop with one that shuffles question order.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.quiz_loop = Arc::new((*self.quiz_loop).clone().with_shuffle(shuffle));
        self
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    #[must_use]
    pub fn quiz_loop(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quiz_loop)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn profiles(&self) -> Arc<ProfileService> {
        Arc::clone(&self.profiles)
    }
}
