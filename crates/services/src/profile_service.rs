use std::sync::Arc;

use quiz_core::model::UserProfile;
use storage::repository::{IdentityProvider, StorageError};

/// Dashboard view of the signed-in learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileOverview {
    pub profile: UserProfile,
    pub xp_to_next_level: u32,
}

#[derive(Clone)]
pub struct ProfileService {
    identity: Arc<dyn IdentityProvider>,
}

impl ProfileService {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }

    /// `None` when nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    pub async fn overview(&self) -> Result<Option<ProfileOverview>, StorageError> {
        Ok(self
            .identity
            .current_user()
            .await?
            .map(|profile| ProfileOverview {
                xp_to_next_level: profile.xp_to_next_level(),
                profile,
            }))
    }
}
