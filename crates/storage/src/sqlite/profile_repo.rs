use quiz_core::model::{UserId, UserProfile};

use super::SqliteRepository;
use super::mapping::{map_profile_row, unavailable};
use crate::repository::{ProfileRepository, StorageError};

#[async_trait::async_trait]
impl ProfileRepository for SqliteRepository {
    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO profiles (id, display_name, level, xp_points, streak_days, last_activity)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                level = excluded.level,
                xp_points = excluded.xp_points,
                streak_days = excluded.streak_days,
                last_activity = excluded.last_activity
            ",
        )
        .bind(profile.id.to_string())
        .bind(profile.display_name.as_str())
        .bind(i64::from(profile.level))
        .bind(i64::from(profile.xp_points))
        .bind(i64::from(profile.streak_days))
        .bind(profile.last_activity)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    async fn get_profile(&self, id: UserId) -> Result<Option<UserProfile>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, display_name, level, xp_points, streak_days, last_activity
            FROM profiles WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.as_ref().map(map_profile_row).transpose()
    }
}
