use quiz_core::model::{DifficultyInfo, TopicInfo};

use super::SqliteRepository;
use super::mapping::{map_difficulty_row, map_topic_row, unavailable};
use crate::repository::{CatalogRepository, StorageError};

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn upsert_topic(&self, topic: &TopicInfo) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO topics (name, description)
            VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET description = excluded.description
            ",
        )
        .bind(topic.topic.as_str())
        .bind(topic.description.as_deref())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    async fn upsert_difficulty(&self, difficulty: &DifficultyInfo) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO difficulty_levels (name, level_order, description)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET
                level_order = excluded.level_order,
                description = excluded.description
            ",
        )
        .bind(difficulty.difficulty.as_str())
        .bind(i64::from(difficulty.level_order))
        .bind(difficulty.description.as_deref())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    async fn list_topics(&self) -> Result<Vec<TopicInfo>, StorageError> {
        let rows = sqlx::query("SELECT name, description FROM topics ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;
        rows.iter().map(map_topic_row).collect()
    }

    async fn list_difficulties(&self) -> Result<Vec<DifficultyInfo>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT name, level_order, description
            FROM difficulty_levels
            ORDER BY level_order ASC, name ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;
        rows.iter().map(map_difficulty_row).collect()
    }
}
