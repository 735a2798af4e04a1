use std::collections::HashMap;

use chrono::{DateTime, Utc};
use quiz_core::model::{Difficulty, OptionDraft, Question, QuestionId, Topic};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{question_id_from_str, ser, u32_from_i64, unavailable};
use crate::repository::{QuestionProvider, QuestionRecord, QuestionRepository, StorageError};

impl SqliteRepository {
    async fn catalog_entry_exists(
        &self,
        topic: &Topic,
        difficulty: &Difficulty,
    ) -> Result<bool, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                EXISTS(SELECT 1 FROM topics WHERE name = ?1) AS has_topic,
                EXISTS(SELECT 1 FROM difficulty_levels WHERE name = ?2) AS has_difficulty
            ",
        )
        .bind(topic.as_str())
        .bind(difficulty.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unavailable)?;

        let has_topic: i64 = row.try_get("has_topic").map_err(ser)?;
        let has_difficulty: i64 = row.try_get("has_difficulty").map_err(ser)?;
        Ok(has_topic != 0 && has_difficulty != 0)
    }

    async fn options_for(
        &self,
        ids: &[QuestionId],
    ) -> Result<HashMap<QuestionId, Vec<OptionDraft>>, StorageError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut sql = String::from(
            r"
            SELECT question_id, option_order, option_text, is_correct
            FROM answer_options
            WHERE question_id IN (
            ",
        );
        for i in 0..ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push_str(")\nORDER BY question_id, option_order");

        let mut q = sqlx::query(&sql);
        for id in ids {
            q = q.bind(id.to_string());
        }
        let rows = q.fetch_all(&self.pool).await.map_err(unavailable)?;

        let mut by_question: HashMap<QuestionId, Vec<OptionDraft>> =
            HashMap::with_capacity(ids.len());
        for row in rows {
            let question_id: String = row.try_get("question_id").map_err(ser)?;
            let order = u32_from_i64("option_order", row.try_get("option_order").map_err(ser)?)?;
            let text: String = row.try_get("option_text").map_err(ser)?;
            let is_correct: i64 = row.try_get("is_correct").map_err(ser)?;
            by_question
                .entry(question_id_from_str(&question_id)?)
                .or_default()
                .push(OptionDraft::new(order, text, is_correct != 0));
        }
        Ok(by_question)
    }
}

#[async_trait::async_trait]
impl QuestionProvider for SqliteRepository {
    async fn fetch(
        &self,
        topic: &Topic,
        difficulty: &Difficulty,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError> {
        if !self.catalog_entry_exists(topic, difficulty).await? {
            return Err(StorageError::NotFound);
        }

        let rows = sqlx::query(
            r"
            SELECT id, question_text, code_snippet, explanation, points, created_at
            FROM questions
            WHERE topic = ?1 AND difficulty = ?2
            ORDER BY created_at ASC, id ASC
            LIMIT ?3
            ",
        )
        .bind(topic.as_str())
        .bind(difficulty.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("id").map_err(ser)?;
            let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;
            records.push(QuestionRecord {
                id: question_id_from_str(&id)?,
                topic: topic.clone(),
                difficulty: difficulty.clone(),
                text: row.try_get("question_text").map_err(ser)?,
                code_snippet: row.try_get("code_snippet").map_err(ser)?,
                explanation: row.try_get("explanation").map_err(ser)?,
                points: row.try_get("points").map_err(ser)?,
                options: Vec::new(),
                created_at,
            });
        }

        let ids: Vec<QuestionId> = records.iter().map(|r| r.id).collect();
        let mut options = self.options_for(&ids).await?;

        let mut questions = Vec::with_capacity(records.len());
        for mut record in records {
            record.options = options.remove(&record.id).unwrap_or_default();
            let id = record.id;
            match record.into_question() {
                Ok(question) => questions.push(question),
                Err(err) => log::warn!("skipping malformed question {id}: {err}"),
            }
        }
        log::debug!(
            "fetched {} questions for {topic}/{difficulty}",
            questions.len()
        );
        Ok(questions)
    }
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, record: &QuestionRecord) -> Result<(), StorageError> {
        if !self
            .catalog_entry_exists(&record.topic, &record.difficulty)
            .await?
        {
            return Err(StorageError::NotFound);
        }

        let id = record.id.to_string();
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        sqlx::query(
            r"
            INSERT INTO questions (id, topic, difficulty, question_text, code_snippet, explanation, points, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                topic = excluded.topic,
                difficulty = excluded.difficulty,
                question_text = excluded.question_text,
                code_snippet = excluded.code_snippet,
                explanation = excluded.explanation,
                points = excluded.points
            ",
        )
        .bind(id.as_str())
        .bind(record.topic.as_str())
        .bind(record.difficulty.as_str())
        .bind(record.text.as_str())
        .bind(record.code_snippet.as_deref())
        .bind(record.explanation.as_deref())
        .bind(record.points)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        sqlx::query("DELETE FROM answer_options WHERE question_id = ?1")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;

        for option in &record.options {
            sqlx::query(
                r"
                INSERT INTO answer_options (question_id, option_order, option_text, is_correct)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(id.as_str())
            .bind(i64::from(option.order))
            .bind(option.text.as_str())
            .bind(i64::from(option.is_correct))
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;
        }

        tx.commit().await.map_err(unavailable)?;
        Ok(())
    }
}
