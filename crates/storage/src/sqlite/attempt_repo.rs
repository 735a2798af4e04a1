use quiz_core::model::AttemptId;

use super::SqliteRepository;
use super::mapping::{map_attempt_row, map_response_row, unavailable, usize_to_i64};
use crate::repository::{
    AttemptRecorder, AttemptRecord, AttemptResult, NewAttempt, ResponseRecord, StorageError,
};

#[async_trait::async_trait]
impl AttemptRecorder for SqliteRepository {
    async fn create_attempt(&self, attempt: &NewAttempt) -> Result<AttemptId, StorageError> {
        let id = AttemptId::random();
        sqlx::query(
            r"
            INSERT INTO quiz_attempts (id, user_id, topic, difficulty, total_questions, started_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id.to_string())
        .bind(attempt.user_id.to_string())
        .bind(attempt.topic.as_str())
        .bind(attempt.difficulty.as_str())
        .bind(i64::from(attempt.total_questions))
        .bind(attempt.started_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(id)
    }

    async fn record_response(&self, response: &ResponseRecord) -> Result<(), StorageError> {
        let exists = sqlx::query("SELECT 1 FROM quiz_attempts WHERE id = ?1")
            .bind(response.attempt_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        let selected = response
            .chosen_option
            .map(|index| usize_to_i64("selected_option", index))
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO user_responses (attempt_id, question_id, selected_option, is_correct, time_taken_seconds, answered_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(response.attempt_id.to_string())
        .bind(response.question_id.to_string())
        .bind(selected)
        .bind(i64::from(response.correct))
        .bind(i64::from(response.elapsed_seconds))
        .bind(response.answered_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    async fn finalize_attempt(
        &self,
        attempt_id: AttemptId,
        result: &AttemptResult,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE quiz_attempts SET
                correct_answers = ?2,
                total_questions = ?3,
                score_percentage = ?4,
                time_taken_seconds = ?5,
                completed_at = ?6
            WHERE id = ?1
            ",
        )
        .bind(attempt_id.to_string())
        .bind(i64::from(result.score))
        .bind(i64::from(result.total_questions))
        .bind(i64::from(result.score_percentage))
        .bind(i64::from(result.elapsed_seconds))
        .bind(result.completed_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_attempt(&self, attempt_id: AttemptId) -> Result<AttemptRecord, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, topic, difficulty, total_questions, correct_answers,
                   score_percentage, time_taken_seconds, started_at, completed_at
            FROM quiz_attempts WHERE id = ?1
            ",
        )
        .bind(attempt_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?
        .ok_or(StorageError::NotFound)?;

        map_attempt_row(&row)
    }

    async fn list_responses(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<ResponseRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT attempt_id, question_id, selected_option, is_correct, time_taken_seconds, answered_at
            FROM user_responses
            WHERE attempt_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(attempt_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.iter().map(map_response_row).collect()
    }
}
