use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use quiz_core::model::{
    AttemptId, Difficulty, DifficultyInfo, QuestionId, Topic, TopicInfo, UserId, UserProfile,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{AttemptRecord, ResponseRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn unavailable(e: sqlx::Error) -> StorageError {
    StorageError::Unavailable(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn usize_from_i64(field: &'static str, v: i64) -> Result<usize, StorageError> {
    usize::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn usize_to_i64(field: &'static str, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn parse_id<T: FromStr>(field: &'static str, raw: &str) -> Result<T, StorageError>
where
    T::Err: core::fmt::Display,
{
    T::from_str(raw).map_err(|e| StorageError::Serialization(format!("invalid {field}: {e}")))
}

pub(crate) fn question_id_from_str(raw: &str) -> Result<QuestionId, StorageError> {
    parse_id("question_id", raw)
}

pub(crate) fn attempt_id_from_str(raw: &str) -> Result<AttemptId, StorageError> {
    parse_id("attempt_id", raw)
}

pub(crate) fn user_id_from_str(raw: &str) -> Result<UserId, StorageError> {
    parse_id("user_id", raw)
}

pub(crate) fn map_topic_row(row: &SqliteRow) -> Result<TopicInfo, StorageError> {
    let name: String = row.try_get("name").map_err(ser)?;
    Ok(TopicInfo {
        topic: Topic::new(name).map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
    })
}

pub(crate) fn map_difficulty_row(row: &SqliteRow) -> Result<DifficultyInfo, StorageError> {
    let name: String = row.try_get("name").map_err(ser)?;
    Ok(DifficultyInfo {
        difficulty: Difficulty::new(name).map_err(ser)?,
        level_order: u32_from_i64("level_order", row.try_get("level_order").map_err(ser)?)?,
        description: row.try_get("description").map_err(ser)?,
    })
}

pub(crate) fn map_profile_row(row: &SqliteRow) -> Result<UserProfile, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let last_activity: Option<NaiveDate> = row.try_get("last_activity").map_err(ser)?;
    Ok(UserProfile {
        id: user_id_from_str(&id)?,
        display_name: row.try_get("display_name").map_err(ser)?,
        level: u32_from_i64("level", row.try_get("level").map_err(ser)?)?,
        xp_points: u32_from_i64("xp_points", row.try_get("xp_points").map_err(ser)?)?,
        streak_days: u32_from_i64("streak_days", row.try_get("streak_days").map_err(ser)?)?,
        last_activity,
    })
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<AttemptRecord, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let user_id: String = row.try_get("user_id").map_err(ser)?;
    let topic: String = row.try_get("topic").map_err(ser)?;
    let difficulty: String = row.try_get("difficulty").map_err(ser)?;
    let started_at: DateTime<Utc> = row.try_get("started_at").map_err(ser)?;
    let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at").map_err(ser)?;

    Ok(AttemptRecord {
        id: attempt_id_from_str(&id)?,
        user_id: user_id_from_str(&user_id)?,
        topic: Topic::new(topic).map_err(ser)?,
        difficulty: Difficulty::new(difficulty).map_err(ser)?,
        total_questions: u32_from_i64(
            "total_questions",
            row.try_get("total_questions").map_err(ser)?,
        )?,
        correct_answers: u32_from_i64(
            "correct_answers",
            row.try_get("correct_answers").map_err(ser)?,
        )?,
        score_percentage: row
            .try_get::<Option<i64>, _>("score_percentage")
            .map_err(ser)?
            .map(|v| u32_from_i64("score_percentage", v))
            .transpose()?,
        time_taken_seconds: row
            .try_get::<Option<i64>, _>("time_taken_seconds")
            .map_err(ser)?
            .map(|v| u32_from_i64("time_taken_seconds", v))
            .transpose()?,
        started_at,
        completed_at,
    })
}

pub(crate) fn map_response_row(row: &SqliteRow) -> Result<ResponseRecord, StorageError> {
    let attempt_id: String = row.try_get("attempt_id").map_err(ser)?;
    let question_id: String = row.try_get("question_id").map_err(ser)?;
    let is_correct: i64 = row.try_get("is_correct").map_err(ser)?;

    Ok(ResponseRecord {
        attempt_id: attempt_id_from_str(&attempt_id)?,
        question_id: question_id_from_str(&question_id)?,
        chosen_option: row
            .try_get::<Option<i64>, _>("selected_option")
            .map_err(ser)?
            .map(|v| usize_from_i64("selected_option", v))
            .transpose()?,
        correct: is_correct != 0,
        elapsed_seconds: u32_from_i64(
            "time_taken_seconds",
            row.try_get("time_taken_seconds").map_err(ser)?,
        )?,
        answered_at: row.try_get("answered_at").map_err(ser)?,
    })
}
