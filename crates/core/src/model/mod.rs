mod catalog;
mod ids;
mod profile;
mod question;
mod settings;

pub use catalog::{CatalogError, Difficulty, DifficultyInfo, Topic, TopicInfo};
pub use ids::{AttemptId, ParseIdError, QuestionId, UserId};
pub use profile::{UserProfile, XP_PER_LEVEL};
pub use question::{
    AnswerOption, DEFAULT_EXPLANATION, DEFAULT_POINTS, MIN_OPTIONS, OptionDraft, Question,
    QuestionError,
};
pub use settings::{
    DEFAULT_QUESTION_LIMIT, DEFAULT_TIME_PER_QUESTION_SECS, MAX_TIME_PER_QUESTION_SECS,
    QuizSettings, SettingsError,
};
