use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("topic name cannot be empty")]
    EmptyTopic,

    #[error("difficulty name cannot be empty")]
    EmptyDifficulty,
}

/// Subject matter a quiz draws from, e.g. a programming language.
///
/// Names are stored upper-cased so `"rust"` and `"Rust"` resolve to the same topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic(String);

impl Topic {
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyTopic` for blank names.
    pub fn new(name: impl AsRef<str>) -> Result<Self, CatalogError> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(CatalogError::EmptyTopic);
        }
        Ok(Self(name.to_uppercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Difficulty tier of a question set, stored in capitalized form (`"Expert"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Difficulty(String);

impl Difficulty {
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyDifficulty` for blank names.
    pub fn new(name: impl AsRef<str>) -> Result<Self, CatalogError> {
        let name = name.as_ref().trim();
        let mut chars = name.chars();
        let Some(first) = chars.next() else {
            return Err(CatalogError::EmptyDifficulty);
        };
        let normalized: String = first
            .to_uppercase()
            .chain(chars.as_str().to_lowercase().chars())
            .collect();
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog entry describing a selectable topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicInfo {
    pub topic: Topic,
    pub description: Option<String>,
}

/// Catalog entry describing a difficulty tier; `level_order` sorts tiers easiest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyInfo {
    pub difficulty: Difficulty,
    pub level_order: u32,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_is_upper_cased() {
        assert_eq!(Topic::new(" javaScript ").unwrap().as_str(), "JAVASCRIPT");
    }

    #[test]
    fn difficulty_is_capitalized() {
        assert_eq!(Difficulty::new("eXPERT").unwrap().as_str(), "Expert");
        assert_eq!(Difficulty::new("intermediate").unwrap().as_str(), "Intermediate");
    }

    #[test]
    fn blank_names_are_rejected() {
        assert_eq!(Topic::new("  ").unwrap_err(), CatalogError::EmptyTopic);
        assert_eq!(Difficulty::new("").unwrap_err(), CatalogError::EmptyDifficulty);
    }
}
