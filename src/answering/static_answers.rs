//! Curated answers served without retrieval or generation

use crate::error::{CoachError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// A curated answer with its sources
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaticAnswerEntry {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Read-only question → answer map.
///
/// Lookup is exact: case, punctuation and whitespace all matter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticAnswers {
    entries: IndexMap<String, StaticAnswerEntry>,
}

impl StaticAnswers {
    pub fn new(entries: IndexMap<String, StaticAnswerEntry>) -> Self {
        Self { entries }
    }

    /// The coaching answers shipped with the application
    pub fn builtin() -> Self {
        let mut entries = IndexMap::new();
        entries.insert(
            "What are effective strategies for personal growth?".to_string(),
            StaticAnswerEntry {
                answer: "Personal growth strategies include self-reflection, continuous learning, \
                         setting clear goals, developing emotional intelligence, practicing \
                         mindfulness, and seeking feedback from mentors and peers."
                    .to_string(),
                sources: vec![
                    "Personal Development Handbook - Ch. 3: Self-Improvement Techniques".to_string(),
                    "Coaching Principles Volume 2 - Section on Individual Growth".to_string(),
                ],
            },
        );
        entries.insert(
            "How can I develop better leadership skills?".to_string(),
            StaticAnswerEntry {
                answer: "Developing leadership skills involves active listening, empathy, clear \
                         communication, strategic thinking, adaptability, continuous learning, and \
                         the ability to inspire and motivate team members."
                    .to_string(),
                sources: vec![
                    "Leadership Excellence Magazine - Feature on Modern Leadership Competencies".to_string(),
                    "Harvard Business Review - Article on Emotional Intelligence in Leadership".to_string(),
                    "Organizational Behavior Research - Study on Effective Leadership Traits".to_string(),
                ],
            },
        );
        Self { entries }
    }

    /// Load from a JSON object of `question → {answer, sources}`
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoachError::Config(format!("cannot read static answers {}: {}", path.display(), e))
        })?;
        let answers: Self = serde_json::from_str(&content).map_err(|e| {
            CoachError::Config(format!("invalid static answers {}: {}", path.display(), e))
        })?;

        info!("Loaded {} static answers from {}", answers.len(), path.display());
        Ok(answers)
    }

    /// Exact lookup
    pub fn get(&self, question: &str) -> Option<&StaticAnswerEntry> {
        self.entries.get(question)
    }

    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup_is_exact() {
        let answers = StaticAnswers::builtin();

        assert_eq!(answers.len(), 2);
        assert!(answers.get("How can I develop better leadership skills?").is_some());
        assert!(answers.get("how can I develop better leadership skills?").is_none());
        assert!(answers.get("How can I develop better leadership skills? ").is_none());
        assert_eq!(
            answers.get("How can I develop better leadership skills?").unwrap().sources.len(),
            3
        );
    }

    #[test]
    fn test_load_from_json_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answers.json");
        std::fs::write(
            &path,
            r#"{
                "Zeta?": {"answer": "last letter", "sources": ["Greek"]},
                "Alpha?": {"answer": "first letter"}
            }"#,
        )
        .unwrap();

        let answers = StaticAnswers::from_json_file(&path).unwrap();
        let questions: Vec<_> = answers.questions().collect();

        assert_eq!(questions, vec!["Zeta?", "Alpha?"]);
        assert!(answers.get("Alpha?").unwrap().sources.is_empty());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answers.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        assert!(matches!(
            StaticAnswers::from_json_file(&path),
            Err(CoachError::Config(_))
        ));
    }
}
