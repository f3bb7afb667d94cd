//! Answers and the per-query state machine

pub use crate::generation::models::{ChatMessage, Role};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an answer came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOrigin {
    /// Exact match in the static answer map
    Static,
    /// Retrieval-augmented generation
    Generated,
}

/// An answer plus the sources it rests on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<String>,
    pub origin: AnswerOrigin,
}

/// Stages a query passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStage {
    CheckCache,
    CacheHit,
    Retrieve,
    Generate,
    Done,
}

impl AnswerStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerStage::CheckCache => "CHECK_CACHE",
            AnswerStage::CacheHit => "CACHE_HIT",
            AnswerStage::Retrieve => "RETRIEVE",
            AnswerStage::Generate => "GENERATE",
            AnswerStage::Done => "DONE",
        }
    }
}

impl fmt::Display for AnswerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
