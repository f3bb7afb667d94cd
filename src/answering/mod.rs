//! Answering: static answers, retrieval-augmented generation and chat sessions

pub mod memory;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod service;
pub mod session;
pub mod static_answers;
pub mod token_estimator;

pub use memory::ConversationMemory;
pub use models::{Answer, AnswerOrigin, AnswerStage, ChatMessage, Role};
pub use pipeline::{AnsweringPipeline, FinalStage, RankStage};
pub use service::RetrievalAnsweringService;
pub use session::ChatSession;
pub use static_answers::{StaticAnswerEntry, StaticAnswers};
pub use token_estimator::TokenEstimator;
