//! MedQA - Medical Question Answering Retrieval Engine
//!
//! Answers free-text medical questions from a curated question/answer corpus.
//! A query is first tried against the keyword tags of every record; when no
//! tag matches, it falls back to TF-IDF cosine similarity over the corpus
//! questions. An offline evaluator scores labeled pairs against a dynamic
//! threshold.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod keywords;
pub mod normalize;
pub mod record;
pub mod resolver;
pub mod stats;
pub mod store;
pub mod vector;

pub use analysis::{ChatOp, DocumentAnalysis, TextAnalyzer};
pub use config::EngineConfig;
pub use engine::{ChatReply, Engine};
pub use error::{EngineError, Result};
pub use evaluation::{EvaluationResult, EvaluationVariant, Evaluator, LabeledPair};
pub use keywords::KeywordExtractor;
pub use normalize::{StopWords, TextNormalizer};
pub use record::{Corpus, RawRecord, Record};
pub use resolver::{MatchOutcome, MatchPath, MatchResolver};
pub use stats::{StatsSink, StatsSnapshot, SystemStats};
pub use store::{IndexHandle, IndexStore};
pub use vector::{Vector, VectorIndex};
