//! Orchestration facade over the retrieval components
//!
//! The engine owns the published index, the shared normalizer and the stats
//! collaborator. Every operation that has an observable side effect records it
//! through [`StatsSink`] here, never inside the components themselves.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::analysis::{parse_command, ChatOp, DocumentAnalysis, Entity, PosTag, TextAnalyzer};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::evaluation::{EvaluationResult, Evaluator, LabeledPair};
use crate::keywords::KeywordExtractor;
use crate::normalize::TextNormalizer;
use crate::record::{clean_title, Corpus, RawRecord, Record};
use crate::resolver::{MatchOutcome, MatchResolver};
use crate::stats::{StatsSink, StatsSnapshot, SystemStats};
use crate::store::{IndexHandle, IndexStore};

/// Response to a chat message, shaped by its command prefix
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ChatReply {
  Answer { outcome: MatchOutcome },
  PosTags { tags: Vec<PosTag> },
  Entities { entities: Vec<Entity> },
  Summary { keywords: Vec<String>, summary: String },
  Analysis { analysis: DocumentAnalysis },
}

pub struct Engine {
  config: EngineConfig,
  normalizer: Arc<TextNormalizer>,
  analyzer: TextAnalyzer,
  resolver: MatchResolver,
  evaluator: Evaluator,
  store: IndexStore,
  stats: Arc<dyn StatsSink>,
}

impl Engine {
  pub fn new(config: EngineConfig) -> Result<Self> {
    Self::with_stats(config, Arc::new(SystemStats::new()))
  }

  pub fn with_stats(config: EngineConfig, stats: Arc<dyn StatsSink>) -> Result<Self> {
    config.validate()?;

    let normalizer = Arc::new(TextNormalizer::from_config(&config.text));
    let extractor = KeywordExtractor::new(Arc::clone(&normalizer), &config.keywords);
    let store = IndexStore::new(IndexHandle::empty(&normalizer, &config.index));

    Ok(Self {
      analyzer: TextAnalyzer::new(extractor),
      resolver: MatchResolver::new(&config.matching, &config.keywords),
      evaluator: Evaluator::new(Arc::clone(&normalizer), config.index.clone()),
      normalizer,
      store,
      stats,
      config,
    })
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub fn normalizer(&self) -> &Arc<TextNormalizer> {
    &self.normalizer
  }

  fn extractor(&self) -> &KeywordExtractor {
    self.analyzer.extractor()
  }

  /// Validate raw rows and publish an index over them.
  ///
  /// The first invalid row aborts the build and leaves the current index untouched.
  pub fn build_index<I: IntoIterator<Item = RawRecord>>(&self, records: I) -> Result<Arc<IndexHandle>> {
    let corpus = Corpus::from_raw(records)?;
    Ok(self.publish_corpus(corpus))
  }

  pub fn publish_corpus(&self, corpus: Corpus) -> Arc<IndexHandle> {
    self.store.rebuild(corpus, &self.normalizer, &self.config.index)
  }

  pub fn current_index(&self) -> Arc<IndexHandle> {
    self.store.current()
  }

  pub fn extract_keywords(&self, text: &str, k: usize) -> Vec<String> {
    self.extractor().extract(text, k)
  }

  /// Resolve a query against the published index and count it
  pub fn match_query(&self, query: &str) -> Result<MatchOutcome> {
    let handle = self.store.current();
    let outcome = self.resolver.resolve(query, &handle, self.extractor())?;
    self.stats.record_query();
    Ok(outcome)
  }

  pub fn evaluate(&self, pairs: &[LabeledPair]) -> EvaluationResult {
    let result = self.evaluator.evaluate(pairs);
    if !result.is_degenerate() {
      self.stats.record_qa_accuracy(result.accuracy);
    }
    result
  }

  pub fn evaluate_typed(&self, pairs: &[LabeledPair]) -> EvaluationResult {
    let result = self.evaluator.evaluate_typed(pairs);
    if !result.is_degenerate() {
      self.stats.record_vqa_accuracy(result.accuracy);
    }
    result
  }

  pub fn analyze_document(&self, text: &str) -> DocumentAnalysis {
    let analysis = self.analyzer.analyze_document(text);
    self.stats.record_document();
    analysis
  }

  /// Dispatch a chat message on its command marker.
  ///
  /// Only the normal path counts a query; no chat operation counts a document.
  pub fn chat(&self, message: &str) -> Result<ChatReply> {
    let (op, body) = parse_command(message);
    debug!(op = ?op, "chat message");

    let reply = match op {
      ChatOp::Normal => ChatReply::Answer { outcome: self.match_query(&body)? },
      ChatOp::Pos => ChatReply::PosTags { tags: self.analyzer.pos_tags(&body) },
      ChatOp::Entity => ChatReply::Entities { entities: self.analyzer.entities(&body) },
      ChatOp::Summary => {
        let keywords = self.extract_keywords(&body, self.config.keywords.query_keywords);
        let summary = TextAnalyzer::summary(&keywords);
        ChatReply::Summary { keywords, summary }
      }
      ChatOp::Analysis => ChatReply::Analysis {
        analysis: self.analyzer.analyze(&body, self.config.keywords.query_keywords),
      },
    };
    Ok(reply)
  }

  /// Turn question/answer rows into corpus records, deriving keywords for
  /// rows that carry none
  pub fn ingest<I: IntoIterator<Item = RawRecord>>(
    &self,
    rows: I,
    department: Option<&str>,
  ) -> Result<Corpus> {
    let loaded_at = Utc::now();
    let keyword_count = self.config.keywords.record_keywords;
    let mut corpus = Corpus::new();

    for (position, raw) in rows.into_iter().enumerate() {
      let line = position + 1;
      let mut record = if raw.keywords.is_some() {
        Record::from_raw(raw, line, loaded_at)?
      } else {
        let question = raw.question.ok_or_else(|| EngineError::missing_field("question", line))?;
        let answer = raw.answer.ok_or_else(|| EngineError::missing_field("answer", line))?;
        let mut record = Record::derive(
          &question,
          &answer,
          raw.department.as_deref().unwrap_or_default(),
          raw.created_at.unwrap_or(loaded_at),
          self.extractor(),
          keyword_count,
        );
        record.title = clean_title(raw.title);
        record
      };
      if let Some(department) = department {
        record.department = department.to_string();
      }
      corpus.push(record);
    }

    info!(records = corpus.len(), "ingested question/answer pairs");
    Ok(corpus)
  }

  pub fn stats(&self) -> StatsSnapshot {
    self.stats.snapshot()
  }
}
