use serde::Serialize;
use tracing::debug;

use crate::config::{KeywordConfig, MatchConfig};
use crate::error::Result;
use crate::keywords::KeywordExtractor;
use crate::record::Record;
use crate::store::IndexHandle;

/// Which stage produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPath {
  Keyword,
  Similarity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchOutcome {
  Found { answer: String, record_id: usize, score: f64, via: MatchPath },
  NotFound,
}

impl MatchOutcome {
  pub fn is_found(&self) -> bool {
    matches!(self, MatchOutcome::Found { .. })
  }

  pub fn answer(&self) -> Option<&str> {
    match self {
      MatchOutcome::Found { answer, .. } => Some(answer),
      MatchOutcome::NotFound => None,
    }
  }

  fn found(record: &Record, score: f64, via: MatchPath) -> Self {
    MatchOutcome::Found { answer: record.answer.clone(), record_id: record.id, score, via }
  }
}

/// Two-stage query resolution: keyword hit first, cosine similarity second
#[derive(Debug, Clone)]
pub struct MatchResolver {
  acceptance_threshold: f64,
  query_keywords: usize,
}

impl MatchResolver {
  pub fn new(matching: &MatchConfig, keywords: &KeywordConfig) -> Self {
    Self {
      acceptance_threshold: matching.acceptance_threshold,
      query_keywords: keywords.query_keywords,
    }
  }

  pub fn with_threshold(mut self, acceptance_threshold: f64) -> Self {
    self.acceptance_threshold = acceptance_threshold;
    self
  }

  pub fn resolve(
    &self,
    query: &str,
    handle: &IndexHandle,
    extractor: &KeywordExtractor,
  ) -> Result<MatchOutcome> {
    if query.trim().is_empty() || handle.corpus().is_empty() {
      return Ok(MatchOutcome::NotFound);
    }

    let keywords = extractor.extract(query, self.query_keywords);
    if let Some(keyword) = keywords.first() {
      if let Some(record) = latest_keyword_hit(handle, keyword) {
        debug!(keyword = %keyword, record = record.id, "keyword match");
        return Ok(MatchOutcome::found(record, 1.0, MatchPath::Keyword));
      }
    }

    self.resolve_by_similarity(query, handle, extractor)
  }

  fn resolve_by_similarity(
    &self,
    query: &str,
    handle: &IndexHandle,
    extractor: &KeywordExtractor,
  ) -> Result<MatchOutcome> {
    let questions = handle.questions();
    let projected = questions.project(query, extractor.normalizer());
    let scores = questions.similarities(&projected)?;

    let best = scores
      .iter()
      .enumerate()
      .fold(None, |best: Option<(usize, f64)>, (id, &score)| match best {
        Some((_, best_score)) if best_score >= score => best,
        _ => Some((id, score)),
      });

    match best.and_then(|(id, score)| handle.corpus().get(id).map(|record| (record, score))) {
      Some((record, score)) if score > self.acceptance_threshold => {
        debug!(record = record.id, score, "similarity match");
        Ok(MatchOutcome::found(record, score, MatchPath::Similarity))
      }
      Some((record, score)) => {
        debug!(record = record.id, score, threshold = self.acceptance_threshold, "best match below threshold");
        Ok(MatchOutcome::NotFound)
      }
      None => Ok(MatchOutcome::NotFound),
    }
  }
}

/// Most recently created record carrying `keyword`; later insertion wins ties
fn latest_keyword_hit<'a>(handle: &'a IndexHandle, keyword: &str) -> Option<&'a Record> {
  handle
    .corpus()
    .records()
    .iter()
    .filter(|record| record.has_keyword(keyword))
    .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
}
