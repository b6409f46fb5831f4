use std::collections::HashMap;
use std::sync::Arc;

use crate::config::KeywordConfig;
use crate::normalize::{TextNormalizer, Token};

/// Ranks normalized tokens by a corpus-independent significance score
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
  normalizer: Arc<TextNormalizer>,
  content_words_only: bool,
  content_pos_prefixes: Vec<String>,
}

#[derive(Debug)]
struct Candidate<'a> {
  term: &'a str,
  first_seen: usize,
  count: usize,
}

impl Candidate<'_> {
  /// Repeated terms and longer, more specific words score higher
  fn score(&self) -> f64 {
    let chars = self.term.chars().count().max(1) as f64;
    self.count as f64 * (1.0 + chars.ln())
  }
}

impl KeywordExtractor {
  pub fn new(normalizer: Arc<TextNormalizer>, config: &KeywordConfig) -> Self {
    Self {
      normalizer,
      content_words_only: config.content_words_only,
      content_pos_prefixes: config.content_pos_prefixes.clone(),
    }
  }

  pub fn normalizer(&self) -> &Arc<TextNormalizer> {
    &self.normalizer
  }

  /// Up to `k` distinct terms of `text`, most significant first.
  /// Ties go to the term that appears first.
  pub fn extract(&self, text: &str, k: usize) -> Vec<String> {
    if k == 0 {
      return Vec::new();
    }

    let tokens = self.normalizer.tag(text);
    if tokens.is_empty() {
      return Vec::new();
    }

    let mut candidates = self.rank(tokens.iter().filter(|token| self.is_content_word(token)));
    if candidates.is_empty() {
      candidates = self.rank(tokens.iter());
    }

    candidates.into_iter().take(k).map(|candidate| candidate.term.to_string()).collect()
  }

  fn rank<'a>(&self, tokens: impl Iterator<Item = &'a Token>) -> Vec<Candidate<'a>> {
    let mut by_term: HashMap<&str, Candidate<'a>> = HashMap::new();
    for (position, token) in tokens.enumerate() {
      by_term
        .entry(token.text.as_str())
        .or_insert(Candidate { term: &token.text, first_seen: position, count: 0 })
        .count += 1;
    }

    let mut candidates: Vec<Candidate<'a>> = by_term.into_values().collect();
    candidates.sort_by(|a, b| {
      b.score()
        .partial_cmp(&a.score())
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| a.first_seen.cmp(&b.first_seen))
    });
    candidates
  }

  fn is_content_word(&self, token: &Token) -> bool {
    !self.content_words_only
      || self.content_pos_prefixes.iter().any(|prefix| token.pos.starts_with(prefix.as_str()))
  }
}
