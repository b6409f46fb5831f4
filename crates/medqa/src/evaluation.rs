//! Offline accuracy evaluation over labeled question/answer pairs.
//!
//! Questions and answers each get their own TF-IDF space. For every pair the
//! best combined similarity against the whole set is taken (the pair itself
//! included), and a pair counts as matched when that best score is above 80%
//! of the mean best score. Self-similarity is always the row maximum for
//! non-empty text, so the figure measures how well each pair stands out from
//! its near-duplicates rather than retrieval accuracy proper.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::IndexConfig;
use crate::error::{EngineError, Result};
use crate::normalize::TextNormalizer;
use crate::record::read_rows;
use crate::stats::round2;
use crate::vector::VectorIndex;

/// Fraction of the mean row maximum used as the match threshold
pub const THRESHOLD_RATIO: f64 = 0.8;
/// Weight of the summed text similarities in the typed variant
pub const TYPED_TEXT_WEIGHT: f64 = 0.4;
/// Weight of the question/answer type agreement in the typed variant
pub const TYPED_MATCH_WEIGHT: f64 = 0.2;
/// Threshold percentage reported when evaluation could not run
pub const FALLBACK_THRESHOLD: f64 = 50.0;

/// One labeled evaluation pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPair {
  pub question: String,
  pub answer: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub question_type: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub answer_type: Option<String>,
}

impl LabeledPair {
  pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
    Self { question: question.into(), answer: answer.into(), question_type: None, answer_type: None }
  }

  pub fn with_types(mut self, question_type: impl Into<String>, answer_type: impl Into<String>) -> Self {
    self.question_type = Some(question_type.into());
    self.answer_type = Some(answer_type.into());
    self
  }

  fn types_match(&self, other: &LabeledPair) -> bool {
    match (&self.question_type, &self.answer_type, &other.question_type, &other.answer_type) {
      (Some(q1), Some(a1), Some(q2), Some(a2)) => q1 == q2 && a1 == a2,
      _ => false,
    }
  }
}

#[derive(Debug, Deserialize)]
struct RawPair {
  #[serde(default, alias = "ask")]
  question: Option<String>,
  #[serde(default)]
  answer: Option<String>,
  #[serde(default)]
  question_type: Option<String>,
  #[serde(default)]
  answer_type: Option<String>,
}

/// Load labeled pairs from JSON or JSON Lines.
///
/// With `require_types` every row must carry `question_type` and `answer_type`.
pub fn load_pairs(path: &Path, require_types: bool) -> Result<Vec<LabeledPair>> {
  let rows: Vec<RawPair> = read_rows(path)?;
  rows
    .into_iter()
    .enumerate()
    .map(|(index, row)| {
      let line = index + 1;
      let pair = LabeledPair {
        question: row.question.ok_or_else(|| EngineError::missing_field("question", line))?,
        answer: row.answer.ok_or_else(|| EngineError::missing_field("answer", line))?,
        question_type: row.question_type,
        answer_type: row.answer_type,
      };
      if require_types {
        if pair.question_type.is_none() {
          return Err(EngineError::missing_field("question_type", line));
        }
        if pair.answer_type.is_none() {
          return Err(EngineError::missing_field("answer_type", line));
        }
      }
      Ok(pair)
    })
    .collect()
}

/// How question and answer similarities are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationVariant {
  /// `question_sim + answer_sim`
  Text,
  /// `(question_sim + answer_sim) * 0.4 + type_match * 0.2`
  Typed,
}

/// Metrics of one evaluation run; all percentages are rounded to 2 decimals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
  pub accuracy: f64,
  pub total: usize,
  pub matched: usize,
  pub avg_similarity: f64,
  pub threshold: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub failure: Option<String>,
}

impl EvaluationResult {
  /// Conservative result for a set that could not be scored
  pub fn degenerate(total: usize, reason: impl Into<String>) -> Self {
    Self {
      accuracy: 0.0,
      total,
      matched: 0,
      avg_similarity: 0.0,
      threshold: FALLBACK_THRESHOLD,
      failure: Some(reason.into()),
    }
  }

  pub fn is_degenerate(&self) -> bool {
    self.failure.is_some()
  }

  fn from_row_maxima(row_max: &[f64]) -> Self {
    let total = row_max.len();
    let mean = row_max.iter().sum::<f64>() / total as f64;
    let threshold = mean * THRESHOLD_RATIO;
    let matched = row_max.iter().filter(|&&score| score > threshold).count();
    let accuracy = matched as f64 / total as f64 * 100.0;

    Self {
      accuracy: round2(accuracy),
      total,
      matched,
      avg_similarity: round2(mean * 100.0),
      threshold: round2(threshold * 100.0),
      failure: None,
    }
  }
}

/// Scores labeled sets against a threshold derived from the set itself
#[derive(Debug, Clone)]
pub struct Evaluator {
  normalizer: Arc<TextNormalizer>,
  index: IndexConfig,
}

impl Evaluator {
  pub fn new(normalizer: Arc<TextNormalizer>, index: IndexConfig) -> Self {
    Self { normalizer, index }
  }

  /// Text-only evaluation
  pub fn evaluate(&self, pairs: &[LabeledPair]) -> EvaluationResult {
    self.run(pairs, EvaluationVariant::Text)
  }

  /// Evaluation that also rewards matching question and answer types
  pub fn evaluate_typed(&self, pairs: &[LabeledPair]) -> EvaluationResult {
    self.run(pairs, EvaluationVariant::Typed)
  }

  pub fn run(&self, pairs: &[LabeledPair], variant: EvaluationVariant) -> EvaluationResult {
    match self.row_maxima(pairs, variant) {
      Ok(row_max) => {
        let result = EvaluationResult::from_row_maxima(&row_max);
        debug!(?variant, total = result.total, matched = result.matched, "evaluation finished");
        result
      }
      Err(reason) => {
        warn!(?variant, total = pairs.len(), reason = %reason, "evaluation could not run");
        EvaluationResult::degenerate(pairs.len(), reason)
      }
    }
  }

  /// Best combined similarity of each pair against the whole set, diagonal included
  pub fn row_maxima(
    &self,
    pairs: &[LabeledPair],
    variant: EvaluationVariant,
  ) -> std::result::Result<Vec<f64>, String> {
    if pairs.is_empty() {
      return Err("empty evaluation set".to_string());
    }

    let questions: Vec<&str> = pairs.iter().map(|pair| pair.question.as_str()).collect();
    let answers: Vec<&str> = pairs.iter().map(|pair| pair.answer.as_str()).collect();
    let question_space = VectorIndex::build(&questions, &self.normalizer, &self.index);
    let answer_space = VectorIndex::build(&answers, &self.normalizer, &self.index);

    if question_space.dimension() == 0 && answer_space.dimension() == 0 {
      return Err("no indexable terms in questions or answers".to_string());
    }

    let question_sim = question_space.pairwise();
    let answer_sim = answer_space.pairwise();

    let row_max = (0..pairs.len())
      .map(|i| {
        (0..pairs.len())
          .map(|j| {
            let text = question_sim[i][j] + answer_sim[i][j];
            match variant {
              EvaluationVariant::Text => text,
              EvaluationVariant::Typed => {
                let type_match = if pairs[i].types_match(&pairs[j]) { 1.0 } else { 0.0 };
                text * TYPED_TEXT_WEIGHT + type_match * TYPED_MATCH_WEIGHT
              }
            }
          })
          .fold(f64::NEG_INFINITY, f64::max)
      })
      .collect();

    Ok(row_max)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  fn evaluator() -> Evaluator {
    Evaluator::new(Arc::new(TextNormalizer::default()), IndexConfig::default())
  }

  #[test]
  fn test_empty_set_is_degenerate() {
    let result = evaluator().evaluate(&[]);
    assert_eq!(result.accuracy, 0.0);
    assert_eq!(result.total, 0);
    assert_eq!(result.matched, 0);
    assert_eq!(result.avg_similarity, 0.0);
    assert_eq!(result.threshold, 50.0);
    assert!(result.is_degenerate());
  }

  #[test]
  fn test_unvectorizable_set_is_degenerate() {
    let pairs = vec![LabeledPair::new("the", "and"), LabeledPair::new("我 的", "了")];
    let result = evaluator().evaluate(&pairs);
    assert_eq!(result.total, 2);
    assert_eq!(result.matched, 0);
    assert_eq!(result.threshold, 50.0);
    assert!(result.failure.unwrap().contains("no indexable terms"));
  }

  #[test]
  fn test_text_variant_sums_similarities() {
    let pairs = vec![
      LabeledPair::new("fever cough", "rest fluids"),
      LabeledPair::new("fever cough", "rest fluids"),
      LabeledPair::new("rash itch", ""),
    ];
    let evaluator = evaluator();

    let row_max = evaluator.row_maxima(&pairs, EvaluationVariant::Text).unwrap();
    assert!((row_max[0] - 2.0).abs() < 1e-9);
    assert!((row_max[1] - 2.0).abs() < 1e-9);
    assert!((row_max[2] - 1.0).abs() < 1e-9);

    let result = evaluator.evaluate(&pairs);
    assert_eq!(result.total, 3);
    assert_eq!(result.matched, 2);
    assert_eq!(result.accuracy, 66.67);
    assert_eq!(result.avg_similarity, 166.67);
    assert_eq!(result.threshold, 133.33);
    assert!(result.failure.is_none());
  }

  #[test]
  fn test_typed_variant_weights_type_agreement() {
    let pairs = vec![
      LabeledPair::new("fever cough", "rest").with_types("symptom", "closed"),
      LabeledPair::new("rash itch", "cream").with_types("symptom", "open"),
      LabeledPair::new("nausea vomiting", "fluids"),
    ];
    let evaluator = evaluator();

    let row_max = evaluator.row_maxima(&pairs, EvaluationVariant::Typed).unwrap();
    assert!((row_max[0] - 1.0).abs() < 1e-9);
    assert!((row_max[1] - 1.0).abs() < 1e-9);
    assert!((row_max[2] - 0.8).abs() < 1e-9);

    let result = evaluator.evaluate_typed(&pairs);
    assert_eq!(result.matched, 3);
    assert_eq!(result.accuracy, 100.0);
    assert_eq!(result.avg_similarity, 93.33);
    assert_eq!(result.threshold, 74.67);
  }

  #[test]
  fn test_threshold_is_eighty_percent_of_mean_row_max() {
    let pairs = vec![
      LabeledPair::new("高血压 饮食 注意", "低盐 低脂"),
      LabeledPair::new("高血压 用药", "遵医嘱 服药"),
      LabeledPair::new("糖尿病 饮食", "控制 糖分"),
      LabeledPair::new("感冒 发烧", "多喝水 休息"),
    ];
    let evaluator = evaluator();
    let row_max = evaluator.row_maxima(&pairs, EvaluationVariant::Text).unwrap();
    let mean = row_max.iter().sum::<f64>() / row_max.len() as f64;

    let result = evaluator.evaluate(&pairs);
    assert_eq!(result.threshold, round2(mean * THRESHOLD_RATIO * 100.0));
    assert_eq!(result.avg_similarity, round2(mean * 100.0));
    assert!((0.0..=100.0).contains(&result.accuracy));
    assert!(result.matched <= result.total);
  }

  #[test]
  fn test_load_pairs_accepts_ask_alias() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("pairs.jsonl");
    fs::write(&path, "{\"ask\": \"头痛\", \"answer\": \"休息\"}\n").unwrap();

    let pairs = load_pairs(&path, false).unwrap();
    assert_eq!(pairs, vec![LabeledPair::new("头痛", "休息")]);
  }

  #[test]
  fn test_load_pairs_requires_types_for_typed_sets() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("vqa.json");
    fs::write(
      &path,
      r#"[{"question": "is there a fracture", "answer": "no", "question_type": "ABN"}]"#,
    )
    .unwrap();

    let err = load_pairs(&path, true).unwrap_err();
    assert!(err.to_string().contains("answer_type"));
    assert!(load_pairs(&path, false).is_ok());
  }

  #[test]
  fn test_load_pairs_missing_answer() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("pairs.json");
    fs::write(&path, r#"[{"question": "q"}]"#).unwrap();

    let err = load_pairs(&path, false).unwrap_err();
    assert!(err.is_input());
    assert!(err.to_string().contains("answer"));
  }
}
