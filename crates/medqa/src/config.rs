//! Configuration management for the retrieval engine
//!
//! Every tunable carries a serde default so partial files are valid. Files
//! ending in `.yaml`/`.yml` are read as YAML, anything else as JSON.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{EngineError, Result};

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV: &str = "MEDQA_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
  #[serde(default)]
  pub text: TextConfig,
  #[serde(default)]
  pub keywords: KeywordConfig,
  #[serde(default)]
  pub index: IndexConfig,
  #[serde(default)]
  pub matching: MatchConfig,
}

/// Segmentation and stopword settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextConfig {
  /// Stopword file, one term per line. `None` uses the built-in list.
  #[serde(default)]
  pub stopwords_path: Option<PathBuf>,
  /// Use the HMM model to segment out-of-dictionary words
  #[serde(default = "default_hmm")]
  pub hmm: bool,
}

/// Keyword extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordConfig {
  /// Keywords taken from a live query
  #[serde(default = "default_query_keywords")]
  pub query_keywords: usize,
  /// Keywords derived for each record at ingest time
  #[serde(default = "default_record_keywords")]
  pub record_keywords: usize,
  /// Restrict candidates to content-word part-of-speech categories
  #[serde(default = "default_content_words_only")]
  pub content_words_only: bool,
  /// Accepted part-of-speech tag prefixes when `content_words_only` is set
  #[serde(default = "default_content_pos_prefixes")]
  pub content_pos_prefixes: Vec<String>,
}

/// TF-IDF vocabulary and weighting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
  /// Use `1 + ln(count)` instead of the raw count as term frequency
  #[serde(default)]
  pub sublinear_tf: bool,
  /// Drop terms found in fewer documents than this
  #[serde(default = "default_min_df")]
  pub min_df: usize,
  /// Drop terms found in more than this fraction of documents
  #[serde(default = "default_max_df_ratio")]
  pub max_df_ratio: f64,
  /// Keep at most this many columns, by total corpus count
  #[serde(default)]
  pub max_features: Option<usize>,
}

/// Query resolution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
  /// Similarity-path matches must score strictly above this
  #[serde(default = "default_acceptance_threshold")]
  pub acceptance_threshold: f64,
}

fn default_hmm() -> bool {
  true
}
fn default_query_keywords() -> usize {
  2
}
fn default_record_keywords() -> usize {
  10
}
fn default_content_words_only() -> bool {
  true
}
fn default_content_pos_prefixes() -> Vec<String> {
  ["n", "v", "a", "i", "l", "eng", "x"].iter().map(|p| p.to_string()).collect()
}
fn default_min_df() -> usize {
  1
}
fn default_max_df_ratio() -> f64 {
  1.0
}
fn default_acceptance_threshold() -> f64 {
  0.3
}

impl Default for TextConfig {
  fn default() -> Self {
    Self { stopwords_path: None, hmm: default_hmm() }
  }
}

impl Default for KeywordConfig {
  fn default() -> Self {
    Self {
      query_keywords: default_query_keywords(),
      record_keywords: default_record_keywords(),
      content_words_only: default_content_words_only(),
      content_pos_prefixes: default_content_pos_prefixes(),
    }
  }
}

impl Default for IndexConfig {
  fn default() -> Self {
    Self {
      sublinear_tf: false,
      min_df: default_min_df(),
      max_df_ratio: default_max_df_ratio(),
      max_features: None,
    }
  }
}

impl Default for MatchConfig {
  fn default() -> Self {
    Self { acceptance_threshold: default_acceptance_threshold() }
  }
}

impl EngineConfig {
  /// Load configuration from a file, picking the format from its extension
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let config: EngineConfig = if is_yaml(path) {
      serde_yaml::from_str(&content)?
    } else {
      serde_json::from_str(&content)?
    };
    config.validate()?;
    debug!(path = %path.display(), "loaded engine config");
    Ok(config)
  }

  /// Load configuration from the environment, the working directory, the
  /// user config directory, or defaults, in that order
  pub fn load() -> Result<Self> {
    if let Ok(explicit) = std::env::var(CONFIG_ENV) {
      return Self::load_from_file(explicit);
    }

    let config_paths = ["medqa.json", ".medqa.json", "medqa.yaml"];
    for path in &config_paths {
      if Path::new(path).exists() {
        return Self::load_from_file(path);
      }
    }

    if let Some(user_config) = dirs::config_dir().map(|dir| dir.join("medqa").join("config.json")) {
      if user_config.exists() {
        return Self::load_from_file(user_config);
      }
    }

    Ok(EngineConfig::default())
  }

  /// Save configuration as pretty JSON
  pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
    let content = serde_json::to_string_pretty(self)?;
    std::fs::write(path, content)?;
    Ok(())
  }

  /// Reject values the engine cannot honor
  pub fn validate(&self) -> Result<()> {
    let threshold = self.matching.acceptance_threshold;
    if !(0.0..=1.0).contains(&threshold) {
      return Err(EngineError::config(format!(
        "matching.acceptance_threshold must be within [0, 1], got {threshold}"
      )));
    }
    if self.keywords.query_keywords == 0 {
      return Err(EngineError::config("keywords.query_keywords must be at least 1"));
    }
    if self.index.min_df == 0 {
      return Err(EngineError::config("index.min_df must be at least 1"));
    }
    let ratio = self.index.max_df_ratio;
    if !(ratio > 0.0 && ratio <= 1.0) {
      return Err(EngineError::config(format!(
        "index.max_df_ratio must be within (0, 1], got {ratio}"
      )));
    }
    if self.index.max_features == Some(0) {
      return Err(EngineError::config("index.max_features must be positive when set"));
    }
    Ok(())
  }
}

fn is_yaml(path: &Path) -> bool {
  matches!(path.extension().and_then(|ext| ext.to_str()), Some("yaml") | Some("yml"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  #[test]
  fn test_config_default() {
    let config = EngineConfig::default();
    assert_eq!(config.matching.acceptance_threshold, 0.3);
    assert_eq!(config.keywords.query_keywords, 2);
    assert_eq!(config.keywords.record_keywords, 10);
    assert!(config.keywords.content_words_only);
    assert!(config.text.stopwords_path.is_none());
    assert!(!config.index.sublinear_tf);
    assert_eq!(config.index.min_df, 1);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_config_load_nonexistent_file() {
    let result = EngineConfig::load_from_file(Path::new("nonexistent.json"));
    assert!(result.is_err());
  }

  #[test]
  fn test_config_load_partial_json() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("medqa.json");
    fs::write(&config_path, r#"{ "matching": { "acceptance_threshold": 0.45 } }"#).unwrap();

    let config = EngineConfig::load_from_file(&config_path).unwrap();
    assert_eq!(config.matching.acceptance_threshold, 0.45);
    assert_eq!(config.keywords, KeywordConfig::default());
    assert_eq!(config.index, IndexConfig::default());
  }

  #[test]
  fn test_config_load_yaml() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("medqa.yaml");
    fs::write(
      &config_path,
      "index:\n  sublinear_tf: true\n  max_features: 500\nkeywords:\n  query_keywords: 1\n",
    )
    .unwrap();

    let config = EngineConfig::load_from_file(&config_path).unwrap();
    assert!(config.index.sublinear_tf);
    assert_eq!(config.index.max_features, Some(500));
    assert_eq!(config.keywords.query_keywords, 1);
    assert_eq!(config.matching, MatchConfig::default());
  }

  #[test]
  fn test_config_rejects_out_of_range_threshold() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("bad.json");
    fs::write(&config_path, r#"{ "matching": { "acceptance_threshold": 1.5 } }"#).unwrap();

    let err = EngineConfig::load_from_file(&config_path).unwrap_err();
    assert!(err.to_string().contains("acceptance_threshold"));
  }

  #[test]
  fn test_config_rejects_zero_min_df() {
    let mut config = EngineConfig::default();
    config.index.min_df = 0;
    assert!(config.validate().is_err());

    let mut config = EngineConfig::default();
    config.index.max_df_ratio = 0.0;
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_config_rejects_zero_query_keywords() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("zero.json");
    fs::write(&config_path, r#"{ "keywords": { "query_keywords": 0 } }"#).unwrap();

    let err = EngineConfig::load_from_file(&config_path).unwrap_err();
    assert!(err.to_string().contains("query_keywords"));
  }

  #[test]
  fn test_config_save_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("saved.json");

    let mut config = EngineConfig::default();
    config.index.max_df_ratio = 0.9;
    config.save_to_file(&config_path).unwrap();

    let reloaded = EngineConfig::load_from_file(&config_path).unwrap();
    assert_eq!(reloaded, config);
  }
}
