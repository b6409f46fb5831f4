use jieba_rs::Jieba;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::TextConfig;

/// Built-in stopwords used when no stopword file is configured
const STOP_WORDS: &[&str] = &[
  // Pronouns
  "我", "你", "您", "他", "她", "它", "我们", "你们", "他们", "她们", "自己", "这", "那", "这个",
  "那个", "这些", "那些", "这样", "那样", // Particles and auxiliaries
  "的", "地", "得", "了", "着", "过", "吗", "呢", "吧", "啊", "呀", "哦", "嘛", "么",
  // Conjunctions and prepositions
  "和", "与", "及", "或", "或者", "而", "并", "但", "但是", "因为", "所以", "如果", "在", "从",
  "对", "把", "被", "给", "向", "于", "以", // Adverbs and common verbs
  "是", "有", "也", "都", "就", "还", "又", "很", "太", "再", "要", "会", "能", "可以", "应该",
  "一下", "一个", "一些", // Question words
  "怎么", "怎么办", "怎样", "如何", "什么", "为什么", "哪些", "哪里", "多少", "请问",
  // English
  "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
  "is", "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will",
  "would", "could", "should", "i", "you", "we", "they", "it", "its", "my", "what", "how",
];

/// A set of terms excluded from indexing and keyword extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopWords {
  terms: HashSet<String>,
}

impl StopWords {
  /// The built-in Chinese and English list
  pub fn builtin() -> Self {
    STOP_WORDS.iter().map(|term| term.to_string()).collect()
  }

  /// Load one term per line. A missing or unreadable file yields an empty set.
  pub fn from_file(path: &Path) -> Self {
    match std::fs::read_to_string(path) {
      Ok(content) => {
        let stop_words = Self::parse(&content);
        debug!(path = %path.display(), count = stop_words.len(), "loaded stopwords");
        stop_words
      }
      Err(err) => {
        warn!(path = %path.display(), error = %err, "stopword file unavailable, using empty set");
        Self::default()
      }
    }
  }

  /// Parse a stopword list, skipping blank lines and `#` comments
  pub fn parse(content: &str) -> Self {
    content
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty() && !line.starts_with('#'))
      .map(str::to_string)
      .collect()
  }

  pub fn contains(&self, term: &str) -> bool {
    self.terms.contains(term)
  }

  pub fn len(&self) -> usize {
    self.terms.len()
  }

  pub fn is_empty(&self) -> bool {
    self.terms.is_empty()
  }
}

impl<S: Into<String>> FromIterator<S> for StopWords {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    Self { terms: iter.into_iter().map(|term| term.into().to_lowercase()).collect() }
  }
}

/// A normalized token with its part-of-speech tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub text: String,
  pub pos: String,
}

/// Segments text into words, case-folds them and drops stopwords.
///
/// Holds the segmentation dictionary, so build one and share it behind an `Arc`.
pub struct TextNormalizer {
  jieba: Jieba,
  stop_words: StopWords,
  hmm: bool,
}

impl TextNormalizer {
  pub fn new(stop_words: StopWords) -> Self {
    Self { jieba: Jieba::new(), stop_words, hmm: true }
  }

  pub fn from_config(config: &TextConfig) -> Self {
    let stop_words = match &config.stopwords_path {
      Some(path) => StopWords::from_file(path),
      None => StopWords::builtin(),
    };
    Self { jieba: Jieba::new(), stop_words, hmm: config.hmm }
  }

  pub fn stop_words(&self) -> &StopWords {
    &self.stop_words
  }

  /// Ordered, case-folded, stopword-free tokens of `text`
  pub fn normalize(&self, text: &str) -> Vec<String> {
    if text.trim().is_empty() {
      return Vec::new();
    }

    self
      .jieba
      .cut(text, self.hmm)
      .into_iter()
      .filter_map(|word| self.keep(word))
      .collect()
  }

  /// Same as [`normalize`](Self::normalize) but keeps the part-of-speech tag
  pub fn tag(&self, text: &str) -> Vec<Token> {
    if text.trim().is_empty() {
      return Vec::new();
    }

    self
      .jieba
      .tag(text, self.hmm)
      .into_iter()
      .filter_map(|tag| self.keep(tag.word).map(|text| Token { text, pos: tag.tag.to_string() }))
      .collect()
  }

  /// Raw segmentation with tags, punctuation and stopwords included
  pub fn segment(&self, text: &str) -> Vec<(String, String)> {
    self
      .jieba
      .tag(text, self.hmm)
      .into_iter()
      .filter(|tag| !tag.word.trim().is_empty())
      .map(|tag| (tag.word.to_string(), tag.tag.to_string()))
      .collect()
  }

  fn keep(&self, word: &str) -> Option<String> {
    let folded = word.trim().to_lowercase();
    if folded.is_empty() || !folded.chars().any(char::is_alphanumeric) {
      return None;
    }
    if self.stop_words.contains(&folded) {
      return None;
    }
    Some(folded)
  }
}

impl Default for TextNormalizer {
  fn default() -> Self {
    Self::new(StopWords::builtin())
  }
}

impl fmt::Debug for TextNormalizer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TextNormalizer")
      .field("stop_words", &self.stop_words.len())
      .field("hmm", &self.hmm)
      .finish()
  }
}

/// Trim, drop zero-width spaces and collapse whitespace runs
pub fn clean_text(text: &str) -> String {
  text.replace('\u{200b}', "").split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  #[test]
  fn test_normalize_removes_stopwords() {
    let normalizer = TextNormalizer::default();
    let tokens = normalizer.normalize("我头痛");

    assert!(tokens.contains(&"头痛".to_string()));
    assert!(!tokens.contains(&"我".to_string()));
  }

  #[test]
  fn test_normalize_never_yields_stopwords() {
    let normalizer = TextNormalizer::default();
    let samples = [
      "我最近总是头痛，怎么办？",
      "The patient has a fever and a cough",
      "孩子发烧了吗",
      "请问 高血压 应该 吃 什么 药",
    ];

    for sample in samples {
      for token in normalizer.normalize(sample) {
        assert!(!normalizer.stop_words().contains(&token), "stopword {token} leaked from {sample}");
      }
    }
  }

  #[test]
  fn test_normalize_case_folds_and_drops_punctuation() {
    let normalizer = TextNormalizer::default();
    let tokens = normalizer.normalize("MRI, CT!");

    assert!(tokens.contains(&"mri".to_string()));
    assert!(tokens.contains(&"ct".to_string()));
    assert!(tokens.iter().all(|t| t.chars().any(char::is_alphanumeric)));
  }

  #[test]
  fn test_normalize_empty_and_whitespace() {
    let normalizer = TextNormalizer::default();
    assert!(normalizer.normalize("").is_empty());
    assert!(normalizer.normalize("   \n\t ").is_empty());
    assert!(normalizer.tag("  ").is_empty());
  }

  #[test]
  fn test_normalize_only_stopwords() {
    let normalizer = TextNormalizer::default();
    assert!(normalizer.normalize("the and or but").is_empty());
  }

  #[test]
  fn test_normalize_is_deterministic() {
    let normalizer = TextNormalizer::default();
    let text = "糖尿病患者血糖控制不好应该怎么调整饮食";
    assert_eq!(normalizer.normalize(text), normalizer.normalize(text));
  }

  #[test]
  fn test_tag_matches_normalize() {
    let normalizer = TextNormalizer::default();
    let text = "胃痛伴有恶心呕吐";
    let tagged: Vec<String> = normalizer.tag(text).into_iter().map(|t| t.text).collect();
    assert_eq!(tagged, normalizer.normalize(text));
  }

  #[test]
  fn test_custom_stopwords_are_case_folded() {
    let normalizer = TextNormalizer::new(["Fever"].into_iter().collect());
    let tokens = normalizer.normalize("fever cough");
    assert_eq!(tokens, vec!["cough".to_string()]);
  }

  #[test]
  fn test_stopwords_missing_file_is_empty() {
    let stop_words = StopWords::from_file(Path::new("/definitely/not/here/stopwords.txt"));
    assert!(stop_words.is_empty());
  }

  #[test]
  fn test_stopwords_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("stopwords.txt");
    fs::write(&path, "# comment\n的\n\n  了  \nTHE\n").unwrap();

    let stop_words = StopWords::from_file(&path);
    assert_eq!(stop_words.len(), 3);
    assert!(stop_words.contains("的"));
    assert!(stop_words.contains("了"));
    assert!(stop_words.contains("the"));
  }

  #[test]
  fn test_from_config_with_missing_file_falls_back_to_empty() {
    let config = TextConfig {
      stopwords_path: Some("/missing/stopwords.txt".into()),
      ..TextConfig::default()
    };
    let normalizer = TextNormalizer::from_config(&config);
    assert!(normalizer.stop_words().is_empty());
    assert!(normalizer.normalize("我头痛").contains(&"我".to_string()));
  }

  #[test]
  fn test_clean_text() {
    assert_eq!(clean_text("  头痛\u{200b}  怎么办 \n 呢 "), "头痛 怎么办 呢");
    assert_eq!(clean_text(""), "");
  }
}
