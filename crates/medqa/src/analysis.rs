use serde::Serialize;

use crate::keywords::KeywordExtractor;

/// Keywords kept for a document analysis
pub const DOCUMENT_KEYWORDS: usize = 10;

/// Medical entity categories recognised by trigger substrings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
  Disease,
  Symptom,
  Medicine,
  Organ,
  Treatment,
  Department,
  Test,
}

impl EntityKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Disease => "disease",
      Self::Symptom => "symptom",
      Self::Medicine => "medicine",
      Self::Organ => "organ",
      Self::Treatment => "treatment",
      Self::Department => "department",
      Self::Test => "test",
    }
  }
}

/// Checked in order; the first category with a matching trigger wins
const ENTITY_RULES: &[(EntityKind, &[&str])] = &[
  (EntityKind::Disease, &["病", "症", "炎", "癌", "瘤"]),
  (EntityKind::Symptom, &["痛", "胀", "肿", "痒", "咳", "喘", "麻", "晕"]),
  (EntityKind::Medicine, &["药", "素", "剂", "丸", "片"]),
  (EntityKind::Organ, &["胃", "肝", "肺", "肾", "心", "脑", "血"]),
  (EntityKind::Treatment, &["手术", "治疗", "化疗", "放疗", "用药"]),
  (EntityKind::Department, &["科", "医院", "诊所", "中心"]),
  (EntityKind::Test, &["检查", "化验", "CT", "MRI", "超声"]),
];

/// Classify a single word against the entity rules
pub fn classify(word: &str) -> Option<EntityKind> {
  ENTITY_RULES
    .iter()
    .find(|(_, triggers)| triggers.iter().any(|trigger| word.contains(trigger)))
    .map(|(kind, _)| *kind)
}

/// Operation requested by a chat command marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatOp {
  Normal,
  Pos,
  Entity,
  Summary,
  Analysis,
}

const COMMAND_MARKERS: &[(&str, ChatOp)] = &[
  ("词性标注", ChatOp::Pos),
  ("实体识别", ChatOp::Entity),
  ("文本摘要", ChatOp::Summary),
  ("文本分析", ChatOp::Analysis),
];

/// Split a chat message into its operation and the text it applies to.
///
/// A marker anywhere in the message selects its operation; markers are checked
/// in table order and every occurrence of the chosen one, with a trailing colon,
/// is removed from the body.
pub fn parse_command(message: &str) -> (ChatOp, String) {
  let trimmed = message.trim();
  COMMAND_MARKERS
    .iter()
    .find(|(marker, _)| trimmed.contains(marker))
    .map(|(marker, op)| (*op, strip_marker(trimmed, marker)))
    .unwrap_or_else(|| (ChatOp::Normal, trimmed.to_string()))
}

fn strip_marker(message: &str, marker: &str) -> String {
  let mut body = String::new();
  let mut rest = message;
  while let Some(at) = rest.find(marker) {
    body.push_str(&rest[..at]);
    rest = rest[at + marker.len()..].trim_start_matches(['：', ':']);
  }
  body.push_str(rest);
  body.trim().to_string()
}

/// A word and its part-of-speech tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PosTag {
  pub word: String,
  pub tag: String,
}

/// A word recognised as a medical entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
  pub word: String,
  pub kind: EntityKind,
}

/// Keyword, entity and part-of-speech breakdown of a text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentAnalysis {
  pub keywords: Vec<String>,
  pub entities: Vec<Entity>,
  pub pos_tags: Vec<PosTag>,
  pub summary: String,
  pub token_count: usize,
}

/// Part-of-speech, entity and summary views over text
#[derive(Debug, Clone)]
pub struct TextAnalyzer {
  extractor: KeywordExtractor,
}

impl TextAnalyzer {
  pub fn new(extractor: KeywordExtractor) -> Self {
    Self { extractor }
  }

  /// Every segmented word with its tag, punctuation included
  pub fn pos_tags(&self, text: &str) -> Vec<PosTag> {
    self
      .extractor
      .normalizer()
      .segment(text)
      .into_iter()
      .map(|(word, tag)| PosTag { word, tag })
      .collect()
  }

  /// Words matching one of the medical entity rules, in text order
  pub fn entities(&self, text: &str) -> Vec<Entity> {
    self
      .extractor
      .normalizer()
      .segment(text)
      .into_iter()
      .filter_map(|(word, _)| classify(&word).map(|kind| Entity { word, kind }))
      .collect()
  }

  /// Keywords joined into a one-line summary
  pub fn summary(keywords: &[String]) -> String {
    keywords.join("。")
  }

  pub fn analyze_document(&self, text: &str) -> DocumentAnalysis {
    self.analyze(text, DOCUMENT_KEYWORDS)
  }

  /// Full breakdown of `text` with its top `keyword_count` keywords
  pub fn analyze(&self, text: &str, keyword_count: usize) -> DocumentAnalysis {
    let keywords = self.extractor.extract(text, keyword_count);
    let summary = Self::summary(&keywords);
    DocumentAnalysis {
      entities: self.entities(text),
      pos_tags: self.pos_tags(text),
      token_count: self.extractor.normalizer().normalize(text).len(),
      keywords,
      summary,
    }
  }

  pub fn extractor(&self) -> &KeywordExtractor {
    &self.extractor
  }
}
