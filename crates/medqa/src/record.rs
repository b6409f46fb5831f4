use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::keywords::KeywordExtractor;
use crate::normalize::clean_text;

/// Keywords as stored upstream: either a list or a comma-joined string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeywordField {
  List(Vec<String>),
  Joined(String),
}

impl KeywordField {
  fn into_terms(self) -> Vec<String> {
    let terms = match self {
      KeywordField::List(terms) => terms,
      KeywordField::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };
    terms.into_iter().map(|term| term.trim().to_string()).filter(|term| !term.is_empty()).collect()
  }
}

/// A question/answer row as it arrives from a corpus source, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
  #[serde(default, alias = "ask")]
  pub question: Option<String>,
  #[serde(default)]
  pub answer: Option<String>,
  #[serde(default)]
  pub keywords: Option<KeywordField>,
  #[serde(default)]
  pub department: Option<String>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub title: Option<String>,
}

/// Validated, immutable corpus record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  pub id: usize,
  pub question: String,
  pub answer: String,
  /// Ordered by extraction rank
  pub keywords: Vec<String>,
  pub department: String,
  pub created_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
}

impl Record {
  /// Validate a raw row. `position` is used for error messages only.
  pub fn from_raw(raw: RawRecord, position: usize, loaded_at: DateTime<Utc>) -> Result<Self> {
    let question = raw.question.ok_or_else(|| EngineError::missing_field("question", position))?;
    let answer = raw.answer.ok_or_else(|| EngineError::missing_field("answer", position))?;
    let keywords = raw.keywords.ok_or_else(|| EngineError::missing_field("keywords", position))?;

    Ok(Self {
      id: 0,
      question: clean_text(&question),
      answer: clean_text(&answer),
      keywords: keywords.into_terms(),
      department: raw.department.unwrap_or_default(),
      created_at: raw.created_at.unwrap_or(loaded_at),
      title: clean_title(raw.title),
    })
  }

  /// Build a record from fresh question/answer text, deriving its keywords
  pub fn derive(
    question: &str,
    answer: &str,
    department: &str,
    created_at: DateTime<Utc>,
    extractor: &KeywordExtractor,
    keyword_count: usize,
  ) -> Self {
    let question = clean_text(question);
    let answer = clean_text(answer);
    let keywords = extractor.extract(&format!("{question} {answer}"), keyword_count);
    Self {
      id: 0,
      question,
      answer,
      keywords,
      department: department.to_string(),
      created_at,
      title: None,
    }
  }

  /// Whether any keyword of this record contains `keyword` as a substring
  pub fn has_keyword(&self, keyword: &str) -> bool {
    !keyword.is_empty() && self.keywords.iter().any(|kw| kw.contains(keyword))
  }
}

/// Cleaned title, or `None` when nothing is left after cleaning
pub fn clean_title(title: Option<String>) -> Option<String> {
  title.map(|title| clean_text(&title)).filter(|title| !title.is_empty())
}

/// Ordered collection of records; ids are insertion positions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
  records: Vec<Record>,
}

impl Corpus {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a record, assigning its id
  pub fn push(&mut self, mut record: Record) -> usize {
    let id = self.records.len();
    record.id = id;
    self.records.push(record);
    id
  }

  /// Validate every raw row; the first invalid row aborts the whole load
  pub fn from_raw<I: IntoIterator<Item = RawRecord>>(rows: I) -> Result<Self> {
    let loaded_at = Utc::now();
    let mut corpus = Corpus::new();
    for (position, raw) in rows.into_iter().enumerate() {
      corpus.push(Record::from_raw(raw, position + 1, loaded_at)?);
    }
    Ok(corpus)
  }

  /// Load a corpus from a JSON array or a JSON Lines file (`.jsonl`)
  pub fn load(path: &Path) -> Result<Self> {
    let rows: Vec<RawRecord> = read_rows(path)?;
    let corpus = Self::from_raw(rows)?;
    debug!(path = %path.display(), records = corpus.len(), "loaded corpus");
    Ok(corpus)
  }

  /// Write the corpus as JSON Lines
  pub fn save_jsonl(&self, path: &Path) -> Result<()> {
    let mut content = String::new();
    for record in &self.records {
      content.push_str(&serde_json::to_string(record)?);
      content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
  }

  pub fn records(&self) -> &[Record] {
    &self.records
  }

  pub fn get(&self, id: usize) -> Option<&Record> {
    self.records.get(id)
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn questions(&self) -> Vec<&str> {
    self.records.iter().map(|record| record.question.as_str()).collect()
  }
}

impl FromIterator<Record> for Corpus {
  fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
    let mut corpus = Corpus::new();
    for record in iter {
      corpus.push(record);
    }
    corpus
  }
}

/// Read rows from a JSON array, or one JSON object per line for `.jsonl`
pub fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
  let content = fs::read_to_string(path)?;
  let is_jsonl = path.extension().and_then(|ext| ext.to_str()) == Some("jsonl");

  if !is_jsonl {
    return serde_json::from_str(&content).map_err(|err| {
      EngineError::input(format!("{}: expected a JSON array of records: {err}", path.display()))
    });
  }

  content
    .lines()
    .enumerate()
    .filter(|(_, line)| !line.trim().is_empty())
    .map(|(index, line)| {
      serde_json::from_str(line).map_err(|err| {
        EngineError::input(format!("{} line {}: {err}", path.display(), index + 1))
      })
    })
    .collect()
}
