//! TF-IDF vector space over a corpus of strings.
//!
//! Columns are assigned in lexicographic term order so that two builds over the
//! same documents are identical. Document vectors are stored sparse and
//! L2-normalized, which makes cosine similarity a plain dot product.

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use crate::config::IndexConfig;
use crate::error::{EngineError, Result};
use crate::normalize::TextNormalizer;

/// Document frequency and column of one vocabulary term
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermStats {
  pub document_frequency: usize,
  pub column: usize,
  pub idf: f64,
}

/// Frozen term → column mapping of a built index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
  terms: HashMap<String, TermStats>,
}

impl Vocabulary {
  pub fn len(&self) -> usize {
    self.terms.len()
  }

  pub fn is_empty(&self) -> bool {
    self.terms.is_empty()
  }

  pub fn get(&self, term: &str) -> Option<&TermStats> {
    self.terms.get(term)
  }

  pub fn contains(&self, term: &str) -> bool {
    self.terms.contains_key(term)
  }
}

/// Sparse, L2-normalized vector over a vocabulary's columns
#[derive(Debug, Clone, PartialEq)]
pub struct Vector {
  dimension: usize,
  // (column, weight), sorted by column
  entries: Vec<(usize, f64)>,
}

impl Vector {
  pub fn zero(dimension: usize) -> Self {
    Self { dimension, entries: Vec::new() }
  }

  fn normalized(dimension: usize, mut entries: Vec<(usize, f64)>) -> Self {
    entries.sort_by_key(|(column, _)| *column);
    let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm == 0.0 {
      return Self::zero(dimension);
    }
    for (_, weight) in entries.iter_mut() {
      *weight /= norm;
    }
    Self { dimension, entries }
  }

  pub fn dimension(&self) -> usize {
    self.dimension
  }

  pub fn is_zero(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn magnitude(&self) -> f64 {
    self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
  }

  /// Dense copy of the vector, mostly useful for inspection
  pub fn to_dense(&self) -> Vec<f64> {
    let mut dense = vec![0.0; self.dimension];
    for &(column, weight) in &self.entries {
      dense[column] = weight;
    }
    dense
  }

  /// Cosine similarity with `other`; 0.0 when either side is a zero vector
  pub fn cosine(&self, other: &Vector) -> Result<f64> {
    if self.dimension != other.dimension {
      return Err(EngineError::vectorization(self.dimension, other.dimension));
    }
    if self.is_zero() || other.is_zero() {
      return Ok(0.0);
    }

    let (mut i, mut j, mut dot) = (0, 0, 0.0);
    while i < self.entries.len() && j < other.entries.len() {
      let (a_col, a_weight) = self.entries[i];
      let (b_col, b_weight) = other.entries[j];
      match a_col.cmp(&b_col) {
        std::cmp::Ordering::Less => i += 1,
        std::cmp::Ordering::Greater => j += 1,
        std::cmp::Ordering::Equal => {
          dot += a_weight * b_weight;
          i += 1;
          j += 1;
        }
      }
    }

    let denominator = self.magnitude() * other.magnitude();
    Ok((dot / denominator).clamp(-1.0, 1.0))
  }
}

/// Immutable TF-IDF space built from a list of documents
#[derive(Debug, Clone)]
pub struct VectorIndex {
  vocabulary: Vocabulary,
  vectors: Vec<Vector>,
  sublinear_tf: bool,
}

impl VectorIndex {
  /// Build the vocabulary and one normalized vector per document.
  ///
  /// An empty corpus, or one where nothing survives normalization and pruning,
  /// yields a zero-dimension index whose similarities are all 0.0.
  pub fn build<S: AsRef<str>>(
    documents: &[S],
    normalizer: &TextNormalizer,
    config: &IndexConfig,
  ) -> Self {
    let tokenized: Vec<Vec<String>> =
      documents.iter().map(|doc| normalizer.normalize(doc.as_ref())).collect();
    let vocabulary = build_vocabulary(&tokenized, config);

    if vocabulary.is_empty() {
      if documents.is_empty() {
        debug!("building index over empty corpus");
      } else {
        warn!(documents = documents.len(), "no indexable terms in corpus, index has dimension 0");
      }
    }

    let vectors = tokenized
      .iter()
      .map(|tokens| weigh(tokens, &vocabulary, config.sublinear_tf))
      .collect();

    debug!(documents = documents.len(), dimension = vocabulary.len(), "built vector index");
    Self { vocabulary, vectors, sublinear_tf: config.sublinear_tf }
  }

  pub fn dimension(&self) -> usize {
    self.vocabulary.len()
  }

  pub fn len(&self) -> usize {
    self.vectors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.vectors.is_empty()
  }

  pub fn vocabulary(&self) -> &Vocabulary {
    &self.vocabulary
  }

  pub fn vector(&self, document: usize) -> Option<&Vector> {
    self.vectors.get(document)
  }

  /// Map `text` into this space; unknown terms are dropped
  pub fn project(&self, text: &str, normalizer: &TextNormalizer) -> Vector {
    weigh(&normalizer.normalize(text), &self.vocabulary, self.sublinear_tf)
  }

  /// Cosine similarity of `vector` against every indexed document
  pub fn similarities(&self, vector: &Vector) -> Result<Vec<f64>> {
    if vector.dimension() != self.dimension() {
      return Err(EngineError::vectorization(self.dimension(), vector.dimension()));
    }
    self.vectors.iter().map(|doc| doc.cosine(vector)).collect()
  }

  /// Full N×N cosine matrix between the indexed documents
  pub fn pairwise(&self) -> Vec<Vec<f64>> {
    let n = self.vectors.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
      for j in i..n {
        // vectors share this index's dimension, so cosine cannot fail here
        let similarity = self.vectors[i].cosine(&self.vectors[j]).unwrap_or(0.0);
        matrix[i][j] = similarity;
        matrix[j][i] = similarity;
      }
    }
    matrix
  }
}

fn build_vocabulary(tokenized: &[Vec<String>], config: &IndexConfig) -> Vocabulary {
  let documents = tokenized.len();
  // term -> (document frequency, total count)
  let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
  for tokens in tokenized {
    let mut seen: HashSet<&str> = HashSet::new();
    for token in tokens {
      let entry = counts.entry(token.as_str()).or_insert((0, 0));
      entry.1 += 1;
      if seen.insert(token.as_str()) {
        entry.0 += 1;
      }
    }
  }

  let max_df = (config.max_df_ratio * documents as f64).floor() as usize;
  let mut surviving: Vec<(&str, usize, usize)> = counts
    .into_iter()
    .filter(|(_, (df, _))| *df >= config.min_df && *df <= max_df.max(1))
    .map(|(term, (df, total))| (term, df, total))
    .collect();

  if let Some(limit) = config.max_features {
    if surviving.len() > limit {
      surviving.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(b.0)));
      surviving.truncate(limit);
      surviving.sort_by(|a, b| a.0.cmp(b.0));
    }
  }

  let terms = surviving
    .into_iter()
    .enumerate()
    .map(|(column, (term, df, _))| {
      let idf = ((documents as f64 + 1.0) / (df as f64 + 1.0)).ln() + 1.0;
      (term.to_string(), TermStats { document_frequency: df, column, idf })
    })
    .collect();

  Vocabulary { terms }
}

fn weigh(tokens: &[String], vocabulary: &Vocabulary, sublinear_tf: bool) -> Vector {
  let mut counts: HashMap<usize, (usize, f64)> = HashMap::new();
  for token in tokens {
    if let Some(stats) = vocabulary.get(token) {
      counts.entry(stats.column).or_insert((0, stats.idf)).0 += 1;
    }
  }

  let entries = counts
    .into_iter()
    .map(|(column, (count, idf))| {
      let tf = if sublinear_tf { 1.0 + (count as f64).ln() } else { count as f64 };
      (column, tf * idf)
    })
    .collect();

  Vector::normalized(vocabulary.len(), entries)
}
