use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::config::IndexConfig;
use crate::normalize::TextNormalizer;
use crate::record::Corpus;
use crate::vector::VectorIndex;

/// A corpus snapshot bound to the TF-IDF space of its questions.
///
/// Handles are never mutated; a rebuild produces a new one.
#[derive(Debug, Clone)]
pub struct IndexHandle {
  generation: u64,
  corpus: Arc<Corpus>,
  questions: VectorIndex,
}

impl IndexHandle {
  /// The uninitialized handle: no records, dimension 0
  pub fn empty(normalizer: &TextNormalizer, config: &IndexConfig) -> Self {
    Self::build(0, Arc::new(Corpus::new()), normalizer, config)
  }

  pub fn build(
    generation: u64,
    corpus: Arc<Corpus>,
    normalizer: &TextNormalizer,
    config: &IndexConfig,
  ) -> Self {
    let questions = VectorIndex::build(&corpus.questions(), normalizer, config);
    Self { generation, corpus, questions }
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }

  pub fn corpus(&self) -> &Corpus {
    &self.corpus
  }

  pub fn questions(&self) -> &VectorIndex {
    &self.questions
  }

  pub fn is_built(&self) -> bool {
    self.generation > 0
  }
}

/// Publishes index handles copy-on-write.
///
/// Builds happen outside the lock; publishing swaps one `Arc`. Readers holding
/// an older handle keep a consistent view until they call [`current`](Self::current) again.
/// Generations only move forward: a handle older than the published one is never
/// swapped in.
#[derive(Debug)]
pub struct IndexStore {
  current: RwLock<Arc<IndexHandle>>,
  last_generation: AtomicU64,
}

impl IndexStore {
  pub fn new(initial: IndexHandle) -> Self {
    let generation = initial.generation();
    Self { current: RwLock::new(Arc::new(initial)), last_generation: AtomicU64::new(generation) }
  }

  pub fn current(&self) -> Arc<IndexHandle> {
    match self.current.read() {
      Ok(guard) => Arc::clone(&guard),
      Err(poisoned) => Arc::clone(&poisoned.into_inner()),
    }
  }

  /// Reserve the next generation number
  pub fn next_generation(&self) -> u64 {
    self.last_generation.fetch_add(1, Ordering::SeqCst) + 1
  }

  /// Build a handle for `corpus` and publish it
  pub fn rebuild(
    &self,
    corpus: Corpus,
    normalizer: &TextNormalizer,
    config: &IndexConfig,
  ) -> Arc<IndexHandle> {
    let generation = self.next_generation();
    let handle = IndexHandle::build(generation, Arc::new(corpus), normalizer, config);
    self.publish(handle)
  }

  /// Swap `handle` in unless a newer generation is already published.
  ///
  /// Returns whichever handle is current afterwards.
  pub fn publish(&self, handle: IndexHandle) -> Arc<IndexHandle> {
    self.last_generation.fetch_max(handle.generation(), Ordering::SeqCst);

    let mut guard = match self.current.write() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    if handle.generation() <= guard.generation() {
      debug!(
        generation = handle.generation(),
        published = guard.generation(),
        "skipped stale index handle"
      );
      return Arc::clone(&guard);
    }

    let handle = Arc::new(handle);
    *guard = Arc::clone(&handle);
    info!(
      generation = handle.generation(),
      records = handle.corpus().len(),
      dimension = handle.questions().dimension(),
      "published index"
    );
    handle
  }
}
