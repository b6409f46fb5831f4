use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Receives the engine's observable side effects
pub trait StatsSink: Send + Sync {
  fn record_query(&self);
  fn record_document(&self);
  fn record_qa_accuracy(&self, accuracy: f64);
  fn record_vqa_accuracy(&self, accuracy: f64);
  fn snapshot(&self) -> StatsSnapshot;
}

/// Point-in-time copy of the system statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
  pub qa_count: u64,
  pub doc_count: u64,
  pub accuracy: f64,
  pub vqa_accuracy: f64,
  pub overall_accuracy: f64,
}

/// In-process statistics store
#[derive(Debug, Default)]
pub struct SystemStats {
  inner: Mutex<StatsSnapshot>,
}

impl SystemStats {
  pub fn new() -> Self {
    Self::default()
  }

  fn with<T>(&self, f: impl FnOnce(&mut StatsSnapshot) -> T) -> T {
    let mut guard = match self.inner.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    f(&mut guard)
  }
}

impl StatsSink for SystemStats {
  fn record_query(&self) {
    self.with(|stats| stats.qa_count += 1);
  }

  fn record_document(&self) {
    self.with(|stats| stats.doc_count += 1);
  }

  fn record_qa_accuracy(&self, accuracy: f64) {
    self.with(|stats| stats.accuracy = round2(accuracy));
  }

  fn record_vqa_accuracy(&self, accuracy: f64) {
    self.with(|stats| {
      stats.vqa_accuracy = round2(accuracy);
      stats.overall_accuracy = round2((stats.accuracy + stats.vqa_accuracy) / 2.0);
    });
  }

  fn snapshot(&self) -> StatsSnapshot {
    self.with(|stats| stats.clone())
  }
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}
