use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
  #[error("Invalid input: {message}")]
  Input { message: String },

  #[error("Vector dimension mismatch: index has {expected} columns, vector has {actual}")]
  Vectorization { expected: usize, actual: usize },

  #[error("Invalid configuration: {message}")]
  Config { message: String },

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Yaml(#[from] serde_yaml::Error),
}

impl EngineError {
  pub fn input(message: impl Into<String>) -> Self {
    Self::Input { message: message.into() }
  }

  pub fn config(message: impl Into<String>) -> Self {
    Self::Config { message: message.into() }
  }

  pub fn vectorization(expected: usize, actual: usize) -> Self {
    Self::Vectorization { expected, actual }
  }

  /// Missing required field at a given position of an input file
  pub fn missing_field(field: &str, line: usize) -> Self {
    Self::input(format!("record {line}: missing required field '{field}'"))
  }

  pub fn is_input(&self) -> bool {
    matches!(self, Self::Input { .. })
  }
}
