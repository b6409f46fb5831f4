use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

use medqa::analysis::{DocumentAnalysis, Entity, PosTag};
use medqa::config::EngineConfig;
use medqa::evaluation::{load_pairs, EvaluationResult};
use medqa::record::{read_rows, Corpus, RawRecord};
use medqa::{ChatReply, Engine, MatchOutcome, MatchPath};

/// Build an engine from an explicit config file or the usual search locations
pub fn load_engine(config_path: Option<&Path>) -> Result<Engine> {
  let config = match config_path {
    Some(path) => EngineConfig::load_from_file(path)
      .with_context(|| format!("Failed to load config from {}", path.display()))?,
    None => EngineConfig::load().context("Failed to load config")?,
  };
  Engine::new(config).context("Invalid engine configuration")
}

/// Answer a chat message against a corpus file
pub fn ask(engine: &Engine, corpus_path: &Path, message: &str) -> Result<()> {
  let corpus = Corpus::load(corpus_path)
    .with_context(|| format!("Failed to load corpus from {}", corpus_path.display()))?;
  engine.publish_corpus(corpus);

  match engine.chat(message)? {
    ChatReply::Answer { outcome } => print_outcome(&outcome),
    ChatReply::PosTags { tags } => print_pos_tags(&tags),
    ChatReply::Entities { entities } => print_entities(&entities),
    ChatReply::Summary { keywords, summary } => {
      print_keywords(&keywords);
      println!("{} {}", "summary:".bold(), summary);
    }
    ChatReply::Analysis { analysis } => print_analysis(&analysis),
  }
  Ok(())
}

/// Print the top keywords of a text
pub fn keywords(engine: &Engine, text: &str, k: Option<usize>) -> Result<()> {
  let k = k.unwrap_or(engine.config().keywords.record_keywords);
  let keywords = engine.extract_keywords(text, k);
  if keywords.is_empty() {
    println!("{}", "no keywords found".yellow());
    return Ok(());
  }
  print_keywords(&keywords);
  Ok(())
}

/// Analyze inline text or the contents of a file
pub fn analyze(engine: &Engine, text: Option<&str>, file: Option<&Path>) -> Result<()> {
  let content = match (text, file) {
    (_, Some(path)) => {
      fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
    }
    (Some(text), None) => text.to_string(),
    (None, None) => anyhow::bail!("Nothing to analyze: pass text or --file"),
  };

  let analysis = engine.analyze_document(&content);
  print_analysis(&analysis);
  Ok(())
}

/// Score a labeled pair file
pub fn evaluate(engine: &Engine, pairs_path: &Path, typed: bool, json: bool) -> Result<()> {
  let pairs = load_pairs(pairs_path, typed)
    .with_context(|| format!("Failed to load pairs from {}", pairs_path.display()))?;

  let result = if typed { engine.evaluate_typed(&pairs) } else { engine.evaluate(&pairs) };

  if json {
    println!("{}", serde_json::to_string_pretty(&result)?);
  } else {
    print_evaluation(&result, typed);
  }
  Ok(())
}

/// Derive keywords for raw question/answer rows and write a JSON Lines corpus
pub fn ingest(engine: &Engine, input: &Path, output: &Path, department: Option<&str>) -> Result<()> {
  let rows: Vec<RawRecord> =
    read_rows(input).with_context(|| format!("Failed to read rows from {}", input.display()))?;
  let corpus = engine.ingest(rows, department)?;

  if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
    fs::create_dir_all(parent)
      .with_context(|| format!("Failed to create directory {}", parent.display()))?;
  }
  corpus
    .save_jsonl(output)
    .with_context(|| format!("Failed to write corpus to {}", output.display()))?;

  println!(
    "{} Ingested {} records into {}",
    "✓".green(),
    corpus.len().to_string().cyan(),
    output.display().to_string().yellow()
  );
  Ok(())
}

fn print_outcome(outcome: &MatchOutcome) {
  match outcome {
    MatchOutcome::Found { answer, record_id, score, via } => {
      let via = match via {
        MatchPath::Keyword => "keyword",
        MatchPath::Similarity => "similarity",
      };
      println!("{}", answer);
      println!("{}", format!("({via} match, record {record_id}, score {score:.3})").dimmed());
    }
    MatchOutcome::NotFound => {
      println!("{}", "No matching answer found".yellow());
    }
  }
}

fn print_keywords(keywords: &[String]) {
  for (rank, keyword) in keywords.iter().enumerate() {
    println!("{:>3}. {}", rank + 1, keyword.cyan());
  }
}

fn print_pos_tags(tags: &[PosTag]) {
  let line: Vec<String> = tags.iter().map(|tag| format!("{}/{}", tag.word, tag.tag.dimmed())).collect();
  println!("{}", line.join(" "));
}

fn print_entities(entities: &[Entity]) {
  if entities.is_empty() {
    println!("{}", "no entities found".yellow());
    return;
  }
  for entity in entities {
    println!("{} {}", entity.word.bold(), format!("[{}]", entity.kind.as_str()).blue());
  }
}

fn print_analysis(analysis: &DocumentAnalysis) {
  println!("{} {}", "tokens:".bold(), analysis.token_count);
  println!("{}", "keywords:".bold());
  print_keywords(&analysis.keywords);
  println!("{}", "entities:".bold());
  print_entities(&analysis.entities);
  println!("{} {}", "summary:".bold(), analysis.summary);
}

fn print_evaluation(result: &EvaluationResult, typed: bool) {
  let label = if typed { "VQA evaluation" } else { "QA evaluation" };
  if let Some(reason) = &result.failure {
    println!("{} {} could not run: {}", "⚠".yellow(), label, reason);
  }
  println!("{}", label.bold());
  println!("  accuracy:       {}%", format!("{:.2}", result.accuracy).green());
  println!("  matched:        {}/{}", result.matched, result.total);
  println!("  avg similarity: {:.2}", result.avg_similarity);
  println!("  threshold:      {:.2}", result.threshold);
}
