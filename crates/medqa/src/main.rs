use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

mod commands;

#[derive(Parser)]
#[command(name = "medqa")]
#[command(
  about = "MedQA - Medical Question Answering\nKeyword and TF-IDF retrieval over a curated question/answer corpus"
)]
#[command(version)]
struct Cli {
  /// Config file (JSON or YAML); overrides MEDQA_CONFIG and the default locations
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Answer a question from a corpus; prefixes like 实体识别： select other operations
  Ask {
    /// Corpus file (JSON array or .jsonl)
    #[arg(short, long)]
    corpus: PathBuf,
    /// The message (space-separated)
    #[arg(required = true)]
    message: Vec<String>,
  },
  /// Extract the top keywords of a text
  Keywords {
    /// Number of keywords to return [default: keywords.record_keywords]
    #[arg(short, long)]
    k: Option<usize>,
    /// Text to analyze (space-separated)
    #[arg(required = true)]
    text: Vec<String>,
  },
  /// Keyword, entity and part-of-speech breakdown of a text
  Analyze {
    /// Read the text from a file instead
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,
    /// Text to analyze (space-separated)
    #[arg(required_unless_present = "file")]
    text: Vec<String>,
  },
  /// Score a labeled question/answer pair file
  Evaluate {
    /// Pair file (JSON array or .jsonl)
    #[arg(short, long)]
    pairs: PathBuf,
    /// Also reward matching question/answer types
    #[arg(long)]
    vqa: bool,
    /// Print the result as JSON
    #[arg(long)]
    json: bool,
  },
  /// Derive keywords for raw question/answer rows and write a corpus
  Ingest {
    /// Raw rows (JSON array or .jsonl)
    #[arg(short, long)]
    input: PathBuf,
    /// Output corpus (JSON Lines)
    #[arg(short, long)]
    output: PathBuf,
    /// Department assigned to every record
    #[arg(short, long)]
    department: Option<String>,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("medqa=debug,info")
  } else {
    EnvFilter::new("medqa=info,warn")
  };
  tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

  let engine = commands::load_engine(cli.config.as_deref())?;

  match cli.command {
    Commands::Ask { corpus, message } => {
      commands::ask(&engine, &corpus, &message.join(" "))?;
    }
    Commands::Keywords { k, text } => {
      commands::keywords(&engine, &text.join(" "), k)?;
    }
    Commands::Analyze { file, text } => {
      let text = (!text.is_empty()).then(|| text.join(" "));
      commands::analyze(&engine, text.as_deref(), file.as_deref())?;
    }
    Commands::Evaluate { pairs, vqa, json } => {
      commands::evaluate(&engine, &pairs, vqa, json)?;
    }
    Commands::Ingest { input, output, department } => {
      commands::ingest(&engine, &input, &output, department.as_deref())?;
    }
  }

  Ok(())
}
