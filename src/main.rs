//! # Document Portal CLI (`portal`)
//!
//! ## Usage
//!
//! ```bash
//! portal --config ./config/portal.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `portal ingest <files…>` | Copy files into a session folder and index the new chunks |
//! | `portal ask "<question>"` | Answer one question from the index |
//! | `portal chat` | Interactive multi-turn conversation over the index |
//! | `portal analyze <file>` | Extract document metadata as JSON |
//! | `portal status` | Show index and ledger counts |
//! | `portal sessions clean` | Delete all but the newest session folders |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use doc_portal::analysis::DocumentAnalyzer;
use doc_portal::config::{self, Config};
use doc_portal::embedding::create_embedder;
use doc_portal::extract::extract_file;
use doc_portal::ingest::{IngestOptions, IngestionManager};
use doc_portal::ledger::Ledger;
use doc_portal::llm::create_completer;
use doc_portal::loader::load_files;
use doc_portal::pipeline::{ConversationalRag, PipelineOptions};
use doc_portal::session::{self, SessionManager};
use doc_portal::store;
use doc_portal_core::completion::Completer;
use doc_portal_core::models::ChatMessage;

/// Document Portal: index documents and ask questions about them.
#[derive(Parser)]
#[command(name = "portal", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/portal.toml")]
    config: PathBuf,

    /// Use this `[llm.providers.<name>]` block instead of `llm.active`.
    #[arg(long, global = true)]
    llm: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy files into a session folder and add their chunks to the index.
    ///
    /// Chunks already recorded in the ledger are skipped, so ingesting the
    /// same file twice adds nothing the second time.
    Ingest {
        /// Files to ingest (.pdf, .docx, .txt, .md).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Reuse an existing session folder instead of creating a new one.
        #[arg(long)]
        session: Option<String>,
    },

    /// Answer a single question.
    Ask {
        question: String,

        /// Chunks to retrieve (defaults to `retrieval.k`).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Start an interactive conversation. An empty line or `exit` quits.
    Chat {
        #[arg(long)]
        k: Option<usize>,
    },

    /// Print LLM-extracted metadata for a document as JSON.
    Analyze { file: PathBuf },

    /// Show the persisted index and ledger sizes.
    Status,

    /// Manage session folders.
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
}

#[derive(Subcommand)]
enum SessionsAction {
    /// Delete all but the newest session folders.
    Clean {
        /// How many to keep (defaults to `sessions.keep_latest`).
        #[arg(long)]
        keep: Option<usize>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { files, session } => cmd_ingest(&cfg, &files, session),
        Commands::Ask { question, k } => cmd_ask(&cfg, cli.llm.as_deref(), &question, k),
        Commands::Chat { k } => cmd_chat(&cfg, cli.llm.as_deref(), k),
        Commands::Analyze { file } => cmd_analyze(&cfg, cli.llm.as_deref(), &file),
        Commands::Status => cmd_status(&cfg),
        Commands::Sessions {
            action: SessionsAction::Clean { keep },
        } => {
            let keep = keep.unwrap_or(cfg.sessions.keep_latest);
            let removed = session::clean_old_sessions(&cfg.sessions.dir, keep)?;
            println!("Removed {} session folder(s).", removed.len());
            Ok(())
        }
    }
}

fn cmd_ingest(cfg: &Config, files: &[PathBuf], session_id: Option<String>) -> Result<()> {
    let session = SessionManager::new(&cfg.sessions.dir, session_id)?;
    let mut saved = Vec::new();
    for file in files {
        saved.push(session.import_file(file)?);
    }

    let (chunks, skipped) = load_files(&saved, cfg.chunking.max_tokens);
    for file in &skipped {
        eprintln!("Skipped {}", file);
    }

    let embedder = create_embedder(&cfg.embedding)?;
    let options = IngestOptions {
        batch_size: cfg.embedding.batch_size,
    };
    let mut manager = IngestionManager::open(&cfg.index.dir, embedder, options)?;

    let added = if manager.exists() {
        manager.create_or_load(None)?;
        manager.add(&chunks)?
    } else {
        manager.create_or_load(Some(chunks.as_slice()))?.len()
    };

    let stats = manager.stats();
    println!(
        "Session {}: {} file(s), {} chunk(s), {} new. Index now holds {} vector(s).",
        session.session_id(),
        saved.len() - skipped.len(),
        chunks.len(),
        added,
        stats.vectors
    );

    let removed = session.clean_old_sessions(cfg.sessions.keep_latest)?;
    if !removed.is_empty() {
        info!(removed = removed.len(), "pruned old sessions");
    }
    Ok(())
}

fn build_pipeline(cfg: &Config, llm: Option<&str>, k: Option<usize>) -> Result<ConversationalRag> {
    let embedder = create_embedder(&cfg.embedding)?;
    let completer = build_completer(cfg, llm)?;
    let options = PipelineOptions {
        inject_history: cfg.retrieval.inject_history,
    };
    let mut rag = ConversationalRag::new(None, embedder, completer, options);
    rag.attach(&cfg.index.dir, k.unwrap_or(cfg.retrieval.k))?;
    Ok(rag)
}

fn build_completer(cfg: &Config, llm: Option<&str>) -> Result<Arc<dyn Completer>> {
    let (name, block) = cfg.llm.resolve(llm)?;
    create_completer(name, block)
}

fn cmd_ask(cfg: &Config, llm: Option<&str>, question: &str, k: Option<usize>) -> Result<()> {
    let rag = build_pipeline(cfg, llm, k)?;
    let answer = rag.ask(question, None)?;
    println!("{}", answer);
    Ok(())
}

fn cmd_chat(cfg: &Config, llm: Option<&str>, k: Option<usize>) -> Result<()> {
    let rag = build_pipeline(cfg, llm, k)?;
    let mut history: Vec<ChatMessage> = Vec::new();
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    println!("Session {}. Empty line or `exit` to quit.", rag.session_id());
    loop {
        print!("> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() || input == "exit" {
            break;
        }

        match rag.ask(input, Some(history.as_slice())) {
            Ok(answer) => {
                println!("{}\n", answer);
                history.push(ChatMessage::human(input));
                history.push(ChatMessage::ai(answer));
            }
            Err(e) => eprintln!("Error: {}", e),
        }
    }
    Ok(())
}

fn cmd_analyze(cfg: &Config, llm: Option<&str>, file: &Path) -> Result<()> {
    let text = extract_file(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let analyzer = DocumentAnalyzer::new(build_completer(cfg, llm)?);
    let metadata = analyzer.analyze(&text)?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

fn cmd_status(cfg: &Config) -> Result<()> {
    let dir = &cfg.index.dir;
    println!("Index directory: {}", dir.display());
    if !store::index_exists(dir) {
        println!("No index yet. Run `portal ingest <files>` to create one.");
        return Ok(());
    }
    let index = store::load_index(dir, "status")?;
    let ledger = Ledger::load(dir)?;
    println!("Vectors:        {}", index.len());
    println!("Dimensions:     {}", index.dims());
    println!("Ledger entries: {}", ledger.len());
    Ok(())
}
