//! # chunklab CLI
//!
//! Upload documents, chunk them with one or more strategies, and compare
//! dense, sparse and hybrid retrieval over the resulting collections.
//!
//! ```bash
//! chunklab upload notes/ report.md
//! chunklab process --method fixed --method sentence --chunk-size 500
//! chunklab search "ownership rules" --method dense --method hybrid --top-k 3
//! chunklab experiments --format json
//! ```
//!
//! Settings come from `config.toml` and `APP_*` environment variables.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chunklab_core::config::{Config, Settings};
use chunklab_core::data_processor::DataProcessor;
use chunklab_core::{ChunkMethod, ChunkParams, ChunkPlan, RetrievalMethod, TaskState};
use chunklab_embed::get_default_embedder;
use chunklab_hybrid::SearchRequest;
use chunklab_pipeline::{CancelFlag, Library, PipelineError, ProcessRequest, Stores, TaskUpdate};
use chunklab_vector::{DirStore, JsonExperimentLog, EXPERIMENTS_FILE};
use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chunklab")]
#[command(about = "Experiment with chunking strategies and retrieval methods")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Add files (or every supported file under a directory) to the library
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List uploaded files
    Files,

    /// Remove one uploaded file
    RemoveFile { id: String },

    /// Remove every uploaded file
    ClearFiles,

    /// Chunk and embed files into collections
    Process {
        /// File ids to process (default: every uploaded file)
        #[arg(long = "file")]
        files: Vec<String>,

        /// Chunking methods to apply
        #[arg(long = "method", required = true)]
        methods: Vec<ChunkMethod>,

        /// Window size in characters for fixed and recursive
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Overlap for fixed, recursive, token and sentence (in that method's unit)
        #[arg(long)]
        overlap: Option<usize>,

        #[arg(long)]
        token_count: Option<usize>,

        #[arg(long)]
        sentence_count: Option<usize>,

        /// Semantic merge threshold in [0, 1]
        #[arg(long)]
        threshold: Option<f32>,
    },

    /// Search collections
    Search {
        query: String,

        /// Collection ids to search (default: every collection)
        #[arg(long = "collection")]
        collections: Vec<String>,

        /// Retrieval methods (default: search.methods from config)
        #[arg(long = "method")]
        methods: Vec<RetrievalMethod>,

        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// List collections
    Collections,

    /// Delete one collection
    DeleteCollection { id: String },

    /// Delete every collection
    ClearCollections,

    /// Show experiment history, oldest first
    Experiments,
}

#[derive(Serialize)]
struct FileRow<'a> {
    id: &'a str,
    name: &'a str,
    file_type: chunklab_core::FileType,
    size: u64,
    uploaded_at: String,
}

#[derive(Serialize)]
struct CollectionRow<'a> {
    id: &'a str,
    name: &'a str,
    source_file_name: &'a str,
    chunk_method: ChunkMethod,
    params: ChunkParams,
    chunk_count: usize,
    embedding_model: &'a str,
    created_at: String,
}

#[derive(Serialize)]
struct SearchRow<'a> {
    rank: usize,
    method: RetrievalMethod,
    score: f32,
    collection: &'a str,
    chunk_id: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    elapsed_ms: u64,
    results: Vec<SearchRow<'a>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Config::load().context("Failed to load configuration")?.settings()?;
    let mut library = open_library(&settings).await?;

    match cli.command {
        Commands::Upload { paths } => {
            let processor = DataProcessor::new();
            let mut targets = Vec::new();
            for path in &paths {
                if path.is_dir() {
                    targets.extend(processor.list_files(path));
                } else {
                    targets.push(path.clone());
                }
            }
            let files = processor.load_files(&targets).await.context("Failed to read files")?;
            let added = library.add_files(files).await?;
            println!("Uploaded {added} file(s)");
        }
        Commands::Files => print_files(&library, cli.format)?,
        Commands::RemoveFile { id } => {
            library.remove_file(&id).await?;
            println!("Removed file {id}");
        }
        Commands::ClearFiles => {
            library.clear_files().await?;
            println!("Removed all files");
        }
        Commands::Process { files, methods, chunk_size, overlap, token_count, sentence_count, threshold } => {
            let file_ids = if files.is_empty() { library.files().iter().map(|f| f.id.clone()).collect() } else { files };
            let overrides = ParamOverrides { chunk_size, overlap, token_count, sentence_count, threshold };
            let request = ProcessRequest { file_ids, plan: overrides.apply(settings.chunking.plan(), &methods), methods };
            run_process(&mut library, &request, cli.format).await?;
        }
        Commands::Search { query, collections, methods, top_k } => {
            let request = SearchRequest {
                query,
                collection_ids: if collections.is_empty() {
                    library.collections().iter().map(|c| c.id.clone()).collect()
                } else {
                    collections
                },
                methods: if methods.is_empty() { settings.search.methods.clone() } else { methods },
                top_k: top_k.unwrap_or(settings.search.top_k),
            };
            let outcome = library.search(&request).await?;
            let rows: Vec<SearchRow> = outcome
                .results
                .iter()
                .enumerate()
                .map(|(i, r)| SearchRow {
                    rank: i + 1,
                    method: r.retrieval_method,
                    score: r.score,
                    collection: &r.collection_name,
                    chunk_id: &r.chunk.id,
                    text: &r.chunk.text,
                })
                .collect();
            let output = SearchOutput { query: &request.query, elapsed_ms: outcome.elapsed_ms, results: rows };
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
                OutputFormat::Text => {
                    println!("{} result(s) in {} ms", output.results.len(), output.elapsed_ms);
                    for row in &output.results {
                        println!("\n#{} [{}] {:.4}  {}  ({})", row.rank, row.method, row.score, row.collection, row.chunk_id);
                        println!("   {}", preview(row.text, 200));
                    }
                }
            }
        }
        Commands::Collections => print_collections(&library, cli.format)?,
        Commands::DeleteCollection { id } => {
            library.delete_collection(&id).await?;
            println!("Deleted collection {id}");
        }
        Commands::ClearCollections => {
            library.clear_collections().await?;
            println!("Deleted all collections");
        }
        Commands::Experiments => match cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(library.experiments())?),
            OutputFormat::Text => {
                for exp in library.experiments() {
                    let counts: Vec<String> = exp.chunk_counts.iter().map(|(m, n)| format!("{m}={n}")).collect();
                    println!(
                        "{}  {}  files=[{}]  chunks[{}]  {} ms",
                        exp.id,
                        exp.timestamp.to_rfc3339(),
                        exp.files_processed.join(", "),
                        counts.join(" "),
                        exp.processing_time_ms
                    );
                }
            }
        },
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn open_library(settings: &Settings) -> Result<Library> {
    let root = settings.storage.resolve(&std::env::current_dir()?);
    info!(root = %root.display(), "opening store");
    let disk = Arc::new(DirStore::open(&root).await.with_context(|| format!("Failed to open store at {}", root.display()))?);
    let stores = Stores {
        files: disk.clone(),
        collections: disk,
        experiments: Arc::new(JsonExperimentLog::new(root.join(EXPERIMENTS_FILE))),
    };
    let embedder = get_default_embedder(&settings.embedding)?;
    Library::open(stores, embedder).await.context("Failed to load library")
}

/// Command-line parameter overrides, applied to every selected method they fit.
struct ParamOverrides {
    chunk_size: Option<usize>,
    overlap: Option<usize>,
    token_count: Option<usize>,
    sentence_count: Option<usize>,
    threshold: Option<f32>,
}

impl ParamOverrides {
    fn apply(&self, mut plan: ChunkPlan, methods: &[ChunkMethod]) -> ChunkPlan {
        for method in methods {
            let params = match plan.params_for(*method) {
                ChunkParams::Fixed { chunk_size, overlap } => ChunkParams::Fixed {
                    chunk_size: self.chunk_size.unwrap_or(chunk_size),
                    overlap: self.overlap.unwrap_or(overlap),
                },
                ChunkParams::Recursive { chunk_size, overlap } => ChunkParams::Recursive {
                    chunk_size: self.chunk_size.unwrap_or(chunk_size),
                    overlap: self.overlap.unwrap_or(overlap),
                },
                ChunkParams::Token { token_count, overlap } => ChunkParams::Token {
                    token_count: self.token_count.unwrap_or(token_count),
                    overlap: self.overlap.unwrap_or(overlap),
                },
                ChunkParams::Sentence { sentence_count, overlap } => ChunkParams::Sentence {
                    sentence_count: self.sentence_count.unwrap_or(sentence_count),
                    overlap: self.overlap.unwrap_or(overlap),
                },
                ChunkParams::Semantic { similarity_threshold } => {
                    ChunkParams::Semantic { similarity_threshold: self.threshold.unwrap_or(similarity_threshold) }
                }
            };
            plan.set(params);
        }
        plan
    }
}

async fn run_process(library: &mut Library, request: &ProcessRequest, format: OutputFormat) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(render_progress(rx, format == OutputFormat::Text));

    let cancel = CancelFlag::new();
    let on_interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current task");
                cancel.cancel();
            }
        })
    };

    let result = library.process(request, Some(tx), cancel).await;
    on_interrupt.abort();
    // the sender is dropped with the builder, which ends the renderer
    progress.await.context("progress renderer panicked")?;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(PipelineError::Critical { info, collections }) => {
            anyhow::bail!(
                "{} ({} collection(s) were saved)\n{}",
                info.message,
                collections.len(),
                info.technical.unwrap_or_default()
            );
        }
        Err(e) => return Err(e.into()),
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&outcome.statuses)?);
        return Ok(());
    }
    for status in outcome.statuses.iter().filter(|s| s.status == TaskState::Error) {
        if let Some(err) = &status.error {
            eprintln!("{} [{}]: {}", status.file_name, status.method, err.info.message);
            if let Some(technical) = &err.info.technical {
                eprintln!("  {technical}");
            }
        }
    }
    let finished = outcome.statuses.iter().filter(|s| s.status == TaskState::Finished).count();
    if outcome.cancelled {
        println!("Cancelled: {finished} of {} task(s) finished", outcome.statuses.len());
    } else if let Some(exp) = &outcome.experiment {
        println!(
            "Built {} collection(s) from {} task(s) in {} ms (experiment {})",
            outcome.collections.len(),
            outcome.statuses.len(),
            exp.processing_time_ms,
            exp.id
        );
    }
    Ok(())
}

async fn render_progress(mut rx: mpsc::UnboundedReceiver<TaskUpdate>, visible: bool) {
    let multi = MultiProgress::new();
    let style = ProgressStyle::with_template("{prefix:>28} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    let mut bars: HashMap<String, ProgressBar> = HashMap::new();

    while let Some(TaskUpdate { status }) = rx.recv().await {
        if !visible {
            continue;
        }
        let bar = bars.entry(status.task_id.clone()).or_insert_with(|| {
            let bar = multi.add(ProgressBar::new(100));
            bar.set_style(style.clone());
            bar.set_prefix(format!("{} / {}", status.file_name, status.method));
            bar
        });
        bar.set_position(u64::from(status.progress));
        match status.status {
            TaskState::Finished => bar.finish_with_message("finished"),
            TaskState::Error => {
                let message = status.error.map(|e| e.info.message).unwrap_or_default();
                bar.abandon_with_message(format!("error: {message}"));
            }
            state => bar.set_message(state.to_string()),
        }
    }
}

fn print_files(library: &Library, format: OutputFormat) -> Result<()> {
    let rows: Vec<FileRow> = library
        .files()
        .iter()
        .map(|f| FileRow {
            id: &f.id,
            name: &f.name,
            file_type: f.file_type,
            size: f.size,
            uploaded_at: f.uploaded_at.to_rfc3339(),
        })
        .collect();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text => {
            for row in &rows {
                println!("{}  {:<32} {:>10} bytes  {}", row.id, row.name, row.size, row.uploaded_at);
            }
        }
    }
    Ok(())
}

fn print_collections(library: &Library, format: OutputFormat) -> Result<()> {
    let rows: Vec<CollectionRow> = library
        .collections()
        .iter()
        .map(|c| CollectionRow {
            id: &c.id,
            name: &c.name,
            source_file_name: &c.source_file_name,
            chunk_method: c.chunk_method,
            params: c.params,
            chunk_count: c.chunk_count,
            embedding_model: &c.embedding_model,
            created_at: c.created_at.to_rfc3339(),
        })
        .collect();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text => {
            for row in &rows {
                println!(
                    "{}  {:<40} {:>9} {:>5} chunks  ({})",
                    row.id, row.name, row.chunk_method, row.chunk_count, row.params
                );
            }
        }
    }
    Ok(())
}

/// First `max` characters of `text` on one line.
fn preview(text: &str, max: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max).collect();
    format!("{cut}…")
}

