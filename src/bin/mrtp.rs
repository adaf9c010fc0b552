//! mrtp CLI - Market Research Title Parser
//!
//! Thin wrapper over the `title_parser` library: load the pattern
//! store, run the pipeline over a batch of titles, and write the
//! timestamped report directory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use title_parser::library::{seed, PatternKind, PatternLibrary, PatternStore};
use title_parser::pipeline::persist::ResultStore;
use title_parser::pipeline::report::{load_baseline, ReportWriter, RunTelemetry};
use title_parser::pipeline::{PipelineConfig, PipelineOrchestrator};

/// Parse market-research report titles into structured components.
#[derive(Parser, Debug)]
#[command(name = "mrtp")]
#[command(version = title_parser::VERSION)]
#[command(about = "Market research title parsing pipeline")]
#[command(after_help = "EXAMPLES:
  # Seed a pattern store
  mrtp seed patterns.json

  # Run the pipeline over a titles file (one title per line)
  mrtp run --pattern-store patterns.json --titles-file titles.txt

  # Run a couple of ad-hoc titles
  mrtp run --pattern-store patterns.json \\
      --title \"Global AI Market Size & Share Report, 2030\" \\
      --title \"APAC PPE Market Analysis\"

  # Inspect loaded patterns
  mrtp patterns --pattern-store patterns.json --kind geographic_entity
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the extraction pipeline over a batch of titles
    Run {
        /// Pattern store path (falls back to PATTERN_STORE_URI)
        #[arg(long = "pattern-store", value_name = "PATH")]
        pattern_store: Option<PathBuf>,

        /// File with one title per line
        #[arg(long = "titles-file", value_name = "FILE")]
        titles_file: Option<PathBuf>,

        /// Inline titles (repeatable)
        #[arg(long = "title", value_name = "TITLE")]
        titles: Vec<String>,

        /// Output directory root (default: outputs, or MRTP_OUTPUT_DIR)
        #[arg(long = "output-dir", value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Batch chunk size
        #[arg(long = "batch-size", value_name = "N")]
        batch_size: Option<usize>,

        /// Retry attempts per title
        #[arg(long = "retries", value_name = "N")]
        retries: Option<u32>,

        /// Per-title timeout in seconds
        #[arg(long = "timeout-seconds", value_name = "N")]
        timeout_seconds: Option<u64>,

        /// Prior pipeline_results.json to diff against
        #[arg(long = "baseline", value_name = "FILE")]
        baseline: Option<PathBuf>,

        /// Name recorded in the output directory
        #[arg(long = "name", value_name = "NAME", default_value = "mrtp_run")]
        name: String,

        /// Skip result persistence (report only)
        #[arg(long = "no-persist")]
        no_persist: bool,
    },

    /// Write the default pattern record set to a store file
    Seed {
        /// Destination path for the store
        path: PathBuf,

        /// Overwrite an existing store
        #[arg(long = "force")]
        force: bool,
    },

    /// List loaded patterns and compile diagnostics
    Patterns {
        /// Pattern store path (falls back to PATTERN_STORE_URI)
        #[arg(long = "pattern-store", value_name = "PATH")]
        pattern_store: Option<PathBuf>,

        /// Narrow to one pattern kind
        #[arg(long = "kind", value_name = "KIND")]
        kind: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Run {
            pattern_store,
            titles_file,
            titles,
            output_dir,
            batch_size,
            retries,
            timeout_seconds,
            baseline,
            name,
            no_persist,
        } => run(
            pattern_store,
            titles_file,
            titles,
            output_dir,
            batch_size,
            retries,
            timeout_seconds,
            baseline,
            name,
            no_persist,
        ),
        Command::Seed { path, force } => seed_store(path, force),
        Command::Patterns {
            pattern_store,
            kind,
        } => list_patterns(pattern_store, kind),
    }
}

fn resolve_store(path: Option<PathBuf>) -> anyhow::Result<PatternStore> {
    let path = path
        .or_else(PatternStore::path_from_env)
        .context("no pattern store given; pass --pattern-store or set PATTERN_STORE_URI")?;
    // Store-unreachable is fatal at startup
    PatternStore::open(&path).with_context(|| format!("opening pattern store {}", path.display()))
}

#[allow(clippy::too_many_arguments)]
fn run(
    pattern_store: Option<PathBuf>,
    titles_file: Option<PathBuf>,
    mut titles: Vec<String>,
    output_dir: Option<PathBuf>,
    batch_size: Option<usize>,
    retries: Option<u32>,
    timeout_seconds: Option<u64>,
    baseline: Option<PathBuf>,
    name: String,
    no_persist: bool,
) -> anyhow::Result<()> {
    let mut store = resolve_store(pattern_store)?;

    if let Some(file) = titles_file {
        let content = std::fs::read_to_string(&file)
            .with_context(|| format!("reading titles file {}", file.display()))?;
        titles.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }
    if titles.is_empty() {
        bail!("no titles to process; pass --titles-file or --title");
    }

    let mut config = PipelineConfig::from_env();
    if let Some(batch_size) = batch_size {
        config.batch_size = batch_size.max(1);
    }
    if let Some(retries) = retries {
        config.retry_attempts = retries;
    }
    if let Some(seconds) = timeout_seconds {
        config.timeout = std::time::Duration::from_secs(seconds.max(1));
    }
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }

    let library = Arc::new(PatternLibrary::load(&store));
    if library.is_empty() {
        bail!("pattern store holds no usable patterns");
    }
    let pipeline = PipelineOrchestrator::new(Arc::clone(&library), config.clone());

    let baseline_results = match &baseline {
        Some(path) => Some(
            load_baseline(path)
                .with_context(|| format!("loading baseline {}", path.display()))?,
        ),
        None => None,
    };

    let outcome = pipeline.process_batch(&titles);

    if !no_persist {
        let result_store = ResultStore::open(config.output_dir.join("results"))?;
        result_store.insert_batch(&outcome.results);
    }

    let telemetry = RunTelemetry {
        metrics: pipeline.metrics(),
        distribution: pipeline.distribution(),
        recommendations: pipeline.recommendations(),
        confusion: pipeline.confusion_patterns(),
    };
    let writer = ReportWriter::new(&name);
    let run_dir = writer.write_all(
        &config.output_dir,
        &outcome,
        &telemetry,
        baseline_results.as_deref(),
    )?;

    // Merge the fire-and-forget pattern counters back into the store
    let events = pipeline.drain_counters();
    store.apply_counters(&events);

    let stats = &outcome.stats;
    println!("Batch:            {}", outcome.batch_id);
    println!("Titles:           {}", stats.total_titles);
    println!("Completed:        {}", stats.completed);
    println!("Requires review:  {}", stats.requires_review);
    println!("Failed:           {}", stats.failed);
    println!("Success rate:     {:.1}%", stats.success_rate * 100.0);
    println!("Throughput:       {:.2} titles/s", stats.titles_per_second);
    println!("Report directory: {}", run_dir.display());

    Ok(())
}

fn seed_store(path: PathBuf, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }
    let store = PatternStore::from_records(seed::default_records());
    store
        .save_to(&path)
        .with_context(|| format!("writing pattern store {}", path.display()))?;
    println!(
        "Seeded {} pattern records into {}",
        store.records().len(),
        path.display()
    );
    Ok(())
}

fn list_patterns(pattern_store: Option<PathBuf>, kind: Option<String>) -> anyhow::Result<()> {
    let store = resolve_store(pattern_store)?;
    let library = PatternLibrary::load(&store);

    let kinds: Vec<PatternKind> = match kind {
        Some(name) => {
            let parsed = PatternKind::parse(&name)
                .with_context(|| format!("unknown pattern kind '{name}'"))?;
            vec![parsed]
        }
        None => PatternKind::all().to_vec(),
    };

    for kind in kinds {
        let patterns = library.patterns(kind);
        if patterns.is_empty() {
            continue;
        }
        println!("{} ({})", kind.as_str(), patterns.len());
        for pattern in patterns {
            println!(
                "  [{:>3}] {}  {}",
                pattern.record.priority,
                pattern.record.id,
                pattern.term()
            );
        }
    }

    let failures = library.compile_failures();
    if !failures.is_empty() {
        println!("\ncompile failures ({}):", failures.len());
        for failure in failures {
            println!("  {}  {}", failure.pattern_id, failure.message);
        }
    }

    Ok(())
}
