use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use witness_collation::{
    build_report, logging, ChunkIndex, ChunkSelection, CollationConfig, CollatorBuilder,
    CorpusInput, InvalidChunkPolicy, SummaryDump,
};

#[path = "collation_report/json_report_formatter.rs"]
mod json_report_formatter;

#[derive(Debug, Parser)]
#[command(name = "collation_report")]
#[command(about = "Align manuscript witnesses chunk by chunk and write a JSON collation report")]
struct Args {
    /// Pre-tokenized corpus (JSON).
    #[arg(
        long,
        env = "COLLATION_REPORT_INPUT",
        default_value = "test-data/corpus.json"
    )]
    input: PathBuf,
    /// Optional JSON file overriding the search limits and report thresholds.
    #[arg(long, env = "COLLATION_REPORT_CONFIG")]
    config: Option<PathBuf>,
    #[arg(
        long,
        env = "COLLATION_REPORT_OUT",
        default_value = "output/collation_report.json"
    )]
    out: PathBuf,
    /// Where to write the abbreviation summary (`{texts, abbr}`).
    #[arg(long, env = "COLLATION_REPORT_SUMMARY_OUT")]
    summary_out: Option<PathBuf>,
    /// Only collate these chunk keys. Repeatable.
    #[arg(long = "chunk", env = "COLLATION_REPORT_CHUNKS", value_delimiter = ',')]
    chunks: Vec<String>,
    #[arg(long, env = "COLLATION_REPORT_OFFSET", default_value_t = 0)]
    offset: usize,
    #[arg(long, env = "COLLATION_REPORT_LIMIT")]
    limit: Option<usize>,
    /// Log and leave out chunks that violate an invariant instead of failing.
    #[arg(long, env = "COLLATION_REPORT_SKIP_INVALID_CHUNKS", default_value_t = false)]
    skip_invalid_chunks: bool,
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();
    let repo_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

    let input_path = resolve_path(&repo_root, &args.input);
    require_path_exists(&input_path, "Missing corpus file.")?;
    let out_path = resolve_path(&repo_root, &args.out);
    let summary_path = args
        .summary_out
        .as_ref()
        .map(|path| resolve_path(&repo_root, path));

    let config = match args.config.as_ref() {
        Some(path) => {
            let path = resolve_path(&repo_root, path);
            CollationConfig::load(&path)
                .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?
        }
        None => CollationConfig::default(),
    };
    let corpus = CorpusInput::load(&input_path)
        .map_err(|err| format!("Failed to load corpus '{}': {err}", input_path.display()))?;

    let selection = ChunkSelection {
        keys: args.chunks,
        offset: args.offset,
        limit: args.limit,
    };
    let index = ChunkIndex::build(&corpus).map_err(|err| format!("Invalid corpus: {err}"))?;
    let selected_chunk_count = selection
        .select(index.chunks())
        .map_err(|err| err.to_string())?
        .len();
    if selected_chunk_count == 0 {
        return Err("No chunks selected after applying filters/offset/limit.".to_string());
    }

    let collator = CollatorBuilder::new(config)
        .build()
        .map_err(|err| format!("Failed to build collator: {err}"))?;
    let policy = if args.skip_invalid_chunks {
        InvalidChunkPolicy::Skip
    } else {
        InvalidChunkPolicy::Fail
    };

    let progress = ProgressBar::new(selected_chunk_count as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );
    progress.set_message("starting...");

    let started = Instant::now();
    let collation = collator
        .collate_with(&corpus, &selection, policy, |key| {
            progress.set_message(key.to_string());
            progress.inc(1);
        })
        .map_err(|err| format!("Collation failed: {err}"))?;
    progress.finish_with_message("collation complete");
    println!(
        "collated {} chunk(s) over {} witness(es) in {:.2}s",
        collation.chunks.len(),
        collation.labels.len(),
        started.elapsed().as_secs_f64()
    );

    let report = build_report(&collation, collator.config(), Utc::now().to_rfc3339())
        .map_err(|err| format!("Failed to build report: {err}"))?;
    json_report_formatter::write_report(&out_path, &report)?;
    println!("{}", out_path.display());

    if let Some(summary_path) = summary_path {
        json_report_formatter::write_summary(&summary_path, &SummaryDump::from_collation(&collation))?;
        println!("{}", summary_path.display());
    }
    Ok(())
}

fn resolve_path(repo_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        repo_root.join(path)
    }
}

fn require_path_exists(path: &Path, message: &str) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    Err(format!("{message} Missing path: {}", path.display()))
}
