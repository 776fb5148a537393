use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use weavelang_engine::config::{load_config_from_file, Config};
use weavelang_engine::corpus_generator::{run_corpus_generation, GenerationArgs};
use weavelang_engine::profile_io::load_profile_snapshot;
use weavelang_engine::WeaveResult;

const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Parser)]
#[command(name = "weavelang", about = "Adaptive leveling engine for graded reading corpora")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Level a sentence corpus batch by batch against a simulated learner
    Generate {
        /// Engine settings; `config.toml` is used when present, defaults otherwise
        #[arg(long)]
        config: Option<PathBuf>,
        /// Sentence records, JSON array or JSON Lines, in corpus order. With
        /// `--sequence`, the directory holding `<stem>.jsonl` or `<stem>.json`
        #[arg(long)]
        corpus: PathBuf,
        /// Book stems in reading order, one per line; `#` starts a comment
        #[arg(long)]
        sequence: Option<PathBuf>,
        /// Lemma frequency table; derived from the corpus when omitted
        #[arg(long)]
        frequencies: Option<PathBuf>,
        #[arg(long)]
        out_dir: PathBuf,
        /// Profile snapshot to seed a fresh run
        #[arg(long)]
        start_profile: Option<PathBuf>,
        /// Continue from `out_dir/checkpoint.json`
        #[arg(long)]
        resume: bool,
    },
    /// Print lemma state counts of a profile snapshot
    InspectProfile { snapshot: PathBuf },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Generate {
            config,
            corpus,
            sequence,
            frequencies,
            out_dir,
            start_profile,
            resume,
        } => generate(
            config.as_deref(),
            GenerationArgs {
                corpus_path: corpus,
                frequencies_path: frequencies,
                out_dir,
                start_profile_path: start_profile,
                resume,
                sequence_path: sequence,
            },
        ),
        Command::InspectProfile { snapshot } => inspect_profile(&snapshot),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "weavelang failed");
            ExitCode::FAILURE
        }
    }
}

fn load_config(explicit: Option<&Path>) -> WeaveResult<Config> {
    match explicit {
        Some(path) => load_config_from_file(path),
        None if Path::new(DEFAULT_CONFIG).exists() => load_config_from_file(Path::new(DEFAULT_CONFIG)),
        None => {
            info!("no config.toml found, using default engine settings");
            Ok(Config::default())
        }
    }
}

fn generate(config_path: Option<&Path>, args: GenerationArgs) -> WeaveResult<()> {
    let config = load_config(config_path)?;
    let summary = run_corpus_generation(&config.engine, &args)?;

    println!("Batches committed:   {}", summary.batches);
    println!("Sentences leveled:   {}", summary.sentences);
    println!("Flagged batches:     {}", summary.flagged_batches);
    println!("Known lemmas:        {}", summary.known_lemmas);
    println!("Active lemmas:       {}", summary.active_lemmas);
    if summary.saturation_notices.is_empty() {
        println!("Saturation notices:  none");
    } else {
        println!("Saturation notices:  batches {:?}", summary.saturation_notices);
    }
    Ok(())
}

fn inspect_profile(path: &Path) -> WeaveResult<()> {
    let snapshot = load_profile_snapshot(path)?;
    println!("Tracked lemmas: {}", snapshot.lemmas.len());
    for (state, count) in snapshot.state_counts() {
        println!("  {:<7} {}", format!("{state:?}"), count);
    }
    Ok(())
}
