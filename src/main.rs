// Post Curator CLI binary

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use post_curator::constants::{
    CURATED_FOLDER, DATA_FOLDER, DEFAULT_BATCH_SIZE, DEFAULT_MIN_SELECTION, DEFAULT_THRESHOLD,
    INCOMING_FOLDER,
};
use post_curator::curate::{CurationConfig, CurationEngine, CurationReport, OutcomeStatus};
use post_curator::db::{get_db_path, open_db};
use post_curator::scoring::backend::GroqScorer;

#[derive(Parser)]
#[command(name = "postcurator")]
#[command(about = "Post Curator - vision-scored image selection for ingested channel posts", long_about = None)]
#[command(version)]
struct Cli {
    /// Data directory containing incoming/, curated/ and the post index
    #[arg(long, default_value = DATA_FOLDER, global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct CurateArgs {
    /// Minimum combined score to auto-qualify
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Number of images per scoring request
    #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Fill the selection up to this many images when too few clear the threshold
    #[arg(long, default_value_t = DEFAULT_MIN_SELECTION)]
    min_selection: usize,

    /// Compute selection without copying files or updating the index
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Rescore even if destinations already exist
    #[arg(short, long)]
    force: bool,

    /// Backend API key (defaults to the GROQ_API_KEY environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Vision model identifier
    #[arg(long)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Curate a single post folder
    Curate {
        /// Folder containing images to score
        folder: PathBuf,

        #[command(flatten)]
        args: CurateArgs,
    },

    /// Curate every <channel>/<timestamp> folder under the incoming root
    CurateAll {
        /// Incoming root (defaults to <data-dir>/incoming)
        root: Option<PathBuf>,

        #[command(flatten)]
        args: CurateArgs,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Curate { folder, args } => cmd_curate(&cli.data_dir, folder, args),
        Commands::CurateAll { root, args } => cmd_curate_all(&cli.data_dir, root, args),
    }
}

fn build_scorer(args: &CurateArgs) -> Result<GroqScorer> {
    // Missing credential is an unrecoverable initialization failure
    let scorer = GroqScorer::new(args.api_key.clone())?;
    Ok(match &args.model {
        Some(model) => scorer.with_model(model),
        None => scorer,
    })
}

fn build_config(data_dir: &Path, args: &CurateArgs) -> CurationConfig {
    CurationConfig {
        threshold: args.threshold,
        batch_size: args.batch_size,
        min_selection: args.min_selection,
        force: args.force,
        dry_run: args.dry_run,
        incoming_root: data_dir.join(INCOMING_FOLDER),
        curated_root: data_dir.join(CURATED_FOLDER),
    }
}

fn cmd_curate(data_dir: &Path, folder: PathBuf, args: CurateArgs) -> Result<()> {
    if !folder.is_dir() {
        anyhow::bail!("Folder does not exist: {}", folder.display());
    }

    let scorer = build_scorer(&args)?;

    let db_path = get_db_path(data_dir);
    let conn = if db_path.exists() {
        Some(open_db(&db_path)?)
    } else {
        log::warn!("No post index at {}; destinations fall back to source structure", db_path.display());
        None
    };

    let config = build_config(data_dir, &args);
    if config.dry_run {
        println!("DRY RUN: no files will be copied");
    }

    let engine = CurationEngine::new(config, &scorer, conn.as_ref());
    let report = engine.curate_folder(&folder)?;
    print_report(&report);

    Ok(())
}

fn cmd_curate_all(data_dir: &Path, root: Option<PathBuf>, args: CurateArgs) -> Result<()> {
    let root = root.unwrap_or_else(|| data_dir.join(INCOMING_FOLDER));
    if !root.is_dir() {
        anyhow::bail!("Incoming root does not exist: {}", root.display());
    }

    let scorer = build_scorer(&args)?;

    let db_path = get_db_path(data_dir);
    let conn = if db_path.exists() {
        Some(open_db(&db_path)?)
    } else {
        None
    };

    let config = build_config(data_dir, &args);
    let engine = CurationEngine::new(config, &scorer, conn.as_ref());

    let mut total_images = 0usize;
    let mut failed_folders = 0usize;

    for folder in post_folders(&root)? {
        println!();
        println!("Processing {}", folder.display());
        match engine.curate_folder(&folder) {
            Ok(report) => {
                total_images += report.total_images;
                print_report(&report);
            }
            Err(e) => {
                // Fatal for this folder only; keep going
                failed_folders += 1;
                log::error!("Failed to process {}: {}", folder.display(), e);
            }
        }
    }

    println!();
    println!("Finished. Total images considered: {}", total_images);
    if failed_folders > 0 {
        println!("Folders failed: {}", failed_folders);
    }

    Ok(())
}

/// Enumerate <channel>/<timestamp> post folders under the incoming root,
/// sorted for deterministic processing order.
fn post_folders(root: &Path) -> Result<Vec<PathBuf>> {
    let mut folders = Vec::new();

    for channel in std::fs::read_dir(root)? {
        let channel = channel?.path();
        if !channel.is_dir() {
            continue;
        }
        for post in std::fs::read_dir(&channel)? {
            let post = post?.path();
            if post.is_dir() {
                folders.push(post);
            }
        }
    }

    folders.sort();
    Ok(folders)
}

fn print_report(report: &CurationReport) {
    if report.skipped_folder {
        println!("Skipped {} (already curated)", report.source_folder);
        return;
    }

    println!("Curation report for {}", report.source_folder);
    println!("  Total images:        {}", report.total_images);
    println!("  Selected:            {}", report.selected);
    println!("  Already processed:   {}", report.already_processed);
    println!("  Rejected (explicit): {}", report.rejected_explicit);
    println!("  Rejected (score):    {}", report.rejected_low_score);
    println!("  Errors:              {}", report.errors);
    println!("  Avg score:           {:.2}", report.avg_score);

    for outcome in &report.results {
        let name = outcome
            .source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| outcome.source_path.display().to_string());

        let score = match &outcome.score {
            Some(s) if s.is_explicit => "EXPLICIT".to_string(),
            Some(s) => format!("{:.1}", s.combined()),
            None => "-".to_string(),
        };

        let status = match outcome.status {
            OutcomeStatus::Selected => "selected",
            OutcomeStatus::Rejected => "rejected",
            OutcomeStatus::AlreadyProcessed => "already done",
            OutcomeStatus::Errored => "error",
        };

        let detail = match (&outcome.destination, &outcome.error) {
            (_, Some(err)) => format!(" ({})", err),
            (Some(dest), None) => format!(" -> {}", dest.display()),
            (None, None) => String::new(),
        };

        println!("  {:<32} {:>8}  {}{}", name, score, status, detail);
    }
}
