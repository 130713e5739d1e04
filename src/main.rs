use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tingmal::config::{DEFAULT_DATASET_FILE, REGISTRY_DUMP_FILE};
use tingmal::extract::ExtractOptions;
use tingmal::ident::IdGenerator;
use tingmal::stamp::StampOptions;
use tingmal::stats::RunStats;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "tingmal")]
#[command(about = "Stamp sentence identifiers into a TEI corpus and build a sentence dataset")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign identifiers to every sentence that lacks one
    Stamp(StampArgs),
    /// Extract identified sentences into a deduplicated JSONL dataset
    Export(ExportArgs),
    /// Stamp, then export
    Run(ExportArgs),
    /// Print descriptive statistics for a dataset
    Stats(StatsArgs),
    /// Report collected versus official question counts per year
    Coverage(CoverageArgs),
    /// Copy signature dates into documents without a source date
    AddDates(AddDatesArgs),
}

#[derive(Args)]
struct StampArgs {
    /// Corpus root directory (repeatable)
    #[arg(short, long = "root", required = true)]
    roots: Vec<PathBuf>,

    /// Report what would change without writing documents
    #[arg(long)]
    dry_run: bool,

    /// Write the registry of used identifiers to this file
    #[arg(long, num_args = 0..=1, default_missing_value = REGISTRY_DUMP_FILE)]
    registry_out: Option<PathBuf>,
}

#[derive(Args)]
struct ExportArgs {
    /// Corpus root directory (repeatable)
    #[arg(short, long = "root", required = true)]
    roots: Vec<PathBuf>,

    /// Dataset file to write
    #[arg(short, long, default_value = DEFAULT_DATASET_FILE)]
    output: PathBuf,

    /// Primary language subtag to leave out of the dataset
    #[arg(long, default_value = tingmal::config::DEFAULT_EXCLUDED_LANG)]
    exclude_lang: String,

    /// Keep sentences in every language
    #[arg(long, conflicts_with = "exclude_lang")]
    keep_all_langs: bool,
}

impl ExportArgs {
    fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            excluded_lang: (!self.keep_all_langs).then(|| self.exclude_lang.clone()),
        }
    }
}

#[derive(Args)]
struct StatsArgs {
    /// Dataset file to describe
    #[arg(short, long, default_value = DEFAULT_DATASET_FILE)]
    input: PathBuf,
}

#[derive(Args)]
struct CoverageArgs {
    /// Directory with one subdirectory of question files per year
    #[arg(short, long)]
    dir: PathBuf,

    /// Directory for PQ_STATS.md and PQ_STATS.json
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
}

#[derive(Args)]
struct AddDatesArgs {
    /// Directory with one subdirectory of question files per year
    #[arg(short, long)]
    dir: PathBuf,
}

fn run_stamp(args: &StampArgs, stats: &RunStats) -> Result<Duration> {
    let start = Instant::now();
    let options = StampOptions {
        dry_run: args.dry_run,
        registry_out: args.registry_out.clone(),
    };
    let mut generator = IdGenerator::new();
    tingmal::stamp::run_stamping(&args.roots, &options, &mut generator, stats)?;

    let duration = start.elapsed();
    info!(duration_secs = duration.as_secs_f64(), "Stamping pass complete");
    Ok(duration)
}

fn run_export(args: &ExportArgs, stats: &RunStats) -> Result<Duration> {
    let start = Instant::now();
    tingmal::dataset::run_export(&args.roots, &args.output, &args.extract_options(), stats)?;

    let duration = start.elapsed();
    info!(duration_secs = duration.as_secs_f64(), "Export pass complete");
    Ok(duration)
}

fn print_stamp_summary(duration: Duration, stats: &RunStats) {
    println!("Stamping time:       {:.2}s", duration.as_secs_f64());
    println!("Documents scanned:   {}", stats.scanned());
    println!("Documents modified:  {}", stats.modified());
    println!("Documents skipped:   {}", stats.skipped());
    println!("Ids registered:      {}", stats.registered());
    println!("Ids assigned:        {}", stats.assigned());
}

fn print_export_summary(duration: Duration, stats: &RunStats) {
    println!("Export time:         {:.2}s", duration.as_secs_f64());
    println!("Documents scanned:   {}", stats.scanned());
    println!("Documents skipped:   {}", stats.skipped());
    println!("Documents undated:   {}", stats.undated());
    println!("Sentences extracted: {}", stats.extracted());
    println!("Sentences excluded:  {}", stats.excluded());
    println!("Duplicates dropped:  {}", stats.duplicates());
    println!("Records written:     {}", stats.written());
}

fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Stamp(args) => {
            let stats = RunStats::new();
            let duration = run_stamp(&args, &stats)?;
            println!();
            println!("=== Summary ===");
            print_stamp_summary(duration, &stats);
        }
        Commands::Export(args) => {
            let stats = RunStats::new();
            let duration = run_export(&args, &stats)?;
            println!();
            println!("=== Summary ===");
            print_export_summary(duration, &stats);
        }
        Commands::Run(args) => {
            let stamp_stats = RunStats::new();
            let stamp_args = StampArgs {
                roots: args.roots.clone(),
                dry_run: false,
                registry_out: None,
            };
            let stamp_duration = run_stamp(&stamp_args, &stamp_stats)?;

            let export_stats = RunStats::new();
            let export_duration = run_export(&args, &export_stats)?;

            println!();
            println!("=== Summary ===");
            print_stamp_summary(stamp_duration, &stamp_stats);
            println!();
            print_export_summary(export_duration, &export_stats);
            println!();
            println!(
                "Total time:          {:.2}s",
                (stamp_duration + export_duration).as_secs_f64()
            );
        }
        Commands::Stats(args) => {
            let stats = tingmal::describe::describe(&args.input)?;
            print!("{}", stats.to_markdown());
        }
        Commands::Coverage(args) => {
            let report = tingmal::coverage::run_coverage(&args.dir, &args.output)?;
            print!("{}", report.to_markdown());
        }
        Commands::AddDates(args) => {
            let summary = tingmal::dates::run_add_dates(&args.dir)?;
            println!();
            println!("=== Summary ===");
            println!("Files checked:       {}", summary.files);
            println!("Files modified:      {}", summary.modified);
            println!("Files failed:        {}", summary.failed);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // RUST_LOG, when set, overrides the -v level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    match run_command(cli.command) {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
