use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hanzi_stardict::config::DEFAULT_DB_NAME;
use hanzi_stardict::diagnostics::Diagnostics;
use hanzi_stardict::export::{self, ExportOptions, ExportReport, Profile};
use hanzi_stardict::models::{Entry, Tier};
use hanzi_stardict::normalize;
use hanzi_stardict::render;
use hanzi_stardict::stardict::StarDict;
use hanzi_stardict::stats::PipelineStats;
use hanzi_stardict::store::Store;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "hanzi-stardict")]
#[command(about = "Normalize Chinese dictionary sources and export StarDict dictionaries")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize JSON sources into the database
    Build(BuildArgs),
    /// Export StarDict triads from the database
    Export(ExportArgs),
    /// Build the database, then export from it
    Run(RunArgs),
    /// Query the database
    Lookup(LookupArgs),
    /// Check exported triads for consistency
    Verify(VerifyArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Directory containing the JSON collections
    #[arg(short, long)]
    data: PathBuf,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Database path (defaults to <output>/chinese_dictionary.db)
    #[arg(long)]
    db: Option<PathBuf>,
}

#[derive(Args)]
struct ExportFlags {
    /// Profiles to export
    #[arg(long = "profile", value_delimiter = ',', default_value = "characters,words,full")]
    profiles: Vec<Profile>,

    /// Only export entries at least this common (most_common, common, full)
    #[arg(long)]
    max_tier: Option<Tier>,

    /// Author written to the .ifo
    #[arg(long)]
    author: Option<String>,

    /// Website written to the .ifo
    #[arg(long)]
    website: Option<String>,

    /// Date written to the .ifo (omitted by default for reproducible output)
    #[arg(long)]
    date: Option<String>,
}

impl ExportFlags {
    fn options(&self) -> ExportOptions {
        ExportOptions {
            max_tier: self.max_tier,
            author: self.author.clone(),
            website: self.website.clone(),
            date: self.date.clone(),
        }
    }
}

#[derive(Args)]
struct ExportArgs {
    /// Output directory (also holds the default database)
    #[arg(short, long)]
    output: PathBuf,

    /// Database path (defaults to <output>/chinese_dictionary.db)
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(flatten)]
    flags: ExportFlags,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    build: BuildArgs,

    #[command(flatten)]
    flags: ExportFlags,
}

#[derive(Args)]
struct LookupArgs {
    /// Database path
    #[arg(long, default_value = DEFAULT_DB_NAME)]
    db: PathBuf,

    /// Headword, reading or radical to search for
    query: Option<String>,

    /// Treat the query as a pinyin reading
    #[arg(long, conflicts_with = "radical")]
    pinyin: bool,

    /// Treat the query as a radical
    #[arg(long)]
    radical: bool,

    /// Print the rendered HTML of each hit
    #[arg(long)]
    html: bool,

    /// Print entry counts per category and tier instead of searching
    #[arg(long)]
    summary: bool,
}

#[derive(Args)]
struct VerifyArgs {
    /// Directory containing exported triads
    #[arg(short, long)]
    output: PathBuf,

    /// Profiles to verify
    #[arg(long = "profile", value_delimiter = ',', default_value = "characters,words,full")]
    profiles: Vec<Profile>,

    /// Also print the content stored for this headword
    #[arg(long)]
    lookup: Option<String>,
}

fn db_path(output: &Path, db: Option<PathBuf>) -> PathBuf {
    db.unwrap_or_else(|| output.join(DEFAULT_DB_NAME))
}

fn run_build(args: &BuildArgs, stats: &PipelineStats) -> Result<Diagnostics> {
    let start = Instant::now();
    let normalized = normalize::normalize_dir(&args.data, stats)?;
    info!(
        entries = normalized.entries.len(),
        duration_secs = start.elapsed().as_secs_f64(),
        "Normalization complete"
    );

    let db = db_path(&args.output, args.db.clone());
    let summary = Store::build(&db, &normalized.entries, stats)
        .with_context(|| format!("Failed to build database at {:?}", db))?;

    println!();
    println!("=== Build Summary ===");
    println!("Normalization time:  {:.2}s", start.elapsed().as_secs_f64());
    println!("Records read:        {}", stats.records());
    println!("Records rejected:    {}", stats.rejected());
    println!("Entries merged:      {}", stats.merged());
    println!("References dropped:  {}", stats.references_dropped());
    println!("Entries excluded:    {}", stats.excluded());
    println!("Entries stored:      {}", stats.stored());
    summary.print();

    Ok(normalized.diagnostics)
}

fn run_export(
    output: &Path,
    db: &Path,
    flags: &ExportFlags,
    stats: &PipelineStats,
) -> Result<Diagnostics> {
    if !db.exists() {
        anyhow::bail!("Database not found: {:?} (run `build` first)", db);
    }
    let start = Instant::now();
    let mut store = Store::open(db)?;
    let reports = export::export_from_store(
        &mut store,
        output,
        &flags.profiles,
        &flags.options(),
        stats,
    )?;

    println!();
    println!("=== Export Summary ===");
    println!("Export time:         {:.2}s", start.elapsed().as_secs_f64());
    println!("Entries rendered:    {}", stats.rendered());
    println!("Render failures:     {}", stats.render_failures());
    println!("Content bytes:       {}", stats.content_bytes());
    for report in &reports {
        print_report(report);
    }

    let mut diagnostics = Diagnostics::new();
    for report in reports {
        diagnostics.extend(report.diagnostics);
    }
    Ok(diagnostics)
}

fn print_report(report: &ExportReport) {
    println!(
        "{:<20} {:>8} records  {:>10} idx bytes  {:>12} dict bytes",
        report.profile.stem(),
        report.records,
        report.idx_bytes,
        report.dict_bytes
    );
}

fn print_entry(entry: &Entry, html: bool) {
    println!(
        "{}\t{}\t{}\t{}",
        entry.headword,
        entry.category,
        entry.pinyin.join(", "),
        entry.tier
    );
    if html {
        match render::render(entry) {
            Ok(fragment) => println!("{}\n", fragment),
            Err(e) => println!("  (cannot render: {})\n", e),
        }
    }
}

fn run_lookup(args: LookupArgs) -> Result<()> {
    if !args.db.exists() {
        anyhow::bail!("Database not found: {:?}", args.db);
    }
    let mut store = Store::open(&args.db)?;
    if args.summary {
        store.summary()?.print();
        return Ok(());
    }
    let query = args
        .query
        .context("A query is required unless --summary is given")?;

    let hits = if args.pinyin {
        store.find_by_pinyin(&query)?
    } else if args.radical {
        store.find_by_radical(&query)?
    } else {
        store.find_headword(&query)?
    };

    if hits.is_empty() {
        println!("No entries found for {:?}", query);
    }
    for entry in &hits {
        print_entry(entry, args.html);
    }
    Ok(())
}

fn run_verify(args: VerifyArgs) -> Result<()> {
    for profile in &args.profiles {
        let dict = StarDict::open(&args.output, profile.stem())?;
        let report = dict
            .verify()
            .with_context(|| format!("Triad {} failed verification", profile.stem()))?;
        println!(
            "{:<20} ok  {:>8} records  {:>10} idx bytes  {:>12} dict bytes  {} repeated",
            profile.stem(),
            report.records,
            report.idx_bytes,
            report.dict_bytes,
            report.duplicate_headwords
        );

        if let Some(headword) = &args.lookup {
            for fragment in dict.lookup(headword) {
                println!("{}\n", fragment);
            }
        }
    }
    Ok(())
}

fn finish(diagnostics: &Diagnostics) {
    println!();
    println!("=== Diagnostics ===");
    diagnostics.print_summary();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let stats = PipelineStats::new();
    let result = match cli.command {
        Commands::Build(args) => run_build(&args, &stats).map(|d| finish(&d)),
        Commands::Export(args) => {
            let db = db_path(&args.output, args.db.clone());
            run_export(&args.output, &db, &args.flags, &stats).map(|d| finish(&d))
        }
        Commands::Run(args) => run_build(&args.build, &stats).and_then(|mut diagnostics| {
            let db = db_path(&args.build.output, args.build.db.clone());
            diagnostics.extend(run_export(&args.build.output, &db, &args.flags, &stats)?);
            finish(&diagnostics);
            Ok(())
        }),
        Commands::Lookup(args) => run_lookup(args),
        Commands::Verify(args) => run_verify(args),
    };

    match result {
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
