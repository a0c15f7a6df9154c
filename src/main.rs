use anyhow::{Context, Result};
use clap::Parser;
use proto_compat::compat::BreakingCategory;
use proto_compat::compat::rule_registry::RULES;
use proto_compat::{BreakingConfig, Cancellation, Outcome, load_image};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const EXIT_INCOMPATIBLE: u8 = 100;
const EXIT_ERROR: u8 = 1;
const EXIT_CANCELLED: u8 = 2;

#[derive(Parser)]
#[command(name = "proto-compat")]
#[command(about = "Detect breaking changes between two Protobuf schema images")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, default_value = "warn", help = "Log level (overridden by RUST_LOG)")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value = "text", help = "Log output format")]
    log_format: LogFormat,
}

#[derive(clap::Subcommand)]
enum Commands {
    #[command(about = "Check NEW for breaking changes against OLD")]
    Breaking(BreakingArgs),
    #[command(about = "Generate the semantic fingerprint of an image")]
    Fingerprint {
        #[arg(help = "Path to a .proto file, a directory or a descriptor set")]
        input: PathBuf,
    },
    #[command(about = "List every breaking rule with its categories")]
    Rules,
}

#[derive(clap::Args)]
struct BreakingArgs {
    #[arg(help = "Previous image: a .proto file, a directory or a descriptor set")]
    old: PathBuf,
    #[arg(help = "Current image: a .proto file, a directory or a descriptor set")]
    new: PathBuf,
    #[arg(long, help = "Breaking configuration file (YAML or JSON)")]
    config: Option<PathBuf>,
    #[arg(long, help = "Output format", value_enum, default_value = "text")]
    format: OutputFormat,
    #[arg(long, help = "Categories to use (comma-separated)")]
    use_categories: Option<String>,
    #[arg(long, help = "Rules to exclude (comma-separated)")]
    except_rules: Option<String>,
    #[arg(long, help = "Path or glob to leave out (repeatable)")]
    exclude_path: Vec<String>,
    #[arg(long, help = "Fully-qualified symbol to leave out (repeatable)")]
    exclude_symbol: Vec<String>,
    #[arg(long, help = "Skip packages with an unstable version suffix")]
    ignore_unstable_packages: bool,
    #[arg(long, help = "Also compare imported files")]
    include_imports: bool,
    #[arg(long, help = "Only compare files present in the new image")]
    limit_to_input_files: bool,
    #[arg(long, default_value_t = 10, help = "Seconds before the check is cancelled (0 for none)")]
    timeout: u64,
    #[arg(long, help = "Worker threads (defaults to available parallelism)")]
    jobs: Option<usize>,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum LogFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level, &args.log_format);

    let result = match args.command {
        Commands::Breaking(breaking) => run_breaking(&breaking),
        Commands::Fingerprint { input } => run_fingerprint(&input),
        Commands::Rules => run_rules(),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn init_tracing(level: &str, format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn build_config(args: &BreakingArgs) -> Result<BreakingConfig> {
    let mut config = match &args.config {
        Some(path) => BreakingConfig::from_file(path)?,
        None => BreakingConfig::default(),
    };
    if let Some(categories) = &args.use_categories {
        config.use_categories = split_list(categories).collect();
    }
    if let Some(except) = &args.except_rules {
        config.except_rules.extend(split_list(except));
    }
    config.ignore.extend(args.exclude_path.iter().cloned());
    config.ignore_symbols.extend(args.exclude_symbol.iter().cloned());
    config.ignore_unstable_packages |= args.ignore_unstable_packages;
    if args.include_imports {
        config.exclude_imports = false;
    }
    config.limit_to_input_files |= args.limit_to_input_files;
    Ok(config)
}

fn run_breaking(args: &BreakingArgs) -> Result<u8> {
    let config = build_config(args)?;
    let old = load_image(&args.old)
        .with_context(|| format!("Failed to load old image '{}'", args.old.display()))?;
    let new = load_image(&args.new)
        .with_context(|| format!("Failed to load new image '{}'", args.new.display()))?;

    let cancel = match args.timeout {
        0 => Cancellation::new(),
        secs => Cancellation::with_timeout(Duration::from_secs(secs)),
    };
    let jobs = args.jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    });

    let outcome = proto_compat::check_breaking_with(&old, &new, &config, &cancel, jobs)?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => {
            for violation in outcome.violations() {
                println!("{violation}");
            }
        }
    }

    Ok(match outcome {
        Outcome::Compatible => 0,
        Outcome::Incompatible { .. } => EXIT_INCOMPATIBLE,
        Outcome::Cancelled => {
            eprintln!("breaking check cancelled after {}s", args.timeout);
            EXIT_CANCELLED
        }
    })
}

fn run_fingerprint(input: &Path) -> Result<u8> {
    let image = load_image(input)
        .with_context(|| format!("Failed to load image '{}'", input.display()))?;
    println!("{}", image.fingerprint()?);
    Ok(0)
}

fn run_rules() -> Result<u8> {
    for category in BreakingCategory::ALL {
        println!("{:<10} {}", category.id(), category.description());
    }
    println!();
    for rule in RULES {
        let categories: Vec<_> = rule.categories.iter().map(|c| c.id()).collect();
        println!("{:<48} {:<30} {}", rule.name, categories.join(","), rule.purpose);
    }
    Ok(0)
}
