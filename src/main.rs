//! CLI entry point for `momocheck`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use momocheck::config::{self, Config};
use momocheck::model::message::RawMessage;
use momocheck::model::transaction::TransactionRecord;
use momocheck::parser::{MessageParser, NotificationParser};
use momocheck::search::query::parse_query;
use momocheck::search::Searcher;
use momocheck::source::document;
use momocheck::source::spool::SpoolService;
use momocheck::store::file::FileCache;
use momocheck::store::TransactionCache;

#[derive(Parser)]
#[command(
    name = "momocheck",
    version,
    about = "Find MoMo payment notifications in your mail"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the most recent transaction matching a query
    Search {
        /// Query, e.g. `amount:50000 note:"coffee"`
        query: String,
        /// Directory of exported messages (<id>.json or <id>.eml)
        #[arg(long, value_name = "DIR")]
        spool: PathBuf,
        /// Only consider messages from this sender
        #[arg(long)]
        sender: Option<String>,
        /// Messages listed per page
        #[arg(long)]
        page_size: Option<u32>,
        /// Maximum number of pages to list
        #[arg(long)]
        max_pages: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// Parse a single notification (.html, .json or .eml)
    Parse {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Inspect the transaction cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config file location and the effective settings
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show the cached outcome for a message id
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Forget the cached outcome for a message id
    Delete { id: String },
    /// Print the cache file a message id maps to
    Path { id: String },
    /// Count cached entries and their size on disk
    Stats,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Search {
            query,
            spool,
            sender,
            page_size,
            max_pages,
            json,
        } => cmd_search(&config, &query, &spool, sender, page_size, max_pages, json),
        Commands::Parse { path, json } => cmd_parse(&config, &path, json),
        Commands::Cache { action } => cmd_cache(&config, action),
        Commands::Config { action } => cmd_config(&config, action),
        Commands::Completions { shell } => cmd_completions(shell),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = config::log_file_path(config);
    let log_target = log_path
        .parent()
        .zip(log_path.file_name())
        .filter(|(dir, _)| std::fs::create_dir_all(dir).is_ok());

    if let Some((dir, file_name)) = log_target {
        let file_appender = tracing_appender::rolling::never(dir, file_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "momocheck", &mut std::io::stdout());
    Ok(())
}

/// Search a spool directory for the first transaction matching `query`.
fn cmd_search(
    config: &Config,
    query: &str,
    spool: &Path,
    sender: Option<String>,
    page_size: Option<u32>,
    max_pages: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    if !spool.is_dir() {
        anyhow::bail!("Spool directory not found: {}", spool.display());
    }

    let parsed = parse_query(query);
    if parsed.is_empty() {
        anyhow::bail!("Empty query");
    }

    let mut window = config.search.window();
    if let Some(ref s) = sender {
        window.sender = Some(s.clone());
    }
    if let Some(n) = page_size {
        window.page_size = n;
    }
    if let Some(n) = max_pages {
        window.max_pages = n;
    }

    let expected_sender = sender.unwrap_or_else(|| config.search.sender.clone());
    let searcher = Searcher::new(SpoolService::new(spool), config::open_cache(config))
        .with_expected_sender(expected_sender);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} Searching {msg}")
            .expect("valid template"),
    );
    pb.set_message(spool.display().to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    let start = Instant::now();
    let found = searcher.search(&window, |record| parsed.matches(record));
    pb.finish_and_clear();
    let found = found?;
    tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, "Search finished");

    match found {
        Some(record) if json => print_record_json(&record)?,
        Some(record) => print_record_table(&record),
        None if json => println!("null"),
        None => println!("  No matching transaction."),
    }
    Ok(())
}

/// Run the parsing pipeline on one document without touching the cache.
fn cmd_parse(config: &Config, path: &Path, json: bool) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let parser = NotificationParser::default();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let outcome = match ext.as_str() {
        "json" => {
            let message = document::from_api_json(&id, &std::fs::read_to_string(path)?)?;
            parse_message(&parser, &message, &config.search.sender)?
        }
        "eml" => {
            let message = document::from_eml(&id, &std::fs::read(path)?)?;
            parse_message(&parser, &message, &config.search.sender)?
        }
        _ => parser.parse_document(&std::fs::read_to_string(path)?)?,
    };

    match outcome {
        Some(record) if json => print_record_json(&record)?,
        Some(record) => print_record_table(&record),
        None if json => println!("null"),
        None => println!("  No transaction in {}.", path.display()),
    }
    Ok(())
}

fn parse_message(
    parser: &NotificationParser,
    message: &RawMessage,
    expected_sender: &str,
) -> anyhow::Result<Option<TransactionRecord>> {
    if !message.is_from(expected_sender) {
        eprintln!(
            "  Note: sender '{}' is not {expected_sender}; a search would skip this message.",
            message.sender_address().display()
        );
    }
    Ok(parser.parse(message)?)
}

fn cmd_cache(config: &Config, action: CacheAction) -> anyhow::Result<()> {
    match action {
        CacheAction::Show { id, json } => {
            let cache = config::open_cache(config);
            if !cache.has(&id) {
                anyhow::bail!("No cached outcome for message '{id}'");
            }
            match cache.get(&id)? {
                Some(record) if json => print_record_json(&record)?,
                Some(record) => print_record_table(&record),
                None if json => println!("null"),
                None => println!("  Message '{id}' holds no transaction."),
            }
        }
        CacheAction::Delete { id } => {
            config::open_cache(config).delete(&id)?;
            println!("  Removed cached outcome for '{id}'.");
        }
        CacheAction::Path { id } => {
            let cache = FileCache::new(config::transactions_dir(config));
            println!("{}", cache.path_for(&id).display());
        }
        CacheAction::Stats => {
            use humansize::{format_size, BINARY};

            let cache = FileCache::new(config::transactions_dir(config));
            let stats = cache.stats()?;
            println!();
            println!("  {:<20} {}", "Cache directory", cache.root().display());
            println!("  {:<20} {}", "Entries", stats.entries);
            println!("  {:<20} {}", "Size", format_size(stats.bytes, BINARY));
            println!();
        }
    }
    Ok(())
}

fn cmd_config(config: &Config, action: ConfigAction) -> anyhow::Result<()> {
    let path = config::config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    match action {
        ConfigAction::Show => {
            let state = if path.exists() { "" } else { " (not created)" };
            println!("# {}{state}", path.display());
            print!("{}", toml::to_string_pretty(config)?);
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            config::save_config(&Config::default())?;
            println!("  Wrote default configuration to {}", path.display());
        }
    }
    Ok(())
}

/// Print a transaction as a human-readable table.
fn print_record_table(record: &TransactionRecord) {
    println!();
    println!("  {:<16} {}", "Transaction id", record.id);
    println!("  {:<16} {}", "Amount", record.amount);
    println!(
        "  {:<16} {}",
        "Time",
        record.date.format("%Y-%m-%d %H:%M %:z")
    );
    println!("  {:<16} {}", "Phone", record.phone_number);
    if let Some(ref name) = record.name {
        println!("  {:<16} {}", "Name", name);
    }
    if let Some(ref note) = record.content {
        println!("  {:<16} {}", "Note", note);
    }
    println!();
}

/// Print a transaction as JSON.
fn print_record_json(record: &TransactionRecord) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}
