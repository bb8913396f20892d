//! Pagemark CLI - Sync reading positions between an e-reader and a library

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use pagemark_core::config::CONFIG_ENV;
use pagemark_core::BookId;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse and validate a worker count (must be at least 1)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if n < 1 {
        Err("workers must be at least 1".to_string())
    } else {
        Ok(n)
    }
}

#[derive(Parser)]
#[command(name = "pagemark")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by `store` and `restore`
#[derive(Args)]
pub struct SyncArgs {
    /// Library file (JSON)
    library: PathBuf,

    /// Device database, overriding the configuration
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// Only sync these book ids (repeatable); defaults to the whole library
    #[arg(short, long = "book")]
    books: Vec<BookId>,

    /// Number of worker threads (must be at least 1)
    #[arg(short, long, value_parser = parse_workers)]
    workers: Option<usize>,

    /// Dispatch one job per book
    #[arg(long)]
    background: bool,

    /// Compute changes without writing them
    #[arg(long)]
    dry_run: bool,

    /// Print the batch report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Store device reading positions in the library
    Store {
        #[command(flatten)]
        sync: SyncArgs,

        /// Clear library columns for books the device has no bookmark for
        #[arg(long)]
        clear_if_unread: bool,

        /// Only store positions read more recently than the library records
        #[arg(long)]
        only_if_more_recent: bool,

        /// Leave books the library marks as finished
        #[arg(long)]
        skip_finished: bool,
    },

    /// Restore library reading positions to the device
    Restore {
        #[command(flatten)]
        sync: SyncArgs,

        /// Reset device positions to unread
        #[arg(long)]
        reset: bool,

        /// Keep the device last-read time instead of stamping the current time
        #[arg(long)]
        keep_last_read: bool,
    },

    /// Estimate how far into a book a bookmark is
    Percent {
        /// EPUB file
        book: PathBuf,

        /// Device bookmark, e.g. chapter1.xhtml#point(/1/4/2:10)
        mark: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a device bookmark against a book's spine
    Decode {
        /// EPUB file
        book: PathBuf,

        /// Device bookmark
        mark: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a device database for corruption
    Check {
        /// Database file; defaults to the configured device database
        database: Option<PathBuf>,

        /// Rename a corrupt database to *_CORRUPT
        #[arg(long)]
        quarantine: bool,
    },

    /// Back up the device database directory
    Backup {
        /// Database file; defaults to the configured device database
        database: Option<PathBuf>,

        /// Backup destination, overriding the configuration
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Backups to keep (0 keeps all), overriding the configuration
        #[arg(short, long)]
        keep: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "pagemark_cli=debug,pagemark_core=debug"
    } else {
        "pagemark_cli=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Store {
            sync,
            clear_if_unread,
            only_if_more_recent,
            skip_finished,
        } => {
            let mut policy = config.policy;
            policy.clear_if_device_unread |= clear_if_unread;
            policy.store_only_if_more_recent |= only_if_more_recent;
            policy.skip_if_library_finished |= skip_finished;
            commands::store(config, policy, &sync)
        }

        Commands::Restore {
            sync,
            reset,
            keep_last_read,
        } => {
            let mut policy = config.policy;
            policy.reset_position_on_restore |= reset;
            if keep_last_read {
                policy.stamp_now_on_restore = false;
            }
            commands::restore(config, policy, &sync)
        }

        Commands::Percent { book, mark, json } => commands::percent(&book, &mark, json),

        Commands::Decode { book, mark, json } => commands::decode(&book, &mark, json),

        Commands::Check {
            database,
            quarantine,
        } => commands::check(&config, database.as_deref(), quarantine),

        Commands::Backup {
            database,
            output_dir,
            keep,
        } => commands::backup(config, database.as_deref(), output_dir, keep),
    }
}
