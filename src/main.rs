use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use woodpecker::train;
use woodpecker_core::notation::{read_games, write_games};
use woodpecker_core::{Config, Trainer};

#[derive(Parser)]
#[command(name = "woodpecker")]
#[command(about = "Spaced-repetition trainer for chess tactics")]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty database
    Init {
        /// Replace an existing database
        #[arg(long)]
        force: bool,
    },
    /// Append the games of PGN files to the staging queue
    Enqueue {
        files: Vec<PathBuf>,
    },
    /// Import from the staging queue (default: top up to the target pool size)
    Import {
        /// Take exactly this many candidates instead of topping up
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    /// Show the tactics due, in serving order
    Queue {
        #[arg(long)]
        json: bool,
    },
    /// Show pool size
    Stats,
    /// Train interactively (default)
    Train,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "woodpecker=info,woodpecker_core=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database = database;
    }

    match cli.command.unwrap_or(Commands::Train) {
        Commands::Init { force } => {
            if config.database.exists() {
                if !force {
                    bail!(
                        "{} already exists (use --force to replace it)",
                        config.database.display()
                    );
                }
                fs::remove_file(&config.database)
                    .with_context(|| format!("removing {}", config.database.display()))?;
            }
            let path = config.database.clone();
            Trainer::open(config)?;
            tracing::info!("created {}", path.display());
        }
        Commands::Enqueue { files } => {
            let mut added = Vec::new();
            for file in &files {
                let text = fs::read_to_string(file)
                    .with_context(|| format!("reading {}", file.display()))?;
                added.extend(read_games(&text));
            }
            append_to_staging(&config, &write_games(&added))?;
            tracing::info!(
                "queued {} games in {}",
                added.len(),
                config.staging.display()
            );
        }
        Commands::Import { count } => {
            let trainer = Trainer::open(config)?;
            let report = match count {
                Some(n) => Some(trainer.import(n)?),
                None => trainer.top_up()?,
            };
            match report {
                Some(report) => {
                    println!(
                        "examined {}, imported {}, duplicates {}, rejected {}",
                        report.examined,
                        report.imported,
                        report.duplicates.len(),
                        report.rejected.len()
                    );
                    for rejection in &report.rejected {
                        println!("  rejected {:?}: {}", rejection.catalogue, rejection.reason);
                    }
                }
                None => println!("pool is already full"),
            }
        }
        Commands::Queue { json } => {
            let trainer = Trainer::open(config)?;
            let queue = trainer.queue()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&queue)?);
            } else if queue.is_empty() {
                println!("nothing to practice");
            } else {
                for entry in &queue {
                    println!(
                        "#{:<8} {:>3}/{:<3}",
                        entry.id, entry.n_success, entry.n_attempts
                    );
                }
            }
        }
        Commands::Stats => {
            let trainer = Trainer::open(config)?;
            let stats = trainer.stats()?;
            println!("{}/{} tactics in rotation", stats.current, stats.total);
        }
        Commands::Train => {
            let mut trainer = Trainer::open(config)?;
            let stdin = io::stdin();
            train::run(&mut trainer, stdin.lock(), io::stdout())?;
        }
    }

    Ok(())
}

fn append_to_staging(config: &Config, text: &str) -> anyhow::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    if let Some(parent) = config.staging.parent() {
        fs::create_dir_all(parent)?;
    }
    let needs_separator = fs::metadata(&config.staging)
        .map(|m| m.len() > 0)
        .unwrap_or(false);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.staging)
        .with_context(|| format!("opening {}", config.staging.display()))?;
    if needs_separator {
        writeln!(file)?;
    }
    file.write_all(text.as_bytes())?;
    Ok(())
}
