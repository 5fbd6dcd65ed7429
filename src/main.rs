use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use book_batch::{
    book::DEFAULT_MAX_PUBLISHED_YEAR,
    config::{JobParameters, parse_delimiter},
    core::{listener::LoggingStepListener, step::DEFAULT_CHUNK_SIZE},
    item::delimited::DEFAULT_LINES_TO_SKIP,
    jobs::{run_export, run_import},
};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{info, warn};
use sqlx::sqlite::SqlitePoolOptions;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "book-batch", version)]
#[command(about = "Imports and exports books between delimited files and a SQLite database")]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://books.db")]
    database_url: String,

    /// Number of books written per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    #[arg(long, short, help = "Enable verbose output")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Loads a delimited file into the Book table
    Import {
        #[arg(long)]
        input_file: PathBuf,

        #[arg(long, default_value = ";", value_parser = parse_delimiter)]
        delimiter: u8,

        #[arg(long, default_value_t = DEFAULT_LINES_TO_SKIP)]
        lines_to_skip: usize,

        /// Books published after this year are skipped
        #[arg(long, default_value_t = DEFAULT_MAX_PUBLISHED_YEAR)]
        max_published_year: i32,
    },
    /// Writes the Book table to a delimited file
    Export {
        #[arg(long)]
        output_file: PathBuf,

        #[arg(long, default_value = ",", value_parser = parse_delimiter)]
        delimiter: u8,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    let pool = SqlitePoolOptions::new()
        .connect(&cli.database_url)
        .await
        .with_context(|| format!("Unable to connect to {}", cli.database_url))?;

    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping before the next item");
            interrupt.cancel();
        }
    });

    let listener = LoggingStepListener;

    let execution = match cli.command {
        Command::Import {
            input_file,
            delimiter,
            lines_to_skip,
            max_published_year,
        } => {
            info!("Importing {}", input_file.display());
            let parameters = JobParameters {
                input_path: Some(input_file),
                chunk_size: cli.chunk_size,
                delimiter: Some(delimiter),
                lines_to_skip,
                max_published_year,
                ..Default::default()
            };
            run_import(&pool, &parameters, Some(token), &[&listener])?
        }
        Command::Export {
            output_file,
            delimiter,
        } => {
            info!("Exporting to {}", output_file.display());
            let parameters = JobParameters {
                output_path: Some(output_file),
                chunk_size: cli.chunk_size,
                delimiter: Some(delimiter),
                ..Default::default()
            };
            run_export(&pool, &parameters, Some(token), &[&listener])?
        }
    };

    println!("{}", serde_json::to_string_pretty(&execution)?);
    pool.close().await;

    Ok(if execution.is_completed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
