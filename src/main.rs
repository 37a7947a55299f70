mod cli;
mod error;

use crate::cli::{AddArgs, Cli, Command};
use crate::error::{ErrorKind, Result};
use apod_config::{Config, Overrides};
use apod_content::models::{ApodDate, ApodMetadata, MediaKind};
use apod_library::{CacheHandle, EntryId};
use clap::Parser;
use exn::ResultExt;
use std::path::Path;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        },
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let overrides = Overrides {
        config_file: cli.config,
        cache_dir: cli.cache_dir,
    };
    let config = Config::load(&overrides).or_raise(|| ErrorKind::Config)?;
    let handle = CacheHandle::initialize(&config.cache_dir, &config.database_file)
        .await
        .or_raise(|| ErrorKind::Open)?;
    let result = dispatch(&handle, cli.command).await;
    handle.close().await;
    result
}

async fn dispatch(handle: &CacheHandle, command: Command) -> Result<ExitCode> {
    match command {
        Command::Init => {
            println!("{}", handle.directory().display());
            if let Some(database) = handle.database_path() {
                println!("{}", database.display());
            }
        },
        Command::Add(args) => add(handle, args).await?,
        Command::Show { id } => return show(handle, id).await,
        Command::List => {
            let entries = handle.repository().list_entries().await.or_raise(|| ErrorKind::Cache)?;
            for entry in entries {
                println!("{}\t{}", entry.id, entry.title);
            }
        },
        Command::Verify => return verify(handle).await,
    }
    Ok(ExitCode::SUCCESS)
}

async fn add(handle: &CacheHandle, args: AddArgs) -> Result<()> {
    let date = match args.date.as_deref() {
        Some(date) => date.parse::<ApodDate>().or_raise(|| ErrorKind::Argument("--date"))?,
        None => ApodDate::today(),
    };
    let media_kind = args.media_kind.parse::<MediaKind>().or_raise(|| ErrorKind::Argument("--media-kind"))?;
    let bytes = read_input(&args.file).await?;
    let metadata = ApodMetadata {
        date,
        title: args.title,
        explanation: args.explanation,
        image_url: args.url,
        media_kind,
    };
    let addition = apod_library::add_or_get(handle, &metadata, bytes).await.or_raise(|| ErrorKind::Cache)?;
    println!("{}\t{}", addition.id(), if addition.is_new() { "stored" } else { "already cached" });
    Ok(())
}

async fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut bytes = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut bytes)
            .await
            .or_raise(|| ErrorKind::Input(path.to_path_buf()))?;
        return Ok(bytes);
    }
    tokio::fs::read(path).await.or_raise(|| ErrorKind::Input(path.to_path_buf()))
}

async fn show(handle: &CacheHandle, id: EntryId) -> Result<ExitCode> {
    let Some(entry) = apod_library::get_by_id(handle, id).await.or_raise(|| ErrorKind::Cache)? else {
        eprintln!("No cache entry with id {id}");
        return Ok(ExitCode::FAILURE);
    };
    println!("title:       {}", entry.title);
    println!("file:        {}", entry.file_path.display());
    println!("sha256:      {}", entry.sha256);
    println!("explanation: {}", entry.explanation);
    Ok(ExitCode::SUCCESS)
}

async fn verify(handle: &CacheHandle) -> Result<ExitCode> {
    let report = apod_library::verify(handle).await.or_raise(|| ErrorKind::Cache)?;
    for entry in &report.missing {
        println!("missing\t{}\t{}", entry.id, entry.file_path.display());
    }
    for entry in &report.corrupted {
        println!("corrupted\t{}\t{}", entry.id, entry.file_path.display());
    }
    for path in &report.orphans {
        println!("orphan\t{}", path.display());
    }
    for path in &report.stale_temporaries {
        println!("temporary\t{}", path.display());
    }
    println!("{} entries checked, {} bytes unreferenced", report.entries, report.unreferenced_bytes);
    Ok(if report.is_consistent() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
