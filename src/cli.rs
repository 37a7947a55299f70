//! Command-line interface definitions.
//!
//! ```bash
//! # Create the cache (or check an existing one) and print where it lives
//! apod init
//!
//! # Cache an image that was downloaded some other way
//! apod add --date 2022-05-09 --title "NGC 3521: Galaxy in a Bubble" \
//!     --url https://apod.nasa.gov/apod/image/2205/NGC3521.jpg --file NGC3521.jpg
//!
//! # Cached titles, oldest first
//! apod list
//! ```

use apod_library::EntryId;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Content-addressable cache for Astronomy Picture of the Day images.
#[derive(Debug, Parser)]
#[command(name = "apod", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace). `RUST_LOG` wins.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Read configuration from this file instead of the default location.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the cached images and the metadata store.
    #[arg(long, value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the cache directory and metadata store, then print their location
    Init,
    /// Cache the bytes of an already downloaded APOD image
    Add(AddArgs),
    /// Show one cache entry
    Show {
        /// Entry id, as printed by `add` or `list`
        id: EntryId,
    },
    /// List cached titles in insertion order
    List,
    /// Check that the metadata store and the cache directory agree
    Verify,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Publication date (YYYY-MM-DD); defaults to today in UTC
    #[arg(long)]
    pub date: Option<String>,

    /// Title as published
    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = "")]
    pub explanation: String,

    /// URL the image was downloaded from; its extension names the cached file
    #[arg(long)]
    pub url: String,

    /// `image` or `video` (for videos, pass the thumbnail)
    #[arg(long, default_value = "image")]
    pub media_kind: String,

    /// Image file to cache, or `-` to read from stdin
    #[arg(long, value_name = "FILE")]
    pub file: PathBuf,
}
