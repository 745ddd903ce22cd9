//! Command-line surface for the `library` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "library", version, about = "Library catalog CLI", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, env = "LIBRARY_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database file; overrides `database.path`. Without one, an
    /// in-memory database seeded with the demo catalog is used.
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Print SQL statement counts and cache counters to stderr afterwards
    #[arg(long)]
    pub stats: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or migrate the database schema
    Init,
    /// Load the demo catalog
    Seed,
    /// List every book definition
    Books,
    /// Show one publisher
    Publisher {
        id: i64,
        /// Load all of the publisher's books in the same query
        #[arg(long)]
        eager: bool,
    },
    /// Show one author with every credited book
    Author { id: i64 },
    /// Lend a physical copy to a user
    Lend { instance: i64, user: i64 },
    /// Return a physical copy to its owner
    Return { instance: i64 },
    /// Show catalog size and schema version
    Stats,
}
