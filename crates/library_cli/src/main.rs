//! `library`: command-line access to the catalog database.
//!
//! Output is JSON on stdout; diagnostics go to the log files configured
//! under `[logging]`.

mod args;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

use args::{Cli, Commands};
use library_core::db::migrations::current_user_version;
use library_core::{
    init_from_config, load_demo_catalog, open_db_in_memory, open_db_with, BookDefinitionRepository,
    CatalogService, ConfigError, DbError, LibraryConfig, LoggingError, PublisherRepository,
    RepoError, SecondLevelCache, Session, SqliteBookDefinitionRepository,
    SqlitePublisherRepository,
};

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = LibraryConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database.path = Some(db);
    }
    init_from_config(&config.logging)?;

    let mut conn = open_connection(&config)?;
    if let Commands::Seed = cli.command {
        if config.database.path.is_some() {
            load_demo_catalog(&mut conn)?;
        }
        return print_json(&serde_json::json!({ "seeded": "demo_catalog" }));
    }

    let cache = Arc::new(SecondLevelCache::new(&config.cache));
    let session = Session::try_new(&conn, cache)?;
    let service = CatalogService::new(&session);

    match cli.command {
        Commands::Init | Commands::Stats => {
            let books = SqliteBookDefinitionRepository::new(&session).count()?;
            print_json(&serde_json::json!({
                "schema_version": current_user_version(&conn)?,
                "book_definitions": books,
            }))?;
        }
        Commands::Seed => {}
        Commands::Books => {
            print_json(&SqliteBookDefinitionRepository::new(&session).find_all()?)?;
        }
        Commands::Publisher { id, eager } => {
            let publisher = if eager {
                Some(service.publisher_catalog(id)?)
            } else {
                SqlitePublisherRepository::new(&session).find_by_id(id)?
            };
            let publisher = publisher.ok_or(CliError::NotFound {
                entity: "publisher",
                id,
            })?;
            print_json(&publisher)?;
        }
        Commands::Author { id } => print_json(&service.author_bibliography(id)?)?,
        Commands::Lend { instance, user } => {
            print_json(&service.lend_instance(instance, user)?)?;
        }
        Commands::Return { instance } => print_json(&service.return_instance(instance)?)?,
    }

    if cli.stats {
        print_stats(&session)?;
    }
    Ok(())
}

/// File database when configured, otherwise a seeded in-memory catalog.
fn open_connection(config: &LibraryConfig) -> Result<Connection, CliError> {
    match config.database.path.as_deref() {
        Some(path) => Ok(open_db_with(path, &config.database)?),
        None => {
            let mut conn = open_db_in_memory()?;
            load_demo_catalog(&mut conn)?;
            info!("event=cli_open module=cli status=ok mode=memory fixture=demo_catalog");
            Ok(conn)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_stats(session: &Session<'_>) -> Result<(), CliError> {
    let stats = serde_json::json!({
        "sql": session.statistics().snapshot(),
        "cache": session.cache().statistics(),
    });
    eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
