//! Command-line entry point for tray databases.
//!
//! # Responsibility
//! - Verify `traygraph_core` linkage when run without a subcommand.
//! - Print, repair and import outlines in a SQLite tray database.

use clap::{Parser, Subcommand};
use futures::executor::block_on;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use traygraph_core::db::open_db;
use traygraph_core::{
    default_log_level, init_logging, render_markdown_outline, SqliteTrayStore, TrayGraphConfig,
    TrayService,
};

/// Absolute directory for rolling log files; logging stays off when unset.
const LOG_DIR_ENV: &str = "TRAYGRAPH_LOG_DIR";

#[derive(Parser, Debug)]
#[command(name = "traygraph_cli", version, about = "Tray graph maintenance utilities")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Print the markdown outline below a tray
    Outline {
        /// Database file, or a data directory holding the default file
        db: PathBuf,
        /// Tray id; the session root when omitted
        root: Option<String>,
    },
    /// Reconcile parent and child links below a tray
    Repair {
        /// Database file, or a data directory holding the default file
        db: PathBuf,
        /// Tray id; the session root when omitted
        root: Option<String>,
    },
    /// Import a markdown outline under a tray
    Import {
        /// Database file, or a data directory holding the default file
        db: PathBuf,
        /// Outline file with `- item` lines indented by two spaces
        file: PathBuf,
        /// Parent tray id; the session root when omitted
        parent: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("traygraph_core ping={}", traygraph_core::ping());
        println!("traygraph_core version={}", traygraph_core::core_version());
        return ExitCode::SUCCESS;
    };

    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match run(command, TrayGraphConfig::default()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            log::error!("event=cli_command module=cli status=error");
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: TrayGraphConfig) -> Result<(), String> {
    match command {
        Command::Outline { db, root } => with_service(&db, config, |service| {
            let root = resolve_root(service, root)?;
            let outline = block_on(render_markdown_outline(service.store(), &root));
            println!("{outline}");
            Ok(())
        }),
        Command::Repair { db, root } => with_service(&db, config, |service| {
            let root = resolve_root(service, root)?;
            let report = block_on(service.repair(&root)).map_err(|err| err.to_string())?;
            println!(
                "visited={} children_fixed={} parents_fixed={} missing={}",
                report.visited, report.children_fixed, report.parents_fixed, report.missing
            );
            Ok(())
        }),
        Command::Import { db, file, parent } => with_service(&db, config, |service| {
            let text = std::fs::read_to_string(&file)
                .map_err(|err| format!("cannot read `{}`: {err}", file.display()))?;
            let parent = resolve_root(service, parent)?;
            let written = block_on(service.import_markdown(&parent, &text))
                .map_err(|err| err.to_string())?;
            println!("imported={}", written.len());
            Ok(())
        }),
    }
}

type CliService<'conn> = TrayService<SqliteTrayStore<'conn>>;

/// A directory argument resolves to the configured database file inside it.
fn database_path(db: &Path, config: &TrayGraphConfig) -> PathBuf {
    if db.is_dir() {
        config.db_path(db)
    } else {
        db.to_path_buf()
    }
}

fn with_service(
    db: &Path,
    config: TrayGraphConfig,
    action: impl FnOnce(&CliService<'_>) -> Result<(), String>,
) -> Result<(), String> {
    let path = database_path(db, &config);
    let conn =
        open_db(&path).map_err(|err| format!("cannot open `{}`: {err}", path.display()))?;
    let store = SqliteTrayStore::try_new(&conn).map_err(|err| err.to_string())?;
    let service = TrayService::with_config(store, config);
    action(&service)
}

/// Explicit id, or the configured root (created on first use).
fn resolve_root(service: &CliService<'_>, explicit: Option<String>) -> Result<String, String> {
    match explicit {
        Some(id) => Ok(id),
        None => block_on(service.open_root())
            .map(|root| root.id)
            .map_err(|err| err.to_string()),
    }
}
