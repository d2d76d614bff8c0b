use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use asset_admin_lib::cascade::{BlockedReport, DeactivationOutcome, PreviewReport};
use asset_admin_lib::config::{AppConfig, LogFormat};
use asset_admin_lib::{
    db, http, load_graph, logging, migrate, AppError, CascadeError, DeleteOptions, DeleteOutcome,
    DeletionReport, DeletionService,
};

/// Exit code used when dependents block a delete.
const BLOCKED_EXIT_CODE: i32 = 2;

#[derive(Debug, Parser)]
#[command(name = "asset-admin", about = "Facilities admin backend", version)]
struct Cli {
    /// SQLite database file (overrides ASSET_ADMIN_DB).
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// JSON dependency graph replacing the built-in one (overrides ASSET_ADMIN_GRAPH).
    #[arg(long, global = true)]
    graph: Option<PathBuf>,
    /// Log output format on stderr (overrides ASSET_ADMIN_LOG_FORMAT).
    #[arg(long, global = true)]
    log_format: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve {
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Apply pending schema migrations.
    Migrate {
        /// List applied migrations instead of applying.
        #[arg(long)]
        status: bool,
    },
    /// Inspect the dependency graph.
    #[command(subcommand)]
    Graph(GraphCommand),
    /// Show dependents of a record without changing anything.
    Check { entity: String, id: String },
    /// Delete a record.
    Delete {
        entity: String,
        id: String,
        /// Remove or unlink every dependent.
        #[arg(long)]
        cascade: bool,
        /// Deactivate instead when dependents block the delete.
        #[arg(long)]
        soft_fallback: bool,
    },
    /// Mark a record inactive.
    Deactivate { entity: String, id: String },
}

#[derive(Debug, Subcommand)]
enum GraphCommand {
    /// Validate the graph and report every issue.
    Validate,
    /// Print the graph as JSON.
    Show,
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let mut config = AppConfig::from_env().context("read configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(graph) = cli.graph {
        config.graph_path = Some(graph);
    }
    if let Some(format) = cli.log_format.as_deref() {
        config.log.format = format.parse::<LogFormat>()?;
    }
    let _log_guard = logging::init(&config.log)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;

    match cli.command {
        Commands::Graph(GraphCommand::Validate) => graph_validate(&config),
        Commands::Graph(GraphCommand::Show) => {
            let graph = load_graph(config.graph_path.as_deref())?;
            print_json(&graph.to_definition())?;
            Ok(0)
        }
        Commands::Migrate { status } => runtime.block_on(migrate_cmd(&config, status)),
        Commands::Serve { bind } => runtime.block_on(serve_cmd(&config, bind)),
        Commands::Check { entity, id } => runtime.block_on(check_cmd(&config, &entity, &id)),
        Commands::Delete {
            entity,
            id,
            cascade,
            soft_fallback,
        } => {
            let options = DeleteOptions {
                cascade,
                soft_fallback,
            };
            runtime.block_on(delete_cmd(&config, &entity, &id, options))
        }
        Commands::Deactivate { entity, id } => {
            runtime.block_on(deactivate_cmd(&config, &entity, &id))
        }
    }
}

async fn migrate_cmd(config: &AppConfig, status_only: bool) -> Result<i32> {
    let pool = db::open_pool(config).await?;
    if !status_only {
        migrate::apply_migrations(&pool).await?;
    }
    let applied = migrate::applied_migrations(&pool).await?;
    pool.close().await;
    print_json(&applied)?;
    Ok(0)
}

async fn serve_cmd(config: &AppConfig, bind: Option<SocketAddr>) -> Result<i32> {
    let service = open_service(config).await?;
    http::serve(service, bind.unwrap_or(config.bind)).await?;
    Ok(0)
}

async fn check_cmd(config: &AppConfig, entity: &str, id: &str) -> Result<i32> {
    let service = open_service(config).await?;
    let result = service.preview(entity, id).await;
    service.pool().close().await;
    report::<PreviewReport>(result)
}

#[derive(Serialize)]
#[serde(untagged)]
enum DeleteBody {
    Deleted(DeletionReport),
    Deactivated(DeactivationOutcome),
}

async fn delete_cmd(
    config: &AppConfig,
    entity: &str,
    id: &str,
    options: DeleteOptions,
) -> Result<i32> {
    let service = open_service(config).await?;
    let result = service.delete(entity, id, options).await;
    service.pool().close().await;
    report(result.map(|outcome| match outcome {
        DeleteOutcome::Deleted(summary) => DeleteBody::Deleted(DeletionReport::from(&summary)),
        DeleteOutcome::Deactivated(outcome) => DeleteBody::Deactivated(outcome),
    }))
}

async fn deactivate_cmd(config: &AppConfig, entity: &str, id: &str) -> Result<i32> {
    let service = open_service(config).await?;
    let result = service.deactivate(entity, id).await;
    service.pool().close().await;
    report(result)
}

fn graph_validate(config: &AppConfig) -> Result<i32> {
    match load_graph(config.graph_path.as_deref()) {
        Ok(graph) => {
            print_json(&json!({
                "valid": true,
                "version": graph.version(),
                "entities": graph.len(),
                "edges": graph.entities().map(|e| e.edges.len()).sum::<usize>(),
            }))?;
            Ok(0)
        }
        Err(err) => {
            let issues: Vec<String> = err.issues().iter().map(ToString::to_string).collect();
            print_json(&json!({
                "valid": false,
                "error": err.to_string(),
                "issues": issues,
            }))?;
            Ok(1)
        }
    }
}

async fn open_service(config: &AppConfig) -> Result<DeletionService> {
    let graph = load_graph(config.graph_path.as_deref())?;
    let pool = db::open_pool(config).await?;
    migrate::apply_migrations(&pool)
        .await
        .context("apply migrations")?;
    Ok(DeletionService::new(pool, graph))
}

/// Print a successful result, or the error in the same shape the HTTP API
/// uses, and pick the exit code.
fn report<T: Serialize>(result: Result<T, CascadeError>) -> Result<i32> {
    match result {
        Ok(body) => {
            print_json(&body)?;
            Ok(0)
        }
        Err(CascadeError::BlockedByDependents {
            entity,
            record_id,
            dependents,
            warnings,
        }) => {
            print_json(&BlockedReport::new(&entity, &record_id, &dependents, &warnings))?;
            Ok(BLOCKED_EXIT_CODE)
        }
        Err(err) => {
            let kind = err.kind();
            let app = AppError::from(err);
            print_json(&json!({
                "error": kind,
                "code": app.code,
                "message": app.message,
                "context": app.context,
            }))?;
            Ok(1)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{serialized}");
    Ok(())
}
