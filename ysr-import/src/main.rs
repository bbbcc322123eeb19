//! ysr-import - Spreadsheet import microservice
//!
//! Accepts participant and program spreadsheets from staff with import
//! rights, extracts structured records, validates them, and saves them
//! without duplicating identification numbers or program names.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};
use ysr_common::config::{
    default_config_path, load_toml_config, resolve_root_folder, write_toml_config,
    CompiledDefaults, RootFolder, TomlConfig,
};
use ysr_common::models::Role;

use ysr_import::config::{resolve_openai_api_key, ExtractorKind, ImportConfig, OpenAiConfig};
use ysr_import::AppState;

/// Command-line arguments for ysr-import
#[derive(Parser, Debug)]
#[command(name = "ysr-import")]
#[command(about = "Spreadsheet import service for youth-services records")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "YSR_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the database and temporary uploads
    #[arg(short, long, global = true, env = "YSR_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, global = true, env = "YSR_BIND")]
    bind: Option<String>,

    /// Record extractor: "openai" or "columns"
    #[arg(long, global = true, env = "YSR_EXTRACTOR")]
    extractor: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create a staff member and print its bearer token
    AddStaff {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// admin, manager or staff
        #[arg(long)]
        role: Role,
    },
    /// Store the OpenAI API key in the database
    SetOpenaiKey {
        key: String,
    },
    /// Write a configuration file with the current settings
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .or_else(default_config_path)
        .context("Could not determine a configuration file location")?;
    // Info until the TOML is loaded; RUST_LOG overrides the configured level
    let env_filter = EnvFilter::try_from_default_env().ok();
    let level_from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| log_filter("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let toml_config = load_toml_config(&config_path)?;
    if !level_from_env {
        filter_handle
            .reload(log_filter(&toml_config.logging.level))
            .context("Failed to apply configured log level")?;
    }

    let root = RootFolder::new(resolve_root_folder(
        args.root_folder.as_deref(),
        &toml_config,
    ));

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            serve(
                &root,
                &toml_config,
                args.bind.as_deref(),
                args.extractor.as_deref(),
            )
            .await
        }
        Command::AddStaff { name, email, role } => {
            let pool = open_database(&root).await?;
            let (staff, token) =
                ysr_common::db::staff::create_staff(&pool, &name, &email, role).await?;
            println!("Created {} ({}) with role {}", staff.name, staff.id, staff.role);
            println!("Bearer token (shown once): {}", token);
            Ok(())
        }
        Command::SetOpenaiKey { key } => {
            if !ysr_import::config::is_valid_key(&key) {
                anyhow::bail!("OpenAI API key must not be empty");
            }
            let pool = open_database(&root).await?;
            ysr_common::db::settings::set_openai_api_key(&pool, key.trim()).await?;
            println!("OpenAI API key stored in {}", root.database_path().display());
            Ok(())
        }
        Command::InitConfig { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to replace it)",
                    config_path.display()
                );
            }
            let defaults = CompiledDefaults::for_current_platform();
            let written = TomlConfig {
                root_folder: Some(root.path().to_path_buf()),
                bind_address: Some(
                    args.bind
                        .or(toml_config.bind_address.clone())
                        .unwrap_or(defaults.bind_address),
                ),
                ..toml_config
            };
            write_toml_config(&written, &config_path)?;
            println!("Wrote {}", config_path.display());
            Ok(())
        }
    }
}

async fn open_database(root: &RootFolder) -> Result<sqlx::SqlitePool> {
    root.ensure_directories()
        .context("Failed to initialize root folder")?;
    let db_path = root.database_path();
    info!("Database: {}", db_path.display());
    let pool = ysr_common::db::init_database_pool(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    Ok(pool)
}

async fn serve(
    root: &RootFolder,
    toml_config: &TomlConfig,
    cli_bind: Option<&str>,
    cli_extractor: Option<&str>,
) -> Result<()> {
    info!("Starting ysr-import (spreadsheet import) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Root folder: {}", root.path().display());

    let pool = open_database(root).await?;
    info!("Database connection established");

    let import_config = ImportConfig::resolve(cli_extractor, toml_config)?;
    let openai = match import_config.extractor {
        ExtractorKind::OpenAi => {
            let api_key = resolve_openai_api_key(&pool, toml_config).await?;
            Some(OpenAiConfig::from_toml(api_key, toml_config))
        }
        ExtractorKind::Columns => None,
    };
    let extractor = ysr_import::build_extractor(import_config.extractor, openai)?;
    info!("Extractor: {}", extractor.name());

    let state = AppState::new(pool, extractor, root.uploads_path(), &import_config);
    let app = ysr_import::build_router(state);

    let bind = cli_bind
        .map(str::to_string)
        .or_else(|| toml_config.bind_address.clone())
        .unwrap_or_else(|| CompiledDefaults::for_current_platform().bind_address);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

/// Default filter for this service's crates at one level
fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "ysr_import={level},ysr_common={level},tower_http={level}"
    ))
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_missing_config_warning_logged_before_level_applied() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let (filter, handle) = reload::Layer::new(log_filter("info"));
        let subscriber = tracing_subscriber::registry().with(filter).with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(move || writer.clone()),
        );

        tracing::subscriber::with_default(subscriber, || {
            let dir = tempfile::tempdir().unwrap();
            load_toml_config(&dir.path().join("missing.toml")).unwrap();

            handle.reload(log_filter("error")).unwrap();
            tracing::warn!(target: "ysr_common::config", "hidden at error level");
        });

        let output = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Config file not found"), "{}", output);
        assert!(!output.contains("hidden at error level"), "{}", output);
    }
}
