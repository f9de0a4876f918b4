use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ops_dashboard::config::{Config, ConfigOverrides};
use ops_dashboard::output::json::render_json;
use ops_dashboard::output::table::render_dashboard_table;
use ops_dashboard::render::build_dashboard;
use ops_dashboard::server::{run_server, AppState};
use ops_dashboard::snapshot::cache::CachedSnapshotSource;
use ops_dashboard::snapshot::rest::RestSnapshotSource;
use ops_dashboard::snapshot::{Snapshot, SnapshotSource};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "ops-dashboard",
    about = "Auto-refreshing KPI panel for the latest operation snapshot"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Snapshot {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides::from_env());

    match cli.command {
        Commands::Config { init, show } => handle_config_command(init, show, &config, &config_path),
        Commands::Serve { host, port } => {
            config.apply_overrides(ConfigOverrides {
                host,
                port,
                ..ConfigOverrides::default()
            });
            let bind = format!("{}:{}", config.server.host, config.server.port);
            let addr: SocketAddr = bind
                .parse()
                .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
            let state = build_state(&config)?;
            info!(
                table = %config.source.table,
                ttl_secs = config.cache_ttl().as_secs(),
                refresh_secs = state.page.refresh_secs,
                "starting dashboard"
            );
            run_server(state, addr).await
        }
        Commands::Snapshot { output } => {
            let state = build_state(&config)?;
            let row = state
                .source
                .latest()
                .await
                .context("failed loading latest snapshot")?;
            let snapshot = row.map(|row| Snapshot::from_row(&row, &state.fields));
            let view = build_dashboard(snapshot.as_ref(), &state.page);
            match output {
                OutputFormat::Table => println!("{}", render_dashboard_table(&view)),
                OutputFormat::Json => println!("{}", render_json(&view)?),
            }
            Ok(())
        }
    }
}

fn build_state(config: &Config) -> Result<AppState> {
    let rest = RestSnapshotSource::new(&config.source).with_context(|| {
        format!(
            "set [source] in the config file or the {} / {} environment variables",
            ops_dashboard::config::DB_URL_ENV,
            ops_dashboard::config::DB_KEY_ENV
        )
    })?;
    let source: Arc<dyn SnapshotSource> =
        Arc::new(CachedSnapshotSource::new(rest, config.cache_ttl()));
    Ok(AppState {
        source,
        fields: config.fields.clone(),
        page: config.page_settings()?,
    })
}

fn handle_config_command(init: bool, show: bool, config: &Config, config_path: &Path) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}
