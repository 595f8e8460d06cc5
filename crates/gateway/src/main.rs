use std::sync::Arc;

use anyhow::Context;
use axum::routing::{delete, get, post};
use axum::Router;
use clap::{Parser, Subcommand};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

use cueso_domain::config::{Config, ConfigSeverity};
use cueso_driver::registry::ToolRegistry;
use cueso_gateway::state::AppState;
use cueso_gateway::{rest, ws};
use cueso_providers::ProviderRegistry;
use cueso_sessions::SessionStore;
use cueso_tools::DirectToolExecutor;
use cueso_toolserver_client::ToolServerManager;

/// cueso — a conversational control plane for Roku TVs.
#[derive(Debug, Parser)]
#[command(name = "cueso", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Parse the config file and report any errors.
    ConfigValidate,
    /// Print version information.
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            let config = load_config()?;
            init_tracing(&config);
            run_server(Arc::new(config)).await
        }
        Some(Command::ConfigValidate) => {
            let config = load_config()?;
            let issues = config.validate();
            for issue in &issues {
                println!("{issue}");
            }
            if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Version) => {
            println!("cueso {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Loads `CUESO_CONFIG` (default `config.toml`) if it exists, otherwise
/// falls back to defaults — a bare `cueso` binary should still start.
fn load_config() -> anyhow::Result<Config> {
    let path = std::env::var("CUESO_CONFIG").unwrap_or_else(|_| "config.toml".into());

    if std::path::Path::new(&path).exists() {
        let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
        toml::from_str(&raw).with_context(|| format!("parsing {path}"))
    } else {
        Ok(Config::default())
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.observability.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("cueso starting");

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }

    let llm = Arc::new(ProviderRegistry::from_config(&config.llm).context("initializing LLM providers")?);
    if llm.is_empty() {
        tracing::warn!("no LLM providers initialized — chat turns will fail until config.llm.providers is set");
    }

    let mut executors: Vec<Arc<dyn cueso_domain::ToolExecutor>> = Vec::new();
    if let Some(direct) = &config.tools.direct {
        let executor = DirectToolExecutor::new(
            direct.device_base_url.clone(),
            direct.search_base_url.clone(),
            direct.request_timeout_ms,
        )
        .context("initializing direct Roku-ECP tool executor")?;
        executors.push(Arc::new(executor));
        tracing::info!(device_base_url = %direct.device_base_url, "direct tool executor ready");
    }
    if !config.tools.remote_servers.is_empty() {
        let manager = ToolServerManager::from_config(&config.tools.remote_servers).await;
        tracing::info!(
            servers = manager.server_count(),
            tools = manager.tool_count(),
            "remote tool-servers connected"
        );
        executors.push(Arc::new(manager));
    }
    let tools = Arc::new(ToolRegistry::new(executors));
    tracing::info!(tools = tools.definitions().len(), "tool registry ready");

    let sessions = Arc::new(SessionStore::new(config.session_store.idle_eviction_minutes));

    {
        let sessions = sessions.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
            loop {
                interval.tick().await;
                let evicted = sessions.evict_idle();
                if evicted > 0 {
                    tracing::info!(evicted, "evicted idle sessions");
                }
            }
        });
    }

    let state = AppState { config: config.clone(), llm, tools, sessions };

    let app = Router::new()
        .route("/ws", get(ws::handler))
        .route("/v1/providers", get(rest::list_providers))
        .route("/v1/sessions", get(rest::list_sessions))
        .route("/v1/sessions/:id", get(rest::get_session))
        .route("/v1/sessions/:id", delete(rest::delete_session))
        .route("/v1/sessions/:id/reset", post(rest::reset_session))
        .layer(build_cors_layer(&config.server.cors))
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding to {addr}"))?;
    tracing::info!(addr = %addr, "cueso listening");

    axum::serve(listener, app).await.context("axum server error")?;
    Ok(())
}

fn build_cors_layer(cors: &cueso_domain::config::CorsConfig) -> CorsLayer {
    use axum::http::{header, Method};

    let allow_origin = if cors.allowed_origins.is_empty() {
        AllowOrigin::list(Vec::new())
    } else if cors.allowed_origins.len() == 1 && cors.allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\" — all origins allowed");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);
    } else {
        let parsed = cors
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect::<Vec<_>>();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
