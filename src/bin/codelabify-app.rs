use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;

use codelabify::app::cache_store::{CacheStore, SqliteCacheStore};
use codelabify::app::config::{
    ConverterConfig, DEFAULT_IMAGE_BASE_URL, DEFAULT_RECENT_LIMIT, DEFAULT_REQUIRED_PREFIX,
    DEFAULT_USER_AGENT,
};
use codelabify::app::converter::Converter;
use codelabify::app::fetch::HttpFetcher;
use codelabify::app::routes::{AppState, router};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: SocketAddr,

    /// SQLite cache database.
    #[arg(long, default_value = "db/codelabs.db")]
    db: PathBuf,

    /// Only URLs starting with this prefix are converted.
    #[arg(long, default_value = DEFAULT_REQUIRED_PREFIX)]
    required_prefix: String,

    /// Serve `img/` images from this base URL (empty disables rewriting).
    #[arg(long, default_value = DEFAULT_IMAGE_BASE_URL)]
    image_base_url: String,

    #[arg(long, default_value_t = 10)]
    fetch_timeout_secs: u64,

    /// Rows shown on `/views`.
    #[arg(long, default_value_t = DEFAULT_RECENT_LIMIT)]
    recent_limit: usize,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    codelabify::logging::init()?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting codelabify-app");

    let config = ConverterConfig {
        required_prefix: args.required_prefix,
        fetch_timeout: Duration::from_secs(args.fetch_timeout_secs.max(1)),
        user_agent: DEFAULT_USER_AGENT.to_owned(),
        image_base_url: None,
    }
    .with_image_base_url(&args.image_base_url)
    .with_env_overrides();
    tracing::info!(
        required_prefix = %config.required_prefix,
        image_base_url = ?config.image_base_url,
        "converter configured"
    );

    let store: Arc<dyn CacheStore> = Arc::new(
        SqliteCacheStore::open(&args.db)
            .with_context(|| format!("open cache db: {}", args.db.display()))?,
    );
    let fetcher = Arc::new(HttpFetcher::new(
        config.fetch_timeout,
        config.user_agent.clone(),
    )?);
    let state = AppState {
        converter: Arc::new(Converter::new(store, fetcher, config)),
        recent_limit: args.recent_limit,
    };

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutting down"),
        Err(err) => {
            tracing::error!(?err, "install ctrl-c handler; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
