use mimalloc::MiMalloc;
use school_directory::config::{CONFIG, Config, StorageBackend};
use school_directory::router::{DirectoryState, directory_router};
use school_directory::storage::{self, LocalImageStorage};
use school_directory::{SchoolService, db};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    Config::load()?;
    let cfg = &*CONFIG;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        listen_addr = %cfg.basic.listen_addr,
        storage = ?cfg.storage.backend,
        max_image_bytes = cfg.storage.max_image_bytes,
        require_location = cfg.schools.require_location,
        loglevel = %cfg.basic.loglevel,
    );

    let store = db::global().await?.clone();
    let images = storage::from_config(&cfg.storage)?;
    let service = SchoolService::new(
        store,
        images,
        cfg.storage.max_image_bytes,
        cfg.schools.require_location,
    );

    let mut state = DirectoryState::new(service);
    if cfg.storage.backend == StorageBackend::Local {
        let local = &cfg.storage.local;
        info!(dir = %local.dir.display(), prefix = %local.url_prefix, "serving local uploads");
        state = state.with_local_uploads(LocalImageStorage::new(
            local.dir.clone(),
            local.url_prefix.clone(),
        ));
    }
    let app = directory_router(state);

    let listener = TcpListener::bind(cfg.basic.listen_addr.as_str()).await?;
    info!("HTTP server listening on {}", cfg.basic.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
