use tokio::net::TcpListener;

use roomcast::config::Config;
use roomcast::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomcast=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        git_sha = env!("GIT_SHA"),
        port = config.port,
        database = %config.database_url,
        outbound_capacity = config.gateway.outbound_capacity,
        idle_timeout = ?config.gateway.idle_timeout,
        write_timeout = ?config.gateway.write_timeout,
        "starting roomcast"
    );

    let db = match roomcast::db::create_pool(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("failed to open database: {e}");
            std::process::exit(1);
        }
    };

    let state = AppState::new(db, config.gateway.clone());
    let app = roomcast::routes::router(state);

    let listener = match TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(port = config.port, "failed to bind: {e}");
            std::process::exit(1);
        }
    };
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("listening on {addr}");
    }

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutting down");
    }
}
