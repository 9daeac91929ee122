use anyhow::{Context, Result};
use clap::Parser;
use meshcall::session::{RelayService, relay_router};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// WebSocket signaling relay for meshcall rooms.
#[derive(Parser)]
#[command(name = "meshcall-relay", version)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "MESHCALL_RELAY_ADDR", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Browser clients are served from other origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = relay_router(RelayService::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    info!("Relay listening on ws://{}/ws/{{room}}/{{partner_id}}", args.bind);

    axum::serve(listener, app).await.context("relay server failed")?;
    Ok(())
}
