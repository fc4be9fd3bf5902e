//! API Server for Relay
//!
//! Thin HTTP adapters over the agent runtime: start, resume and message runs,
//! read them back, and manage presets. Listens on `RELAY_ADDR`
//! (default 0.0.0.0:8081).

mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_runtime::{OpenAiConfig, OpenAiProvider};
use relay_core::store::{StoreBackend, StoreConfig};

use crate::state::AppState;

const DEFAULT_ADDR: &str = "0.0.0.0:8081";

fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::runs::router())
        .merge(routes::presets::router())
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "api_server=debug,agent_runtime=debug,relay_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let provider_config = OpenAiConfig::from_env()
        .context("OPENAI_API_KEY is not set")?;
    tracing::info!("Using completion provider at {}", provider_config.base_url);
    let provider = Arc::new(OpenAiProvider::new(provider_config));

    let store_config = StoreConfig::from_env();
    match store_config.resolve() {
        Ok(StoreBackend::Supabase(cfg)) => {
            tracing::info!("Runs stored in Supabase at {}", cfg.url)
        }
        Ok(StoreBackend::Upstash(cfg)) => {
            tracing::info!("Runs stored in Upstash at {}", cfg.url)
        }
        Err(_) => tracing::warn!("No store in environment, requests must supply credentials"),
    }

    let state = AppState::new(store_config, provider);

    let addr: SocketAddr = std::env::var("RELAY_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
        .context("RELAY_ADDR is not a valid socket address")?;

    tracing::info!("REST API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
