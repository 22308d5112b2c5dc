//! Development relay for the Uno Pow Zero document store.
//!
//! Hosts one in-memory [`MemoryStore`] and relays it to clients over
//! WebSocket, next to the static web build.
//!
//! | Path         | Purpose                                            |
//! |--------------|----------------------------------------------------|
//! | `/ws`        | Store protocol (`uno_core::protocol`) per socket   |
//! | `/api/rooms` | JSON array of existing room keys                   |
//! | anything else| Files from `STATIC_DIR`, else `index.html`         |

mod relay;
mod ws_handler;

use std::net::SocketAddr;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::EnvFilter;
use uno_core::memory_store::MemoryStore;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STATIC_DIR: &str = "./dist";

/// Settings read from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Config {
    port: u16,
    static_dir: String,
}

impl Config {
    fn from_env() -> Self {
        Self::from_vars(std::env::var("PORT").ok(), std::env::var("STATIC_DIR").ok())
    }

    /// An unparsable port falls back to the default rather than aborting.
    fn from_vars(port: Option<String>, static_dir: Option<String>) -> Self {
        let port = match port.as_deref().map(str::parse) {
            Some(Ok(port)) => port,
            Some(Err(_)) => {
                tracing::warn!(?port, "ignoring invalid PORT");
                DEFAULT_PORT
            }
            None => DEFAULT_PORT,
        };
        Self {
            port,
            static_dir: static_dir.unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()),
        }
    }

    fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn app(store: MemoryStore, static_dir: &str) -> Router {
    // Client-side routes such as `/ABCD/game` have no file; they get the app.
    let spa = ServeDir::new(static_dir)
        .not_found_service(ServeFile::new(format!("{static_dir}/index.html")));

    Router::new()
        .route("/ws", get(upgrade))
        .route("/api/rooms", get(list_rooms))
        .layer(CorsLayer::permissive())
        .with_state(store)
        .fallback_service(spa)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let addr = config.addr();
    let router = app(MemoryStore::new(), &config.static_dir);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, static_dir = %config.static_dir, "document relay up");
    axum::serve(listener, router).await?;
    Ok(())
}

async fn upgrade(ws: WebSocketUpgrade, State(store): State<MemoryStore>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_handler::handle_socket(socket, store))
}

async fn list_rooms(State(store): State<MemoryStore>) -> Json<Vec<String>> {
    Json(store.room_ids().iter().map(ToString::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uno_core::docs::{RoomDoc, RoomId};

    #[test]
    fn config_defaults_and_overrides() {
        assert_eq!(
            Config::from_vars(None, None),
            Config {
                port: DEFAULT_PORT,
                static_dir: DEFAULT_STATIC_DIR.into()
            }
        );
        let config = Config::from_vars(Some("9000".into()), Some("/srv/uno".into()));
        assert_eq!(config.port, 9000);
        assert_eq!(config.static_dir, "/srv/uno");
        assert_eq!(config.addr().port(), 9000);
        assert_eq!(Config::from_vars(Some("http".into()), None).port, DEFAULT_PORT);
    }

    #[tokio::test]
    async fn rooms_endpoint_lists_keys() {
        let store = MemoryStore::new();
        store
            .insert_room(&RoomDoc::new(RoomId::parse("ABCD").unwrap()))
            .unwrap();
        let Json(keys) = list_rooms(State(store)).await;
        assert_eq!(keys, vec!["ABCD".to_string()]);
    }
}
