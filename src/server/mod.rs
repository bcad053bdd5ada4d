//! server
//!
//! HTTP surface over a [`RepositorySession`].
//!
//! # Routes
//!
//! | Verb | Path                  | Session operation                     |
//! |------|-----------------------|---------------------------------------|
//! | POST | `/set-repo-path`      | `set_repository_path`                 |
//! | POST | `/setup-user`         | `set_user_identity`                   |
//! | GET  | `/branches`           | `list_branches`                       |
//! | GET  | `/all-branches-files` | `list_all_branches_files`             |
//! | GET  | `/files/all`          | `list_all_files`                      |
//! | GET  | `/changed-files`      | `list_changed_files`                  |
//! | POST | `/commit`             | `commit`                              |
//! | GET  | `/commits`            | `list_commit_history`                 |
//! | POST | `/set-remote`         | `set_remote`                          |
//! | POST | `/push`               | `push`                                |
//! | GET  | `/session`            | `status`                              |
//! | GET  | `/healthz`            | none                                  |
//!
//! Every route answers with and without a trailing slash, at the root and
//! under `/api`. `/get-branches` is an alias of `/branches`. A known path
//! called with the wrong verb gets a 405 JSON envelope rather than axum's
//! empty default.
//!
//! # CORS
//!
//! Browser origins listed in `server.cors_allowed_origins` may call every
//! route; `"*"` admits any origin. Preflight `OPTIONS` requests are answered
//! by the CORS layer before routing, so they never reach the 405 fallbacks.

mod error;
mod handlers;

pub use error::ApiError;

use std::sync::Arc;

use axum::handler::Handler;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, MethodRouter};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::core::config::ServerSettings;
use crate::session::RepositorySession;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RepositorySession>,
}

fn get_route<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    get(handler).fallback(handlers::get_only)
}

fn post_route<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    post(handler).fallback(handlers::post_only)
}

fn routes() -> Router<AppState> {
    let table: [(&str, MethodRouter<AppState>); 13] = [
        ("/set-repo-path", post_route(handlers::set_repo_path)),
        ("/setup-user", post_route(handlers::setup_user)),
        ("/branches", get_route(handlers::branches)),
        ("/get-branches", get_route(handlers::branches)),
        ("/all-branches-files", get_route(handlers::all_branches_files)),
        ("/files/all", get_route(handlers::all_files)),
        ("/changed-files", get_route(handlers::changed_files)),
        ("/commit", post_route(handlers::commit)),
        ("/commits", get_route(handlers::commits)),
        ("/set-remote", post_route(handlers::set_remote)),
        ("/push", post_route(handlers::push)),
        ("/session", get_route(handlers::session_status)),
        ("/healthz", get_route(handlers::health)),
    ];

    table
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| {
            router
                .route(&format!("{}/", path), method_router.clone())
                .route(path, method_router)
        })
}

fn cors_layer(server: &ServerSettings) -> CorsLayer {
    let origins = if server.allows_any_origin() {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = server
            .cors_allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(%origin, error = %e, "ignoring CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Build the application router.
pub fn create_router(session: Arc<RepositorySession>, server: &ServerSettings) -> Router {
    Router::new()
        .merge(routes())
        .nest("/api", routes())
        .layer(cors_layer(server))
        .with_state(AppState { session })
}

/// Serve on `listener` until SIGINT or SIGTERM.
pub async fn serve(
    listener: TcpListener,
    session: Arc<RepositorySession>,
    server: &ServerSettings,
) -> std::io::Result<()> {
    let app = create_router(session, server);
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "listening");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
