//! # Rusty-Forum Binary
//!
//! The entry point that assembles the application based on compile-time features.

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use rf_api::handlers::AppState;
use rf_api::middleware::{cors_policy, security_headers, standard_middleware};
use rf_config::{LogSettings, Settings};
use rf_services::ForumService;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

// Feature-gated imports: This is the "Compiled-to-Order" magic
#[cfg(feature = "db-sqlite")]
use rf_db_sqlite::SqliteForumRepo;

#[cfg(feature = "auth-simple")]
use rf_auth_simple::StaticTokenProvider;

#[cfg(feature = "session-memory")]
use rf_session_memory::MemorySessionStore;

/// `RUST_LOG` wins over `log.filter`.
fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings.log);

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let repo = SqliteForumRepo::with_max_connections(&settings.database.url, settings.database.max_connections)
        .await
        .context("initializing SQLite")?;

    // 2. Initialize Identity Implementation
    #[cfg(feature = "auth-simple")]
    let identity = {
        use rf_core::models::Principal;
        use secrecy::ExposeSecret;

        StaticTokenProvider::from_grants(settings.auth.tokens.iter().map(|grant| {
            let principal = Principal { id: grant.user_id, username: grant.username.clone() };
            (principal, grant.token.expose_secret().to_string())
        }))
    };

    // 3. Initialize Session Implementation
    #[cfg(feature = "session-memory")]
    let sessions = MemorySessionStore::new();

    // 4. Wrap in AppState (Using dynamic dispatch for maximum flexibility)
    let state = web::Data::new(AppState {
        forum: ForumService::new(Arc::new(repo)),
        identity: Arc::new(identity),
        sessions: Arc::new(sessions),
    });

    let (host, port) = settings.bind_addr();
    info!(%host, port, "rusty-forum starting");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(standard_middleware())
            .wrap(security_headers())
            .wrap(cors_policy())
            .configure(rf_api::configure_routes)
    })
    .bind((host.as_str(), port))
    .with_context(|| format!("binding {host}:{port}"))?
    .run()
    .await
    .context("running HTTP server")
}
