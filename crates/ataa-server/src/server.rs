use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    auth::require_auth,
    handlers::{
        create_hero, create_initiative, create_message, create_program, delete_hero,
        delete_initiative, delete_message, delete_program, get_about, get_contact, get_content,
        get_donate, get_mission, get_vision, get_volunteer, health, list_hero, list_initiatives,
        list_messages, list_programs, login, put_about, put_contact, put_donate, put_mission,
        put_vision, put_volunteer, update_hero, update_initiative, update_program,
        verify_session,
    },
    token::{TokenService, DEFAULT_TTL_SECS},
    AppState,
};

/// Placeholder secret used when $ATAA_SECRET is unset. Fine for local
/// development, useless in production: anyone holding it can mint tokens.
pub const DEV_SECRET: &str = "ataa-dev-secret";

/// Password the admin credential is seeded with when $ATAA_ADMIN_PASSWORD is
/// unset. Operators rotate it with `ataa hash-password`.
pub const DEV_ADMIN_PASSWORD: &str = "admin123";

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Token signing secret ($ATAA_SECRET).
    pub secret: Option<String>,
    /// Password the admin credential is seeded with ($ATAA_ADMIN_PASSWORD).
    pub admin_password: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub cors_origins: Option<String>,
    /// Dashboard token lifetime in seconds ($ATAA_TOKEN_TTL_SECS).
    pub token_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("ATAA_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("ATAA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(4100),
            secret: std::env::var("ATAA_SECRET").ok(),
            admin_password: std::env::var("ATAA_ADMIN_PASSWORD").ok(),
            data_dir: std::env::var("ATAA_DATA_DIR").ok().map(PathBuf::from),
            cors_origins: std::env::var("ATAA_CORS_ORIGINS").ok(),
            token_ttl_secs: std::env::var("ATAA_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TTL_SECS),
        }
    }
}

/// Resolve the data directory holding `content.json`.
/// Public so CLI commands can point at the same document.
pub fn resolve_data_dir(data_dir: Option<&PathBuf>) -> Result<PathBuf> {
    match data_dir {
        Some(d) => {
            std::fs::create_dir_all(d).context("create data dir")?;
            Ok(d.clone())
        }
        None => crate::dirs::data_dir(),
    }
}

pub async fn run(cfg: ServerConfig) -> Result<()> {
    let data_dir = resolve_data_dir(cfg.data_dir.as_ref())?;
    info!(data_dir = %data_dir.display(), "using data directory");

    let secret = cfg.secret.filter(|s| !s.is_empty()).unwrap_or_else(|| {
        warn!("ATAA_SECRET is not set — using the built-in dev secret");
        DEV_SECRET.to_owned()
    });
    let admin_password = cfg
        .admin_password
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| {
            warn!("ATAA_ADMIN_PASSWORD is not set — seeding with the dev password");
            DEV_ADMIN_PASSWORD.to_owned()
        });

    // Opening the store seeds and heals the document, so the admin credential
    // exists before the first request.
    let content_path = data_dir.join("content.json");
    let store = crate::store::Store::open(&content_path, admin_password).context("open store")?;

    let state = AppState {
        store,
        tokens: TokenService::new(secret),
        token_ttl_secs: cfg.token_ttl_secs,
    };

    let cors = build_cors(cfg.cors_origins.as_deref());

    // Public routes (no auth required).
    let public = Router::new()
        .route("/health", get(health))
        .route("/api/content", get(get_content))
        .route("/api/messages", post(create_message))
        .route("/api/dashboard/auth/login", post(login));

    // Dashboard routes (bearer token required).
    let protected = Router::new()
        .route("/api/dashboard/auth/verify", get(verify_session))
        .route("/api/dashboard/about", get(get_about))
        .route("/api/dashboard/about", put(put_about))
        .route("/api/dashboard/contact", get(get_contact))
        .route("/api/dashboard/contact", put(put_contact))
        .route("/api/dashboard/vision", get(get_vision))
        .route("/api/dashboard/vision", put(put_vision))
        .route("/api/dashboard/mission", get(get_mission))
        .route("/api/dashboard/mission", put(put_mission))
        .route("/api/dashboard/donate", get(get_donate))
        .route("/api/dashboard/donate", put(put_donate))
        .route("/api/dashboard/volunteer", get(get_volunteer))
        .route("/api/dashboard/volunteer", put(put_volunteer))
        .route("/api/dashboard/hero", get(list_hero))
        .route("/api/dashboard/hero", post(create_hero))
        .route("/api/dashboard/hero/{id}", put(update_hero))
        .route("/api/dashboard/hero/{id}", delete(delete_hero))
        .route("/api/dashboard/initiatives", get(list_initiatives))
        .route("/api/dashboard/initiatives", post(create_initiative))
        .route("/api/dashboard/initiatives/{id}", put(update_initiative))
        .route("/api/dashboard/initiatives/{id}", delete(delete_initiative))
        .route("/api/dashboard/programs", get(list_programs))
        .route("/api/dashboard/programs", post(create_program))
        .route("/api/dashboard/programs/{id}", put(update_program))
        .route("/api/dashboard/programs/{id}", delete(delete_program))
        .route("/api/dashboard/messages", get(list_messages))
        .route("/api/dashboard/messages/{id}", delete(delete_message))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let app = Router::new()
        .merge(public)
        .merge(protected)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port")?;

    info!(%addr, "ataa server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind listener")?;

    axum::serve(listener, app).await.context("server error")
}

fn build_cors(origins: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::DELETE,
            http::Method::OPTIONS,
        ])
        .allow_headers(Any);

    match origins {
        Some(o) => {
            let origins: Vec<_> = o.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            cors.allow_origin(origins)
        }
        None => cors.allow_origin(Any),
    }
}
