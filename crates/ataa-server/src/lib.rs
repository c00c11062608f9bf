pub mod auth;
pub mod dirs;
pub mod handlers;
pub mod server;
pub mod store;
pub mod token;

/// Shared application state threaded through axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: store::Store,
    pub tokens: token::TokenService,
    /// Lifetime of issued dashboard tokens, in seconds.
    pub token_ttl_secs: u64,
}

pub use server::{resolve_data_dir, run, ServerConfig};
