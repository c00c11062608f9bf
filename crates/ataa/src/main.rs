use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "ataa", about = "Ataa (عطاء) — charity site content server", version)]
struct Cli {
    /// Ataa server URL (default: http://localhost:4100 or $ATAA_SERVER)
    #[arg(long, env = "ATAA_SERVER", default_value = "http://localhost:4100")]
    server: String,

    /// Dashboard bearer token for client commands ($ATAA_TOKEN)
    #[arg(long, env = "ATAA_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Ataa HTTP server
    Serve {
        /// Port to listen on (default: $ATAA_PORT or 4100)
        #[arg(long, env = "ATAA_PORT", default_value = "4100")]
        port: u16,
        /// Host to bind (default: $ATAA_HOST or 0.0.0.0)
        #[arg(long, env = "ATAA_HOST", default_value = "0.0.0.0")]
        host: String,
    },
    /// Obtain a dashboard token for an administrator credential
    Login {
        /// Administrator username
        #[arg(long, default_value = "admin")]
        username: String,
        /// Administrator password
        password: String,
    },
    /// List submitted contact messages (requires a token)
    Messages,
    /// Hash a password into the stored `salt:derivedKeyHex` form.
    /// Paste the output into the content file's credential to reset it.
    HashPassword {
        /// Plaintext password to hash
        password: String,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("ATAA_LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host } => cmd_serve(host, port).await,

        Commands::Login { username, password } => {
            cmd_login(&cli.server, &username, &password).await
        }

        Commands::Messages => {
            let token = require_token(&cli.token)?;
            cmd_messages(&cli.server, &token).await
        }

        Commands::HashPassword { password } => {
            println!("{}", ataa_server::token::hash_password(&password));
            Ok(())
        }
    }
}

// ── Command implementations ───────────────────────────────────────────────────

async fn cmd_serve(host: String, port: u16) -> Result<()> {
    let cfg = ataa_server::ServerConfig {
        host,
        port,
        ..Default::default()
    };

    ataa_server::run(cfg).await
}

async fn cmd_login(server: &str, username: &str, password: &str) -> Result<()> {
    let client = Client::new();
    let resp = client
        .post(format!(
            "{}/api/dashboard/auth/login",
            server.trim_end_matches('/')
        ))
        .json(&serde_json::json!({"username": username, "password": password}))
        .send()
        .await
        .context("HTTP request failed")?;

    let status = resp.status();
    let json: Value = resp.json().await.context("parse response")?;

    if status.is_success() {
        let token = json["token"].as_str().unwrap_or("");
        println!("{token}");
        Ok(())
    } else {
        let error = json["error"].as_str().unwrap_or("unknown error");
        anyhow::bail!("{error}");
    }
}

async fn cmd_messages(server: &str, token: &str) -> Result<()> {
    let client = Client::new();
    let resp = client
        .get(format!(
            "{}/api/dashboard/messages",
            server.trim_end_matches('/')
        ))
        .bearer_auth(token)
        .send()
        .await
        .context("HTTP request failed")?;

    if !resp.status().is_success() {
        let status = resp.status();
        anyhow::bail!("server returned {status}");
    }

    let messages: Vec<MessageItem> = resp.json().await.context("parse messages list")?;
    if messages.is_empty() {
        println!("(no messages)");
        return Ok(());
    }
    for m in &messages {
        println!("  [{}] {} <{}> — {}", m.id, m.name, m.email, m.message);
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn require_token(token: &Option<String>) -> Result<String> {
    token
        .clone()
        .context("--token / ATAA_TOKEN is required for this command")
}

#[derive(serde::Deserialize)]
struct MessageItem {
    id: i64,
    name: String,
    email: String,
    message: String,
}
