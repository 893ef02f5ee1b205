//! Auth Center demo API server binary.
//!
//! Serves the login/refresh/logout endpoints and the demo protected API
//! backed by the in-memory demo directory. Prints `{"port": N}` to stdout
//! once bound so a parent process can discover the port.

use std::sync::Arc;
use std::time::Duration;

use authcenter_api::AppState;
use authcenter_api::config::ApiConfig;
use authcenter_core::AuthCenter;
use authcenter_core::auth::directory::InMemoryUserDirectory;
use authcenter_core::auth::store::InMemoryTokenStore;
use clap::Parser;
use tracing::{debug, info};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "authcenter_server", about = "Auth Center demo API server")]
struct Args {
    /// Port to listen on on 127.0.0.1 (0 = ephemeral). Overrides `BIND_ADDR`.
    #[arg(long)]
    port: Option<u16>,

    /// Issue and accept refresh tokens (`--refresh-enabled [true|false]`).
    /// Wins over the `JWT_REFRESH_ENABLED` value read by the JWT config.
    #[arg(
        long,
        env = "JWT_REFRESH_ENABLED",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    refresh_enabled: Option<bool>,

    /// Seconds between sweeps of expired revocation entries.
    #[arg(long, env = "REVOCATION_SWEEP_SECS", default_value_t = 300)]
    sweep_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Write logs to stderr so stdout is reserved for the JSON port message.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,authcenter_api=debug,authcenter_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env()?;
    if let Some(port) = args.port {
        config.bind_addr = format!("127.0.0.1:{port}");
    }
    if let Some(enabled) = args.refresh_enabled {
        config.jwt.refresh_enabled = enabled;
    }
    info!(jwt = ?config.jwt, bind_addr = %config.bind_addr, "starting authcenter_server");

    let store = Arc::new(InMemoryTokenStore::new());
    let auth = AuthCenter::builder()
        .config(config.jwt.clone())
        .directory(Arc::new(InMemoryUserDirectory::demo()))
        .store(store.clone())
        .build()?;

    if args.sweep_secs > 0 {
        let period = Duration::from_secs(args.sweep_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let purged = store.purge_expired();
                if purged > 0 {
                    debug!(purged, remaining = store.len(), "swept expired revocations");
                }
            }
        });
    }

    let state = AppState {
        auth,
        config: config.clone(),
    };
    let app = authcenter_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;

    // Report the bound port as JSON on stdout.
    println!("{}", serde_json::json!({ "port": local_addr.port() }));

    info!(addr = %local_addr, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
