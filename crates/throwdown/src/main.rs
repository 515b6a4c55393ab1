//! Throwdown server binary.
//!
//! Run with:
//! ```not_rust
//! cargo run -p throwdown
//! PORT=3000 cargo run -p throwdown -- --rounds 5
//! ```

use std::time::Duration;

use clap::Parser;
use throwdown::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "throwdown")]
#[command(about = "Rock-paper-scissors matchmaking server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Rounds per match
    #[arg(long, default_value = "3")]
    rounds: u32,

    /// Pause between the second move and the round result, in milliseconds
    #[arg(long, default_value = "1000")]
    reveal_delay_ms: u64,
}

/// Installs the fmt subscriber. `RUST_LOG` overrides the default filter.
fn setup_logger(default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "throwdown={level},throwdown_room={level},throwdown_transport={level},tower_http={level}",
                    level = default_log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), ThrowdownError> {
    setup_logger("info");
    let args = Args::parse();

    let config = MatchConfig {
        rounds_per_match: args.rounds,
        reveal_delay: Duration::from_millis(args.reveal_delay_ms),
        ..MatchConfig::default()
    };

    let server = Server::builder()
        .bind(&format!("{}:{}", args.host, args.port))
        .match_config(config)
        .build()
        .await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
}
