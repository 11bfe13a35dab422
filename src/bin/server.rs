//! WebSocket chat room server.
//!
//! Serves the chat room engine at the resource path named by the
//! configuration file's `space` URI.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin server -- --config chat-room.json
//! cargo run --bin server -- --host 0.0.0.0 --port 3000 --config chat-room.json
//! ```

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use chat_room_rs::{
    common::{diagnostics::TracingDiagnostics, logger::setup_logger, time::SystemClock},
    plugin,
    ui::Server,
};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "WebSocket chat room server with a math quiz bot", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Path to the JSON configuration handed to the chat room plugin
    #[arg(short = 'c', long)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let configuration = match std::fs::read_to_string(&args.config) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(configuration) => configuration,
            Err(error) => {
                tracing::error!("invalid JSON in {}: {error}", args.config.display());
                return ExitCode::FAILURE;
            }
        },
        Err(error) => {
            tracing::error!("cannot read {}: {error}", args.config.display());
            return ExitCode::FAILURE;
        }
    };

    let chat_room = match plugin::load(
        &configuration,
        Arc::new(SystemClock::new()),
        Arc::new(TracingDiagnostics),
    )
    .await
    {
        Ok(chat_room) => chat_room,
        Err(_) => {
            // The load already reported the configuration error.
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("chat room registered at /{}", chat_room.space());

    let server = Server::new(chat_room.router());
    if let Err(error) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {error}");
        return ExitCode::FAILURE;
    }

    chat_room.unload().await;
    ExitCode::SUCCESS
}
