//! CLI for webdraw
//!
//! Subcommands:
//! - `server`: run the WebSocket relay
//! - `token`: print a signed token for a display name (jwt provider)
//! - `client`: connect, print replayed/live strokes, optionally send one

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{error, info};

use webdraw::auth::{self, JwtAuthenticator};
use webdraw::config::{Settings, load_config};
use webdraw::relay::Relay;
use webdraw::transport::start_websocket_server;
use webdraw::utils::{RelayError, logging};

#[derive(Parser)]
#[command(name = "webdraw", version, about = "Real-time drawing fan-out relay")]
enum Command {
    /// Start the WebSocket relay
    Server,
    /// Print a signed token for a user name
    Token {
        #[arg(long)]
        user: String,
        /// Token lifetime; defaults to `auth.token_ttl_secs`
        #[arg(long)]
        ttl_secs: Option<u64>,
    },
    /// Run a smoke-test client
    Client {
        #[arg(long, default_value = "ws://127.0.0.1:8888/ws")]
        url: String,
        #[arg(long)]
        token: Option<String>,
        /// JSON stroke to send after connecting, e.g. '["10.0","20.0",true]'
        #[arg(long)]
        stroke: Option<String>,
        /// How long to keep printing incoming strokes
        #[arg(long, default_value_t = 5)]
        listen_secs: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cmd = Command::parse();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&config.logging.level);

    let result = match cmd {
        Command::Server => run_server(config).await,
        Command::Token { user, ttl_secs } => run_token(&config, &user, ttl_secs),
        Command::Client {
            url,
            token,
            stroke,
            listen_secs,
        } => run_client(&url, token.as_deref(), stroke.as_deref(), listen_secs).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server(config: Settings) -> Result<(), RelayError> {
    let relay = Arc::new(Relay::from_settings(&config.relay));
    let authenticator = auth::from_settings(&config.auth);

    tokio::select! {
        res = start_websocket_server(&config.server, relay, authenticator) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
            Ok(())
        }
    }
}

fn run_token(config: &Settings, user: &str, ttl_secs: Option<u64>) -> Result<(), RelayError> {
    let authenticator = JwtAuthenticator::from_settings(&config.auth);
    let token = match ttl_secs {
        Some(ttl) => authenticator.issue_with_ttl(user, ttl)?,
        None => authenticator.issue(user)?,
    };
    println!("{token}");
    Ok(())
}

async fn run_client(
    url: &str,
    token: Option<&str>,
    stroke: Option<&str>,
    listen_secs: u64,
) -> Result<(), RelayError> {
    let url = match token {
        Some(token) if url.contains('?') => format!("{url}&token={token}"),
        Some(token) => format!("{url}?token={token}"),
        None => url.to_string(),
    };
    let (mut ws_stream, _response) = connect_async(url.as_str()).await?;
    info!("Connected to {url}");

    if let Some(stroke) = stroke {
        let payload: serde_json::Value = serde_json::from_str(stroke)?;
        ws_stream
            .send(WsMessage::text(payload.to_string()))
            .await?;
    }

    let listen = tokio::time::sleep(Duration::from_secs(listen_secs));
    tokio::pin!(listen);
    loop {
        tokio::select! {
            frame = ws_stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => println!("{}", text.as_str()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            _ = &mut listen => break,
        }
    }

    ws_stream.close(None).await?;
    Ok(())
}
