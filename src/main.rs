//! Sentinel passthrough replay tool
//!
//! Replays a captured Anthropic response through the passthrough logging
//! core and prints the resulting `{result, kwargs}` pair as JSON.
//!
//! Usage: sentinel-passthrough <capture> [request.json]
//!
//! A capture starting with `{` is treated as a non-streamed response body;
//! anything else as an SSE transcript.

use std::env;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use tokio::signal;
use tracing::{info, warn};

use sentinel_passthrough::{metrics, Config, PassthroughLoggingHandler, RequestContext};

/// Size of the pieces a transcript is replayed in, to mimic transport chunking
const REPLAY_CHUNK_SIZE: usize = 512;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.log_json);
    metrics::init_metrics();

    let mut args = env::args().skip(1);
    let Some(capture_path) = args.next() else {
        bail!("usage: sentinel-passthrough <capture> [request.json]");
    };
    let request_body = match args.next() {
        Some(path) => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read request body {}", path))?;
            serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path))?
        }
        None => Value::Null,
    };

    let capture = tokio::fs::read(&capture_path)
        .await
        .with_context(|| format!("Failed to read capture {}", capture_path))?;

    let handler = PassthroughLoggingHandler::with_defaults(&config);
    let context = RequestContext::new("anthropic", "/v1/messages").with_request_body(request_body);
    let start_time = Utc::now();

    info!(
        call_id = %context.call_id,
        capture = %capture_path,
        bytes = capture.len(),
        "Replaying capture"
    );

    let first_byte = capture.iter().find(|b| !b.is_ascii_whitespace());
    let outcome = if first_byte == Some(&b'{') {
        let body: Value = serde_json::from_slice(&capture)
            .with_context(|| format!("Invalid JSON in {}", capture_path))?;
        handler.handle_non_streaming(&body, &context, start_time, Utc::now())?
    } else {
        let pieces: Vec<Result<Bytes, std::io::Error>> = capture
            .chunks(REPLAY_CHUNK_SIZE)
            .map(|piece| Ok(Bytes::copy_from_slice(piece)))
            .collect();

        tokio::select! {
            outcome = handler.handle_stream(futures::stream::iter(pieces), &context, start_time) => outcome?,
            _ = signal::ctrl_c() => {
                warn!("Received Ctrl+C, abandoning replay");
                return Ok(());
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sentinel_passthrough=info".into());

    // Logs go to stderr so stdout stays valid JSON
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
