//! Library root for `home-bot`.
//!
//! Home-bot is a Slack bot for a household shopping list. It:
//! - Listens for messages that mention it
//! - Dispatches the command after the mention (`help`, `whoami`, `list`, `add`, `done`)
//! - Posts each reply back to the conversation it came from
//!
//! Receiving, executing, and replying run as three concurrent stages joined by
//! single-slot channels, so a slow stage holds back the one before it and
//! replies always leave in the order their commands arrived.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the home-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with the chat and list clients
/// - Runs the pipeline until the transport stops or the credentials are rejected
pub async fn start(config: Config) -> Void {
    info!("Starting home-bot ...");

    // Start the crypto provider.
    crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install the default crypto provider."))?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config)?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
