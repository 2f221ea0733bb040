//! Core components and types for the home-bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Inbound events, pipeline envelopes, and reply payloads.

pub mod config;
pub mod types;
