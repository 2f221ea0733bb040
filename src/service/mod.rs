//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the services used by the home-bot:
//! - Chat services (e.g., Slack)
//! - The shopping list service (HTTP)
//!
//! Each service module defines both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod chat;
pub mod list;
