//! Shopping list service integration for home-bot.
//!
//! The list service is a small remote API that keeps the household's current
//! shopping list. Command handlers talk to it through the `GenericListClient`
//! trait; the default implementation speaks JSON over HTTP.

pub mod http;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::base::types::{Res, Void};

// Types.

/// A single entry on a shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub name: String,
    pub quantity: u32,
    #[serde(default)]
    pub description: String,
}

/// The current shopping list as the list service reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    #[serde(default)]
    pub items: Vec<Item>,
    pub updated_at: Option<DateTime<Utc>>,
}

// Traits.

/// Generic list service trait that clients must implement.
///
/// Every failure (transport error or non-2xx status) is an `Err`; callers turn
/// it into a reply rather than propagating it.
#[async_trait]
pub trait GenericListClient: Send + Sync + 'static {
    /// Append an item to the current list.
    async fn append(&self, item: &Item) -> Void;

    /// Mark the current list as complete.
    async fn complete(&self) -> Void;

    /// Retrieve the current list.
    async fn retrieve(&self) -> Res<ShoppingList>;
}

// Structs.

/// List service client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ListClient {
    inner: Arc<dyn GenericListClient>,
}

impl Deref for ListClient {
    type Target = dyn GenericListClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ListClient {
    pub fn new(inner: Arc<dyn GenericListClient>) -> Self {
        Self { inner }
    }
}
