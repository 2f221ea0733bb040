//! HTTP implementation of the list service client.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, info, instrument};

use crate::base::{
    config::Config,
    types::{Res, Void},
};

use super::{GenericListClient, Item, ListClient, ShoppingList};

// Extra methods on `ListClient` applied by the http implementation.

impl ListClient {
    /// Creates a new HTTP list client from the application config.
    pub fn http(config: &Config) -> Res<Self> {
        let client = HttpListClient::new(&config.list_api_host, Duration::from_secs(config.list_api_timeout_secs))?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Structs.

/// List client backed by the list service's JSON API.
#[derive(Clone)]
pub struct HttpListClient {
    client: Client,
    host: String,
}

impl HttpListClient {
    /// Create a new client against `host` (e.g. `http://lists.local:8080`).
    pub fn new(host: &str, timeout: Duration) -> Res<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }
}

#[async_trait]
impl GenericListClient for HttpListClient {
    #[instrument(name = "HttpListClient::append", skip(self))]
    async fn append(&self, item: &Item) -> Void {
        debug!("Appending item to the shopping list ...");

        let response = self.client.post(self.url("/shopping/list/append")).json(item).send().await?;
        ensure_success(response)?;

        Ok(())
    }

    #[instrument(name = "HttpListClient::complete", skip(self))]
    async fn complete(&self) -> Void {
        debug!("Completing the shopping list ...");

        let response = self.client.put(self.url("/shopping/list/complete")).header("Content-Type", "application/json").send().await?;
        ensure_success(response)?;

        Ok(())
    }

    #[instrument(name = "HttpListClient::retrieve", skip(self))]
    async fn retrieve(&self) -> Res<ShoppingList> {
        let response = self.client.get(self.url("/shopping/list")).send().await?;
        let list = ensure_success(response)?.json::<ShoppingList>().await?;

        info!("Retrieved shopping list with {} items.", list.items.len());

        Ok(list)
    }
}

// Helpers.

/// Rejects any response outside the 2xx range.
fn ensure_success(response: Response) -> Res<Response> {
    let status = response.status();

    if !status.is_success() {
        return Err(anyhow::anyhow!("List service responded with status {}", status.as_u16()));
    }

    Ok(response)
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpListClient {
        HttpListClient::new(&format!("{}/", server.uri()), Duration::from_secs(5)).unwrap()
    }

    fn milk() -> Item {
        Item {
            name: "milk".to_string(),
            quantity: 2,
            description: "full cream".to_string(),
        }
    }

    #[tokio::test]
    async fn append_posts_item_json() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/shopping/list/append"))
            .and(body_json(serde_json::json!({ "name": "milk", "quantity": 2, "description": "full cream" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).append(&milk()).await.unwrap();
    }

    #[tokio::test]
    async fn append_fails_on_server_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/shopping/list/append"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).append(&milk()).await.unwrap_err();
        assert!(err.to_string().contains("500"), "{err}");
    }

    #[tokio::test]
    async fn complete_uses_put() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/shopping/list/complete"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).complete().await.unwrap();
    }

    #[tokio::test]
    async fn complete_fails_on_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/shopping/list/complete"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(client(&server).complete().await.is_err());
    }

    #[tokio::test]
    async fn retrieve_parses_list() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/shopping/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    { "name": "milk", "quantity": 2, "description": "full cream" },
                    { "name": "bread", "quantity": 1 }
                ],
                "updatedAt": "2026-10-01T08:30:00Z"
            })))
            .mount(&server)
            .await;

        let list = client(&server).retrieve().await.unwrap();

        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0], milk());
        assert_eq!(list.items[1].description, "");
        assert!(list.updated_at.is_some());
    }

    #[tokio::test]
    async fn retrieve_fails_on_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/shopping/list"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        assert!(client(&server).retrieve().await.is_err());
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let client = HttpListClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();

        assert!(client.retrieve().await.is_err());
    }
}
