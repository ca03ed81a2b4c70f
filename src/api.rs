//! Request/response calls that sit beside the push channel.
//!
//! None of these return a transport-level error to the caller. Every
//! failure (non-2xx, no connection, unreadable body, `success: false`) is
//! folded into an [`ApiFailure`] carrying one human-readable line.

use log::{debug, warn};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::probe::ContentProbeResult;

const CONNECT_FAILED: &str = "Failed to connect to the server.";

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct ApiFailure {
    pub error: String,
}

impl ApiFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut client_builder = Client::builder().timeout(config.http_timeout);

        if let Some(proxy_url) = &config.proxy {
            client_builder = client_builder.proxy(reqwest::Proxy::http(proxy_url)?);
        }

        Ok(Self {
            client: client_builder.build()?,
            base: config.base_url.clone(),
        })
    }

    /// Resolves one URL into a single video, playlist or live stream.
    pub async fn probe(
        &self,
        url: &str,
        cookie_browser: &str,
    ) -> std::result::Result<ContentProbeResult, ApiFailure> {
        let body = self
            .post_json("/api/formats", Some(json!({ "url": url, "cookieBrowser": cookie_browser })))
            .await?;

        if body.get("success") == Some(&Value::Bool(false)) {
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            return Err(ApiFailure::new(error));
        }

        ContentProbeResult::from_value(body).map_err(|e| {
            warn!("api: unreadable probe result: {}", e);
            ApiFailure::new(format!("Unexpected response: {}", e))
        })
    }

    /// Asks the server to show a folder picker. `None` when the user
    /// cancelled it.
    pub async fn select_folder(&self) -> std::result::Result<Option<String>, ApiFailure> {
        let body = self.post_json("/select-folder", None).await?;
        let path = body
            .get("folder_path")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim();
        Ok((!path.is_empty()).then(|| path.to_string()))
    }

    pub async fn open_folder(&self, path: &str) -> std::result::Result<(), ApiFailure> {
        self.post_json("/open-folder", Some(json!({ "path": path })))
            .await
            .map(|_| ())
    }

    async fn post_json(
        &self,
        route: &str,
        body: Option<Value>,
    ) -> std::result::Result<Value, ApiFailure> {
        let endpoint = self
            .base
            .join(route)
            .map_err(|e| ApiFailure::new(e.to_string()))?;
        debug!("api: POST {}", endpoint);

        let mut request = self.client.post(endpoint);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            warn!("api: {} failed: {}", route, e);
            ApiFailure::new(CONNECT_FAILED)
        })?;

        read_body(response).await
    }
}

async fn read_body(response: Response) -> std::result::Result<Value, ApiFailure> {
    let status = response.status();
    if !status.is_success() {
        // error bodies may still explain themselves
        let message = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string));
        return Err(ApiFailure::new(match message {
            Some(message) => format!("Server returned {}: {}", status.as_u16(), message),
            None => format!("Server returned {}", status.as_u16()),
        }));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ApiFailure::new(format!("Unexpected response: {}", e)))
}
