use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::cli::Args;
use crate::error::ClientError;
use crate::i18n::Translations;
use crate::transport::Backoff;

/// Everything the client needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub socket_url: Url,
    pub http_timeout: Duration,
    pub proxy: Option<String>,
    pub backoff: Backoff,
    pub translations: Arc<Translations>,
}

impl ClientConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        let base_url = Url::parse(&args.server)
            .with_context(|| format!("Invalid server URL {}", args.server))?;
        let socket_url = socket_url(&base_url)?;

        let translations = match &args.translations {
            Some(path) => Translations::load(path, &args.lang)?,
            None => Translations::builtin(),
        };

        Ok(Self {
            base_url,
            socket_url,
            http_timeout: Duration::from_secs(args.timeout.max(1)),
            proxy: args.proxy.clone(),
            backoff: Backoff::new(
                Duration::from_secs(1),
                Duration::from_secs(args.max_backoff.max(1)),
            ),
            translations: Arc::new(translations),
        })
    }

    /// Defaults for a server at `base`, without any command line.
    pub fn for_server(base: &str) -> crate::error::Result<Self> {
        let base_url = Url::parse(base)?;
        Ok(Self {
            socket_url: socket_url(&base_url)?,
            base_url,
            http_timeout: Duration::from_secs(30),
            proxy: None,
            backoff: Backoff::default(),
            translations: Arc::new(Translations::builtin()),
        })
    }
}

/// `http://host:port/...` becomes `ws://host:port/socket.io/?EIO=4&transport=websocket`.
///
/// The base must be http(s), since the same URL also serves the HTTP routes.
pub fn socket_url(base: &Url) -> crate::error::Result<Url> {
    let scheme = match base.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => return Err(ClientError::UnsupportedScheme(other.to_string())),
    };

    let mut url = base.clone();
    url.set_scheme(scheme)
        .map_err(|_| ClientError::UnsupportedScheme(scheme.to_string()))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    url.set_fragment(None);
    Ok(url)
}
