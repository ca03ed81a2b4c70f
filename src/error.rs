use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid server URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Unsupported server URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("Malformed frame: {0}")]
    Frame(String),
    #[error("No URLs to add")]
    EmptyUrlList,
    #[error("An update is already running")]
    UpdateInProgress,
    #[error("No item matches {0}")]
    UnknownItem(String),
    #[error("{0}")]
    InvalidChoice(String),
    #[error("Settings have not been received from the server yet")]
    SettingsNotLoaded,
    #[error("Connection to the server is closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, ClientError>;
