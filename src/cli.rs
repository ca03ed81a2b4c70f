use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dlq")]
#[command(author, version, about = "Terminal client for a download queue server", long_about = None)]
pub struct Args {
    /// Server base URL
    #[arg(short, long, default_value = "http://127.0.0.1:5000")]
    pub server: String,

    /// Translation file (JSON object, flat or keyed by language)
    #[arg(short, long)]
    pub translations: Option<PathBuf>,

    /// Language table to pick from the translation file
    #[arg(short, long, default_value = "en")]
    pub lang: String,

    /// Timeout for HTTP requests, in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// HTTP proxy (e.g., http://127.0.0.1:7890)
    #[arg(long)]
    pub proxy: Option<String>,

    /// Longest wait between reconnect attempts, in seconds
    #[arg(long, default_value = "30")]
    pub max_backoff: u64,

    /// Log debug output to stderr
    #[arg(short, long)]
    pub verbose: bool,
}
