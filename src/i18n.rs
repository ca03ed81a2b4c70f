use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const BUILTIN_EN: &[(&str, &str)] = &[
    ("no_downloads_yet", "No downloads yet."),
    ("status_queued", "Queued"),
    ("status_waiting", "Waiting"),
    ("status_waiting_for_live", "Waiting for live"),
    ("status_downloading", "Downloading"),
    ("status_completed", "Completed"),
    ("status_error", "Error"),
    ("status_cancelled", "Cancelled"),
    ("button_title_cancel", "Cancel"),
    ("button_title_delete", "Delete"),
    ("copy_error", "Copy error"),
    ("copied", "Copied!"),
    ("details_completed", "Download complete."),
    ("details_cancelled", "Download cancelled."),
    ("settings_saved", "Settings saved."),
    ("update_status_updating", "Updating yt-dlp..."),
    ("update_status_complete", "yt-dlp updated to {version}."),
    ("update_status_failed", "yt-dlp update failed."),
    ("alert_enter_url", "Please enter at least one URL."),
    ("welcome_notice", "Welcome! Type `help` for commands, `dismiss-welcome` to hide this."),
];

/// Flat key to text table used by every view-facing component.
#[derive(Debug, Clone, PartialEq)]
pub struct Translations {
    lang: String,
    table: HashMap<String, String>,
}

impl Translations {
    pub fn builtin() -> Self {
        let table = BUILTIN_EN
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            lang: "en".to_string(),
            table,
        }
    }

    /// Loads a JSON translation file on top of the built-in English table.
    ///
    /// The file is either a flat `{key: text}` object or an object keyed by
    /// language code, in which case `lang` picks the table.
    pub fn load(path: &Path, lang: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read translations file {}", path.display()))?;
        let value: Value =
            serde_json::from_str(&content).context("Failed to parse translations file")?;

        let root = value
            .as_object()
            .ok_or_else(|| anyhow!("Translations file must contain a JSON object"))?;
        let table = match root.get(lang) {
            Some(Value::Object(nested)) => nested,
            _ => root,
        };

        let mut translations = Self::builtin();
        translations.lang = lang.to_string();
        for (key, text) in table {
            if let Value::String(text) = text {
                translations.table.insert(key.clone(), text.clone());
            }
        }
        Ok(translations)
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.table.get(key).map(String::as_str)
    }

    pub fn text_or<'a>(&'a self, key: &str, fallback: &'a str) -> &'a str {
        self.get(key).unwrap_or(fallback)
    }

    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.table.insert(key.into(), text.into());
    }
}

impl Default for Translations {
    fn default() -> Self {
        Self::builtin()
    }
}
