//! The status line: tool version plus short-lived messages.
//!
//! Every method that starts a toast takes `now`, so expiry is driven by the
//! caller's clock and can be tested with a paused runtime.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::i18n::Translations;

const SAVE_TOAST: Duration = Duration::from_secs(2);
const UPDATE_TOAST: Duration = Duration::from_secs(3);
const NOTICE_TOAST: Duration = Duration::from_secs(5);

const UPDATING_KEY: &str = "update_status_updating";

#[derive(Debug, Clone, PartialEq)]
struct Toast {
    text: String,
    /// `None` keeps the toast until it is replaced.
    expires: Option<Instant>,
}

impl Toast {
    fn new(text: String, now: Instant, ttl: Option<Duration>) -> Self {
        Self {
            text,
            expires: ttl.map(|ttl| now + ttl),
        }
    }

    fn expired(&self, now: Instant) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }
}

#[derive(Debug)]
pub struct StatusLine {
    translations: Arc<Translations>,
    version: Option<String>,
    save: Option<Toast>,
    update: Option<Toast>,
    notice: Option<Toast>,
    update_enabled: bool,
}

impl StatusLine {
    pub fn new(translations: Arc<Translations>) -> Self {
        Self {
            translations,
            version: None,
            save: None,
            update: None,
            notice: None,
            update_enabled: true,
        }
    }

    /// An empty version means the server could not determine it.
    pub fn set_version(&mut self, version: &str) {
        self.version = Some(if version.is_empty() {
            "Error".to_string()
        } else {
            version.to_string()
        });
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn settings_saved(&mut self, message_key: Option<&str>, now: Instant) {
        let key = message_key.unwrap_or("settings_saved");
        let text = self.translations.text_or(key, key).to_string();
        self.save = Some(Toast::new(text, now, Some(SAVE_TOAST)));
    }

    pub fn update_status(&mut self, message_key: &str, version: Option<&str>, now: Instant) {
        let mut text = self.translations.get(message_key).unwrap_or_default().to_string();
        if let Some(version) = version {
            text = text.replace("{version}", version);
        }

        let updating = message_key == UPDATING_KEY;
        self.update_enabled = !updating;
        let ttl = (!updating).then_some(UPDATE_TOAST);
        self.update = Some(Toast::new(text, now, ttl));
    }

    /// Inline message for local rejections and failed requests.
    pub fn notice(&mut self, text: impl Into<String>, now: Instant) {
        self.notice = Some(Toast::new(text.into(), now, Some(NOTICE_TOAST)));
    }

    pub fn update_enabled(&self) -> bool {
        self.update_enabled
    }

    /// Drops expired toasts. Returns `true` if the visible text changed.
    pub fn expire(&mut self, now: Instant) -> bool {
        let mut changed = false;
        for slot in [&mut self.save, &mut self.update, &mut self.notice] {
            if slot.as_ref().is_some_and(|t| t.expired(now)) {
                *slot = None;
                changed = true;
            }
        }
        changed
    }

    /// Earliest moment a visible toast should disappear.
    pub fn next_deadline(&self) -> Option<Instant> {
        [&self.save, &self.update, &self.notice]
            .into_iter()
            .filter_map(|slot| slot.as_ref().and_then(|t| t.expires))
            .min()
    }

    /// Line text: version first, then any live toasts, separated by `|`.
    pub fn text(&self) -> String {
        let mut parts = Vec::new();
        if let Some(version) = &self.version {
            parts.push(format!("yt-dlp {}", version));
        }
        for toast in [&self.save, &self.update, &self.notice].into_iter().flatten() {
            if !toast.text.is_empty() {
                parts.push(toast.text.clone());
            }
        }
        parts.join(" | ")
    }
}
