use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{ClientError, Result};
use crate::probe::LiveMode;

fn default_concurrency() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_audio_format() -> String {
    "best".to_string()
}

fn default_cookie_browser() -> String {
    "none".to_string()
}

// Field decoders below never fail: `null` or a mistyped value falls back to
// the field default, so one bad field cannot drop the whole record.

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_concurrency<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let limit = value
        .as_u64()
        .or_else(|| value.as_f64().filter(|n| n.is_finite() && *n >= 1.0).map(|n| n as u64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|n| *n >= 1)
        .and_then(|n| u32::try_from(n).ok());
    Ok(limit.unwrap_or_else(default_concurrency))
}

fn lenient_welcome<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_bool().unwrap_or(true))
}

fn non_empty_or(value: Value, fallback: fn() -> String) -> String {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(fallback)
}

fn lenient_audio_format<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(non_empty_or(Value::deserialize(deserializer)?, default_audio_format))
}

fn lenient_cookie_browser<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(non_empty_or(Value::deserialize(deserializer)?, default_cookie_browser))
}

/// Mirror of the server-persisted configuration.
///
/// Fields the client does not know about are kept in `extra` so that a
/// read-modify-write round trip sends them back untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, deserialize_with = "lenient")]
    pub general: GeneralSettings,
    #[serde(default, deserialize_with = "lenient")]
    pub last_options: JobOptions,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralSettings {
    #[serde(default = "default_concurrency", deserialize_with = "lenient_concurrency")]
    pub concurrent_downloads: u32,
    #[serde(default = "default_true", deserialize_with = "lenient_welcome")]
    pub show_welcome_notice: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            concurrent_downloads: default_concurrency(),
            show_welcome_notice: true,
            extra: Map::new(),
        }
    }
}

/// Per-job options sent with `add_to_queue` and remembered as `last_options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    #[serde(default, deserialize_with = "lenient")]
    pub save_path: String,
    #[serde(default, deserialize_with = "lenient")]
    pub selected_format: String,
    #[serde(default, deserialize_with = "lenient")]
    pub audio_only: bool,
    #[serde(default = "default_audio_format", deserialize_with = "lenient_audio_format")]
    pub audio_format: String,
    #[serde(default = "default_cookie_browser", deserialize_with = "lenient_cookie_browser")]
    pub cookie_browser: String,
    #[serde(default, deserialize_with = "lenient")]
    pub custom_args: String,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub live_mode: Option<LiveMode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            save_path: String::new(),
            selected_format: String::new(),
            audio_only: false,
            audio_format: default_audio_format(),
            cookie_browser: default_cookie_browser(),
            custom_args: String::new(),
            live_mode: None,
            extra: Map::new(),
        }
    }
}

/// Single owner of the cached [`Settings`] record.
///
/// Writes are refused until the server has sent the record once, so a save
/// can never replace the stored configuration with client defaults.
#[derive(Debug, Default)]
pub struct SettingsState {
    current: Option<Settings>,
    // folder picked before the record arrived
    picked_path: Option<String>,
}

impl SettingsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cache with the record the server just sent.
    pub fn load(&mut self, mut settings: Settings) {
        if let Some(path) = self.picked_path.take() {
            settings.last_options.save_path = path;
        }
        self.current = Some(settings);
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&Settings> {
        self.current.as_ref()
    }

    /// Mutates the cached record and returns the complete result, ready to be
    /// sent back.
    pub fn modify<F>(&mut self, f: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let settings = self.current.as_mut().ok_or(ClientError::SettingsNotLoaded)?;
        f(settings);
        Ok(settings.clone())
    }

    /// Options for the next job, taken from the remembered `last_options`.
    pub fn job_options(&self) -> JobOptions {
        let mut options = self
            .current
            .as_ref()
            .map(|s| s.last_options.clone())
            .unwrap_or_default();
        if let Some(path) = &self.picked_path {
            options.save_path = path.clone();
        }
        options
    }

    pub fn show_welcome_notice(&self) -> bool {
        self.current
            .as_ref()
            .map(|s| s.general.show_welcome_notice)
            .unwrap_or(false)
    }

    pub fn apply_form(&mut self, concurrency: Option<u32>, options: JobOptions) -> Result<Settings> {
        self.modify(|s| {
            if let Some(limit) = concurrency {
                s.general.concurrent_downloads = limit.max(1);
            }
            s.last_options = options;
        })
    }

    pub fn dismiss_welcome(&mut self) -> Result<Settings> {
        self.modify(|s| s.general.show_welcome_notice = false)
    }

    pub fn set_save_path(&mut self, path: &str) {
        match self.current.as_mut() {
            Some(settings) => settings.last_options.save_path = path.to_string(),
            None => self.picked_path = Some(path.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_server_shape_and_keeps_unknown_fields() {
        let raw = json!({
            "general": {"concurrentDownloads": 3, "showWelcomeNotice": false, "theme": "dark"},
            "last_options": {"savePath": "/tmp/dl", "audioOnly": true, "proxy": "socks5://x"},
            "schema": 2
        });
        let settings: Settings = serde_json::from_value(raw).unwrap();

        assert_eq!(settings.general.concurrent_downloads, 3);
        assert!(!settings.general.show_welcome_notice);
        assert_eq!(settings.last_options.save_path, "/tmp/dl");
        assert_eq!(settings.last_options.audio_format, "best");
        assert_eq!(settings.last_options.cookie_browser, "none");

        let back = serde_json::to_value(&settings).unwrap();
        assert_eq!(back["general"]["theme"], json!("dark"));
        assert_eq!(back["last_options"]["proxy"], json!("socks5://x"));
        assert_eq!(back["schema"], json!(2));
        assert!(back["last_options"].get("liveMode").is_none());
    }

    #[test]
    fn empty_object_uses_defaults() {
        let settings: Settings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.general.concurrent_downloads, 1);
        assert!(settings.general.show_welcome_notice);
    }

    #[test]
    fn modify_returns_full_record() {
        let mut state = SettingsState::new();
        let mut loaded = Settings::default();
        loaded.last_options.save_path = "/downloads".into();
        loaded.extra.insert("schema".into(), json!(2));
        state.load(loaded);

        let sent = state.modify(|s| s.general.concurrent_downloads = 4).unwrap();
        assert_eq!(sent.general.concurrent_downloads, 4);
        assert_eq!(sent.last_options.save_path, "/downloads");
        assert_eq!(sent.extra.get("schema"), Some(&json!(2)));
        assert_eq!(state.current(), Some(&sent));
    }

    #[test]
    fn apply_form_and_dismiss_welcome() {
        let mut state = SettingsState::new();
        state.load(Settings::default());
        assert!(state.show_welcome_notice());

        let mut options = JobOptions::default();
        options.selected_format = "bestvideo+bestaudio".into();
        let sent = state.apply_form(Some(0), options.clone()).unwrap();
        assert_eq!(sent.general.concurrent_downloads, 1);
        assert_eq!(sent.last_options, options);

        let sent = state.dismiss_welcome().unwrap();
        assert!(!sent.general.show_welcome_notice);
        assert_eq!(sent.last_options, options);
        assert!(!state.show_welcome_notice());
    }

    #[test]
    fn job_options_before_load_are_defaults() {
        let mut state = SettingsState::new();
        assert!(!state.is_loaded());
        assert_eq!(state.job_options(), JobOptions::default());

        state.set_save_path("/music");
        assert_eq!(state.job_options().save_path, "/music");
        assert!(!state.is_loaded());

        let mut loaded = Settings::default();
        loaded.last_options.cookie_browser = "firefox".into();
        state.load(loaded);
        let options = state.job_options();
        assert_eq!(options.save_path, "/music");
        assert_eq!(options.cookie_browser, "firefox");
    }

    #[test]
    fn writes_before_load_are_refused() {
        let mut state = SettingsState::new();
        assert!(matches!(state.dismiss_welcome(), Err(ClientError::SettingsNotLoaded)));
        assert!(matches!(
            state.apply_form(Some(2), JobOptions::default()),
            Err(ClientError::SettingsNotLoaded)
        ));
        assert!(state.current().is_none());
    }

    #[test]
    fn null_and_mistyped_fields_fall_back_per_field() {
        let raw = json!({
            "general": {"concurrentDownloads": null, "showWelcomeNotice": "yes", "theme": "dark"},
            "last_options": {
                "savePath": "/srv/videos",
                "cookieBrowser": "firefox",
                "audioOnly": null,
                "audioFormat": 3,
                "customArgs": null,
                "liveMode": "sometimes"
            }
        });
        let settings: Settings = serde_json::from_value(raw).unwrap();

        assert_eq!(settings.general.concurrent_downloads, 1);
        assert!(settings.general.show_welcome_notice);
        assert_eq!(settings.general.extra.get("theme"), Some(&json!("dark")));
        assert_eq!(settings.last_options.save_path, "/srv/videos");
        assert_eq!(settings.last_options.cookie_browser, "firefox");
        assert!(!settings.last_options.audio_only);
        assert_eq!(settings.last_options.audio_format, "best");
        assert_eq!(settings.last_options.custom_args, "");
        assert_eq!(settings.last_options.live_mode, None);
    }

    #[test]
    fn concurrency_accepts_numeric_strings_and_floats() {
        let parse = |v: Value| -> u32 {
            let settings: Settings =
                serde_json::from_value(json!({"general": {"concurrentDownloads": v}})).unwrap();
            settings.general.concurrent_downloads
        };
        assert_eq!(parse(json!(4)), 4);
        assert_eq!(parse(json!(2.0)), 2);
        assert_eq!(parse(json!("3")), 3);
        assert_eq!(parse(json!(0)), 1);
        assert_eq!(parse(json!(-2)), 1);
    }

    #[test]
    fn section_of_the_wrong_type_is_defaulted() {
        let settings: Settings =
            serde_json::from_value(json!({"general": null, "last_options": [1, 2], "schema": 2})).unwrap();
        assert_eq!(settings.general, GeneralSettings::default());
        assert_eq!(settings.last_options, JobOptions::default());
        assert_eq!(settings.extra.get("schema"), Some(&json!(2)));
    }
}
