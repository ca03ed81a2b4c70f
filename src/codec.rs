//! Typed messages on both sides of the wire.
//!
//! Inbound payloads are decoded leniently: a missing or mistyped field gets a
//! safe default (empty string, zero, `queued`) instead of failing the event.
//! Only payloads that cannot be keyed at all (an item without an id, a body
//! that is not an object) are dropped, and that never stops the stream.

use log::warn;
use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::model::{DownloadItem, ItemStatus, Queue};
use crate::settings::{JobOptions, Settings};
use crate::transport::NamedEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    QueueUpdate { queue: Queue },
    ItemUpdate { item: DownloadItem },
    DownloadProgress { id: String, progress: f64, details: String },
    SettingsLoaded { settings: Settings },
    SettingsSaved { message_key: Option<String> },
    UpdateStatus { message_key: String, version: Option<String> },
    VersionInfo { version: String },
}

impl ServerEvent {
    /// Decodes one inbound event. Returns `None` for unknown event names or
    /// payloads that carry nothing usable; the reason is logged.
    pub fn decode(event: &NamedEvent) -> Option<ServerEvent> {
        let empty = Map::new();
        let body = match &event.payload {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                warn!("codec: {} payload is not an object: {}", event.name, other);
                return None;
            }
        };

        match event.name.as_str() {
            "queue_update" => Some(ServerEvent::QueueUpdate {
                queue: decode_queue(body.get("queue")),
            }),
            "item_update" => {
                let item = body.get("item").and_then(|v| decode_item(v, None));
                if item.is_none() {
                    warn!("codec: item_update without a usable item");
                }
                item.map(|item| ServerEvent::ItemUpdate { item })
            }
            "download_progress" => {
                let id = string_field(body, "id");
                if id.is_empty() {
                    warn!("codec: download_progress without an id");
                    return None;
                }
                Some(ServerEvent::DownloadProgress {
                    id,
                    progress: progress_field(body, "progress"),
                    details: string_field(body, "details"),
                })
            }
            "settings_loaded" => {
                let raw = body.get("settings").cloned().unwrap_or_else(|| json!({}));
                match serde_json::from_value(raw) {
                    Ok(settings) => Some(ServerEvent::SettingsLoaded { settings }),
                    Err(e) => {
                        warn!("codec: unreadable settings: {}", e);
                        None
                    }
                }
            }
            "settings_saved" => Some(ServerEvent::SettingsSaved {
                message_key: optional_string_field(body, "message_key"),
            }),
            "update_status" => Some(ServerEvent::UpdateStatus {
                message_key: string_field(body, "message_key"),
                version: optional_string_field(body, "version"),
            }),
            "version_info" => Some(ServerEvent::VersionInfo {
                version: string_field(body, "version"),
            }),
            other => {
                warn!("codec: ignoring unknown event {}", other);
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    AddToQueue { urls: Vec<String>, options: JobOptions },
    SaveSettings { settings: Settings },
    RemoveItem { id: String },
    ClearQueue,
    UpdateTool,
}

impl ClientCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::AddToQueue { .. } => "add_to_queue",
            ClientCommand::SaveSettings { .. } => "save_settings",
            ClientCommand::RemoveItem { .. } => "remove_item",
            ClientCommand::ClearQueue => "clear_queue",
            ClientCommand::UpdateTool => "update_yt_dlp",
        }
    }

    /// Commands without arguments go out with no payload at all, since the
    /// server handlers for them take no parameters.
    pub fn encode(&self) -> Result<NamedEvent> {
        let payload = match self {
            ClientCommand::AddToQueue { urls, options } => json!({
                "urls": urls,
                "options": serde_json::to_value(options)?,
            }),
            ClientCommand::SaveSettings { settings } => json!({
                "settings": serde_json::to_value(settings)?,
            }),
            ClientCommand::RemoveItem { id } => json!({ "id": id }),
            ClientCommand::ClearQueue | ClientCommand::UpdateTool => Value::Null,
        };
        Ok(NamedEvent::new(self.name(), payload))
    }
}

/// Decodes the `{id: item}` map of a snapshot, keeping server order.
pub fn decode_queue(value: Option<&Value>) -> Queue {
    match value {
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(key, item)| decode_item(item, Some(key)))
            .collect(),
        Some(Value::Array(items)) => items.iter().filter_map(|item| decode_item(item, None)).collect(),
        Some(Value::Null) | None => Queue::new(),
        Some(other) => {
            warn!("codec: queue is not a map: {}", other);
            Queue::new()
        }
    }
}

/// Decodes one item; `fallback_id` is the map key it was found under.
pub fn decode_item(value: &Value, fallback_id: Option<&str>) -> Option<DownloadItem> {
    let obj = value.as_object()?;
    let mut id = string_field(obj, "id");
    if id.is_empty() {
        id = fallback_id.unwrap_or_default().to_string();
    }
    if id.is_empty() {
        return None;
    }

    Some(DownloadItem {
        id,
        url: string_field(obj, "url"),
        status: ItemStatus::from(string_field(obj, "status")),
        progress: progress_field(obj, "progress"),
        details: string_field(obj, "details"),
        details_key: optional_string_field(obj, "details_key"),
    })
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn optional_string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    Some(string_field(obj, key)).filter(|s| !s.is_empty())
}

/// Percentage in `0..=100`; anything unreadable or non-finite is zero.
fn progress_field(obj: &Map<String, Value>, key: &str) -> f64 {
    let raw = match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse().unwrap_or(0.0),
        _ => 0.0,
    };
    if raw.is_finite() {
        raw.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str, payload: Value) -> NamedEvent {
        NamedEvent::new(name, payload)
    }

    #[test]
    fn queue_update_keeps_server_order_and_uses_keys_as_fallback_ids() {
        let decoded = ServerEvent::decode(&event(
            "queue_update",
            json!({"queue": {
                "zz": {"id": "zz", "url": "https://a", "status": "downloading", "progress": 12.5, "details": ""},
                "aa": {"url": "https://b", "status": "waiting"},
                "mm": {"id": "mm", "url": "https://c", "status": "completed", "progress": 100, "details_key": "details_completed"}
            }}),
        ))
        .unwrap();

        let ServerEvent::QueueUpdate { queue } = decoded else { panic!("expected snapshot") };
        assert_eq!(queue.ids().collect::<Vec<_>>(), vec!["zz", "aa", "mm"]);
        assert_eq!(queue.get("aa").unwrap().status, ItemStatus::Other("waiting".into()));
        assert_eq!(queue.get("zz").unwrap().progress, 12.5);
        assert_eq!(
            queue.get("mm").unwrap().details_key.as_deref(),
            Some("details_completed")
        );
    }

    #[test]
    fn missing_queue_is_empty_snapshot() {
        let decoded = ServerEvent::decode(&event("queue_update", json!({}))).unwrap();
        assert_eq!(decoded, ServerEvent::QueueUpdate { queue: Queue::new() });
    }

    #[test]
    fn item_defaults_for_missing_and_mistyped_fields() {
        let item = decode_item(
            &json!({"id": 42, "url": null, "progress": "55.5%", "details": ["x"]}),
            None,
        )
        .unwrap();
        assert_eq!(item.id, "42");
        assert_eq!(item.url, "");
        assert_eq!(item.status, ItemStatus::Queued);
        assert_eq!(item.progress, 55.5);
        assert_eq!(item.details, "");
        assert_eq!(item.details_key, None);
    }

    #[test]
    fn item_without_any_id_is_dropped() {
        assert!(decode_item(&json!({"url": "x"}), None).is_none());
        assert!(decode_item(&json!("nope"), Some("a")).is_none());
        assert!(ServerEvent::decode(&event("item_update", json!({"item": {"url": "x"}}))).is_none());
    }

    #[test]
    fn progress_is_clamped() {
        let decode = |p: Value| match ServerEvent::decode(&event(
            "download_progress",
            json!({"id": "a", "progress": p, "details": "of 10MiB"}),
        )) {
            Some(ServerEvent::DownloadProgress { progress, .. }) => progress,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(decode(json!(-3)), 0.0);
        assert_eq!(decode(json!(140.0)), 100.0);
        assert_eq!(decode(json!(null)), 0.0);
        assert_eq!(decode(json!(37.2)), 37.2);
    }

    #[test]
    fn progress_without_id_is_dropped() {
        assert!(ServerEvent::decode(&event("download_progress", json!({"progress": 5}))).is_none());
    }

    #[test]
    fn status_events() {
        assert_eq!(
            ServerEvent::decode(&event("update_status", json!({"message_key": "update_status_complete", "version": "2024.08.06"}))),
            Some(ServerEvent::UpdateStatus {
                message_key: "update_status_complete".into(),
                version: Some("2024.08.06".into()),
            })
        );
        assert_eq!(
            ServerEvent::decode(&event("settings_saved", Value::Null)),
            Some(ServerEvent::SettingsSaved { message_key: None })
        );
        assert_eq!(
            ServerEvent::decode(&event("version_info", json!({}))),
            Some(ServerEvent::VersionInfo { version: String::new() })
        );
    }

    #[test]
    fn settings_loaded_defaults_bad_fields() {
        let ok = ServerEvent::decode(&event(
            "settings_loaded",
            json!({"settings": {"general": {"concurrentDownloads": 2}}}),
        ));
        let Some(ServerEvent::SettingsLoaded { settings }) = ok else { panic!("expected settings") };
        assert_eq!(settings.general.concurrent_downloads, 2);

        let partial = ServerEvent::decode(&event(
            "settings_loaded",
            json!({"settings": {
                "general": {"concurrentDownloads": null},
                "last_options": {"savePath": "/srv/videos", "audioOnly": "many"}
            }}),
        ));
        let Some(ServerEvent::SettingsLoaded { settings }) = partial else { panic!("expected settings") };
        assert_eq!(settings.general.concurrent_downloads, 1);
        assert_eq!(settings.last_options.save_path, "/srv/videos");
        assert!(!settings.last_options.audio_only);

        let bad = ServerEvent::decode(&event("settings_loaded", json!({"settings": "oops"})));
        assert!(bad.is_none());
    }

    #[test]
    fn unknown_events_and_non_object_payloads_are_ignored() {
        assert!(ServerEvent::decode(&event("pong_extra", json!({}))).is_none());
        assert!(ServerEvent::decode(&event("queue_update", json!("oops"))).is_none());
    }

    #[test]
    fn commands_encode_to_wire_shape() {
        let add = ClientCommand::AddToQueue {
            urls: vec!["https://a".into()],
            options: JobOptions::default(),
        }
        .encode()
        .unwrap();
        assert_eq!(add.name, "add_to_queue");
        assert_eq!(add.payload["urls"], json!(["https://a"]));
        assert_eq!(add.payload["options"]["cookieBrowser"], json!("none"));

        let remove = ClientCommand::RemoveItem { id: "x".into() }.encode().unwrap();
        assert_eq!(remove, NamedEvent::new("remove_item", json!({"id": "x"})));

        let clear = ClientCommand::ClearQueue.encode().unwrap();
        assert_eq!(clear, NamedEvent::new("clear_queue", Value::Null));
        assert_eq!(ClientCommand::UpdateTool.encode().unwrap().name, "update_yt_dlp");

        let save = ClientCommand::SaveSettings { settings: Settings::default() }
            .encode()
            .unwrap();
        assert_eq!(save.payload["settings"]["general"]["concurrentDownloads"], json!(1));
    }
}
