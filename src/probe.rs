//! Content probe results and the panel that presents one of them.
//!
//! A probe resolves a single URL into a single video (with selectable
//! formats), a playlist (with per-entry checkboxes) or a live stream (with a
//! record mode). The panel shows exactly one branch at a time, and showing a
//! new result drops every selection made against the previous one.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::format::{format_duration, format_upload_date};

/// How a live stream should be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveMode {
    /// Wait for the stream to start, then record from the beginning.
    #[default]
    Wait,
    /// Record from the current position.
    Now,
    /// Record with a conservative format (720p cap).
    Safe,
}

impl fmt::Display for LiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveMode::Wait => write!(f, "wait"),
            LiveMode::Now => write!(f, "now"),
            LiveMode::Safe => write!(f, "safe"),
        }
    }
}

impl FromStr for LiveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wait" => Ok(LiveMode::Wait),
            "now" => Ok(LiveMode::Now),
            "safe" => Ok(LiveMode::Safe),
            other => Err(format!("unknown live mode: {}", other)),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormatOption {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub resolution: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub ext: String,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub filesize: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
}

impl FormatOption {
    /// `1080p (mp4) @ 60fps (12.34 MB) - note`, leaving out absent parts.
    pub fn label(&self) -> String {
        let mut label = if self.resolution.bytes().all(|b| b.is_ascii_digit())
            && !self.resolution.is_empty()
        {
            format!("{}p ({})", self.resolution, self.ext)
        } else {
            format!("{} ({})", self.resolution, self.ext)
        };
        if let Some(fps) = self.fps.filter(|fps| *fps > 0.0) {
            label.push_str(&format!(" @ {}fps", fps));
        }
        if let Some(size) = self.filesize.filter(|size| *size > 0.0) {
            label.push_str(&format!(" ({:.2} MB)", size / 1024.0 / 1024.0));
        }
        if let Some(note) = self.note.as_deref().filter(|note| !note.is_empty()) {
            label.push_str(&format!(" - {}", note));
        }
        label.trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SingleInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub formats: Vec<FormatOption>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaylistEntry {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub url: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub upload_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PlaylistInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub entry_count: usize,
    #[serde(default)]
    pub total_entries: Option<usize>,
    #[serde(default)]
    pub entries: Vec<PlaylistEntry>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct LiveInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub was_live: bool,
    #[serde(default)]
    pub live_status: Option<String>,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "content_type", rename_all = "lowercase")]
pub enum ContentProbeResult {
    Single(SingleInfo),
    Playlist(PlaylistInfo),
    Live(LiveInfo),
}

impl ContentProbeResult {
    /// Decodes a successful probe body. Bodies without `content_type` come
    /// from the plain formats endpoint and are treated as a single video.
    pub fn from_value(mut value: Value) -> serde_json::Result<Self> {
        if let Value::Object(map) = &mut value {
            if !matches!(map.get("content_type"), Some(Value::String(_))) {
                map.insert("content_type".to_string(), Value::from("single"));
            }
        }
        serde_json::from_value(value)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ContentProbeResult::Single(_) => "single",
            ContentProbeResult::Playlist(_) => "playlist",
            ContentProbeResult::Live(_) => "live",
        }
    }
}

/// One rendered playlist row.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistRow {
    pub checked: bool,
    pub title: String,
    pub url: String,
    pub meta: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ProbeView {
    #[default]
    Hidden,
    Single {
        info: SingleInfo,
        selected: Option<String>,
    },
    Playlist {
        info: PlaylistInfo,
        checked: Vec<bool>,
    },
    Live {
        info: LiveInfo,
        mode: LiveMode,
    },
}

#[derive(Debug, Default)]
pub struct ProbePanel {
    view: ProbeView,
}

impl ProbePanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever branch is visible with the one for `result`.
    pub fn show(&mut self, result: ContentProbeResult) {
        self.view = match result {
            ContentProbeResult::Single(info) => ProbeView::Single {
                info,
                selected: None,
            },
            ContentProbeResult::Playlist(info) => {
                let checked = vec![true; info.entries.len()];
                ProbeView::Playlist { info, checked }
            }
            ContentProbeResult::Live(info) => ProbeView::Live {
                info,
                mode: LiveMode::default(),
            },
        };
    }

    pub fn hide(&mut self) {
        self.view = ProbeView::Hidden;
    }

    pub fn view(&self) -> &ProbeView {
        &self.view
    }

    pub fn is_visible(&self) -> bool {
        self.view != ProbeView::Hidden
    }

    /// `(format id, label)` pairs for the single-video branch.
    pub fn format_choices(&self) -> Vec<(String, String)> {
        match &self.view {
            ProbeView::Single { info, .. } => info
                .formats
                .iter()
                .map(|f| (f.id.clone(), f.label()))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn select_format(&mut self, id: &str) -> bool {
        match &mut self.view {
            ProbeView::Single { info, selected } if info.formats.iter().any(|f| f.id == id) => {
                *selected = Some(id.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn selected_format(&self) -> Option<&str> {
        match &self.view {
            ProbeView::Single { selected, .. } => selected.as_deref(),
            _ => None,
        }
    }

    pub fn playlist_rows(&self) -> Vec<PlaylistRow> {
        let ProbeView::Playlist { info, checked } = &self.view else {
            return Vec::new();
        };
        info.entries
            .iter()
            .zip(checked)
            .enumerate()
            .map(|(index, (entry, &checked))| {
                let mut meta = Vec::new();
                if let Some(duration) = entry.duration.filter(|d| *d > 0.0) {
                    meta.push(format_duration(duration));
                }
                if let Some(uploader) = entry.uploader.as_deref().filter(|u| !u.is_empty()) {
                    meta.push(format!("by {}", uploader));
                }
                if let Some(date) = entry.upload_date.as_deref().filter(|d| !d.is_empty()) {
                    meta.push(format_upload_date(date));
                }
                PlaylistRow {
                    checked,
                    title: entry
                        .title
                        .clone()
                        .filter(|t| !t.is_empty())
                        .unwrap_or_else(|| format!("Video {}", index + 1)),
                    url: entry.url.clone(),
                    meta,
                }
            })
            .collect()
    }

    /// The "N" in "download whole playlist (N)".
    pub fn playlist_count_label(&self) -> Option<String> {
        match &self.view {
            ProbeView::Playlist { info, .. } => Some(info.entry_count.to_string()),
            _ => None,
        }
    }

    pub fn set_entry_checked(&mut self, index: usize, value: bool) -> bool {
        match &mut self.view {
            ProbeView::Playlist { checked, .. } => match checked.get_mut(index) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    pub fn set_all_checked(&mut self, value: bool) -> bool {
        match &mut self.view {
            ProbeView::Playlist { checked, .. } => {
                checked.iter_mut().for_each(|slot| *slot = value);
                true
            }
            _ => false,
        }
    }

    pub fn all_checked(&self) -> bool {
        match &self.view {
            ProbeView::Playlist { checked, .. } => checked.iter().all(|c| *c),
            _ => false,
        }
    }

    pub fn selected_playlist_items(&self) -> Vec<String> {
        match &self.view {
            ProbeView::Playlist { info, checked } => info
                .entries
                .iter()
                .zip(checked)
                .filter(|(_, checked)| **checked)
                .map(|(entry, _)| entry.url.clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn set_live_mode(&mut self, value: LiveMode) -> bool {
        match &mut self.view {
            ProbeView::Live { mode, .. } => {
                *mode = value;
                true
            }
            _ => false,
        }
    }

    /// The chosen record mode, or `None` when no live stream is shown.
    pub fn live_mode(&self) -> Option<LiveMode> {
        match &self.view {
            ProbeView::Live { mode, .. } => Some(*mode),
            _ => None,
        }
    }

    /// Multi-line text rendering of the visible branch.
    pub fn describe(&self) -> Vec<String> {
        match &self.view {
            ProbeView::Hidden => Vec::new(),
            ProbeView::Single { info, selected } => {
                let mut lines = vec![format!(
                    "Single video{}",
                    info.title
                        .as_deref()
                        .map(|t| format!(": {}", t))
                        .unwrap_or_default()
                )];
                for (i, f) in info.formats.iter().enumerate() {
                    let mark = if selected.as_deref() == Some(f.id.as_str()) { "*" } else { " " };
                    lines.push(format!("{} [{}] {} ({})", mark, i, f.label(), f.id));
                }
                lines
            }
            ProbeView::Playlist { info, .. } => {
                let mut lines = vec![format!(
                    "Playlist: {} by {}",
                    info.title.as_deref().unwrap_or("Playlist"),
                    info.uploader.as_deref().unwrap_or("unknown"),
                )];
                let total = match info.total_entries {
                    Some(total) if total != info.entry_count => format!(" (of {})", total),
                    _ => String::new(),
                };
                lines.push(format!(
                    "[{}] download whole playlist ({}){}",
                    if self.all_checked() { "x" } else { " " },
                    info.entry_count,
                    total
                ));
                for (i, row) in self.playlist_rows().iter().enumerate() {
                    lines.push(format!(
                        "  [{}] {:>3} {} {}",
                        if row.checked { "x" } else { " " },
                        i,
                        row.title,
                        row.meta.join(" ")
                    ));
                }
                lines
            }
            ProbeView::Live { info, mode } => {
                let state = if info.is_live {
                    "live now"
                } else if info.was_live {
                    "ended"
                } else {
                    "upcoming"
                };
                let mut lines = vec![format!(
                    "Live stream: {} ({})",
                    info.title.as_deref().unwrap_or(""),
                    state
                )];
                if let Some(duration) = info.duration.filter(|d| *d > 0.0) {
                    lines.push(format!("  length {}", format_duration(duration)));
                }
                lines.push(format!("  record mode: {}", mode));
                lines
            }
        }
    }
}
