use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Lifecycle state of a download job as reported by the server.
///
/// Unknown wire values are kept verbatim in `Other` so that statuses added
/// server-side still render (as their raw key) instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemStatus {
    Queued,
    Downloading,
    Completed,
    Error,
    Cancelled,
    Other(String),
}

impl ItemStatus {
    pub fn as_key(&self) -> &str {
        match self {
            ItemStatus::Queued => "queued",
            ItemStatus::Downloading => "downloading",
            ItemStatus::Completed => "completed",
            ItemStatus::Error => "error",
            ItemStatus::Cancelled => "cancelled",
            ItemStatus::Other(raw) => raw,
        }
    }
}

impl Default for ItemStatus {
    fn default() -> Self {
        ItemStatus::Queued
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl From<String> for ItemStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" | "queued" => ItemStatus::Queued,
            "downloading" => ItemStatus::Downloading,
            "completed" => ItemStatus::Completed,
            "error" => ItemStatus::Error,
            "cancelled" => ItemStatus::Cancelled,
            _ => ItemStatus::Other(value),
        }
    }
}

impl From<&str> for ItemStatus {
    fn from(value: &str) -> Self {
        ItemStatus::from(value.to_string())
    }
}

impl From<ItemStatus> for String {
    fn from(value: ItemStatus) -> Self {
        match value {
            ItemStatus::Other(raw) => raw,
            known => known.as_key().to_string(),
        }
    }
}

/// One job in the server's download queue. The `id` is assigned by the
/// server and never originated by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadItem {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details_key: Option<String>,
}

impl DownloadItem {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            status: ItemStatus::Queued,
            progress: 0.0,
            details: String::new(),
            details_key: None,
        }
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}

/// Outcome of an upsert into a [`Queue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
}

/// Ordered map from item id to [`DownloadItem`].
///
/// Iteration order is insertion order, which mirrors the server's ordering.
/// Replacing an existing id keeps its position.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    items: Vec<DownloadItem>,
    index: HashMap<String, usize>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&DownloadItem> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut DownloadItem> {
        match self.index.get(id) {
            Some(&pos) => self.items.get_mut(pos),
            None => None,
        }
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DownloadItem> {
        self.items.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.id.as_str())
    }

    pub fn upsert(&mut self, item: DownloadItem) -> Upsert {
        match self.index.get(&item.id) {
            Some(&pos) => {
                self.items[pos] = item;
                Upsert::Replaced
            }
            None => {
                self.index.insert(item.id.clone(), self.items.len());
                self.items.push(item);
                Upsert::Inserted
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<DownloadItem> {
        let pos = self.index.remove(id)?;
        let removed = self.items.remove(pos);
        for item in &self.items[pos..] {
            if let Some(slot) = self.index.get_mut(&item.id) {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }
}

impl PartialEq for Queue {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl FromIterator<DownloadItem> for Queue {
    fn from_iter<I: IntoIterator<Item = DownloadItem>>(iter: I) -> Self {
        let mut queue = Queue::new();
        for item in iter {
            queue.upsert(item);
        }
        queue
    }
}

impl<'a> IntoIterator for &'a Queue {
    type Item = &'a DownloadItem;
    type IntoIter = std::slice::Iter<'a, DownloadItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
