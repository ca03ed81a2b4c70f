//! Projection of the queue into visual nodes.
//!
//! The projector keeps its own list of nodes, which is the single source of
//! truth for what a [`Surface`] currently shows. Three update paths exist,
//! from most to least expensive: full render, one-node replace, and
//! progress-only patch.

use std::sync::Arc;

use crate::i18n::Translations;
use crate::model::{DownloadItem, ItemStatus, Queue};

const PLACEHOLDER_FALLBACK: &str = "No downloads yet.";

/// Which verb the per-item remove button offers. Both send `remove_item`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveAction {
    Cancel,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemNode {
    pub id: String,
    pub url: String,
    /// Raw status key, also used as the style class.
    pub status_key: String,
    pub status_label: String,
    pub details: String,
    pub progress: f64,
    pub remove_action: RemoveAction,
    pub remove_title: String,
    /// Present only for items in `error`.
    pub copy_title: Option<String>,
}

impl ItemNode {
    /// Text placed on the clipboard by the copy affordance.
    pub fn copy_text(&self) -> Option<&str> {
        self.copy_title.as_ref().map(|_| self.details.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListNode {
    Placeholder(String),
    Item(ItemNode),
}

impl ListNode {
    pub fn as_item(&self) -> Option<&ItemNode> {
        match self {
            ListNode::Item(node) => Some(node),
            ListNode::Placeholder(_) => None,
        }
    }
}

/// Something that can display the node list. Indices always refer to the
/// list most recently passed to `replace_all`.
pub trait Surface {
    fn replace_all(&mut self, nodes: &[ListNode]);
    fn replace_node(&mut self, index: usize, node: &ItemNode);
    fn update_progress(&mut self, index: usize, node: &ItemNode);
    fn show_status(&mut self, _text: &str) {}
    /// Free-form lines shown outside the list (probe results, help).
    fn show_panel(&mut self, _lines: &[String]) {}
}

pub struct ViewProjector<S> {
    translations: Arc<Translations>,
    nodes: Vec<ListNode>,
    surface: S,
}

impl<S: Surface> ViewProjector<S> {
    pub fn new(surface: S, translations: Arc<Translations>) -> Self {
        Self {
            translations,
            nodes: Vec::new(),
            surface,
        }
    }

    pub fn render(&mut self, queue: &Queue) {
        self.nodes = if queue.is_empty() {
            vec![ListNode::Placeholder(
                self.translations
                    .text_or("no_downloads_yet", PLACEHOLDER_FALLBACK)
                    .to_string(),
            )]
        } else {
            queue
                .iter()
                .map(|item| ListNode::Item(project_item(item, &self.translations)))
                .collect()
        };
        self.surface.replace_all(&self.nodes);
    }

    /// Rebuilds the node for `item.id`. Returns `false` when no such node is
    /// shown; siblings are never touched.
    pub fn patch_item(&mut self, item: &DownloadItem) -> bool {
        let Some(index) = self.index_of(&item.id) else {
            return false;
        };
        let node = project_item(item, &self.translations);
        self.surface.replace_node(index, &node);
        self.nodes[index] = ListNode::Item(node);
        true
    }

    /// Updates the bar and details text of one node, nothing else.
    pub fn patch_progress(&mut self, id: &str, progress: f64, details: &str) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if let ListNode::Item(node) = &mut self.nodes[index] {
            node.progress = progress;
            node.details = details.to_string();
            self.surface.update_progress(index, node);
        }
        true
    }

    pub fn show_status(&mut self, text: &str) {
        self.surface.show_status(text);
    }

    pub fn show_panel(&mut self, lines: &[String]) {
        self.surface.show_panel(lines);
    }

    pub fn nodes(&self) -> &[ListNode] {
        &self.nodes
    }

    pub fn item_node(&self, id: &str) -> Option<&ItemNode> {
        self.index_of(id).and_then(|index| self.nodes[index].as_item())
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|node| matches!(node, ListNode::Item(item) if item.id == id))
    }
}

pub fn project_item(item: &DownloadItem, translations: &Translations) -> ItemNode {
    let status_key = item.status.as_key().to_string();
    let status_label = translations
        .get(&format!("status_{}", status_key))
        .unwrap_or(status_key.as_str())
        .to_string();

    let details = item
        .details_key
        .as_deref()
        .and_then(|key| translations.get(key))
        .unwrap_or(item.details.as_str())
        .to_string();

    let (remove_action, remove_title) = if item.status == ItemStatus::Downloading {
        (
            RemoveAction::Cancel,
            translations.text_or("button_title_cancel", "Cancel"),
        )
    } else {
        (
            RemoveAction::Delete,
            translations.text_or("button_title_delete", "Delete"),
        )
    };

    let copy_title = (item.status == ItemStatus::Error)
        .then(|| translations.text_or("copy_error", "Copy").to_string());

    ItemNode {
        id: item.id.clone(),
        url: item.url.clone(),
        status_key,
        status_label,
        details,
        progress: item.progress,
        remove_action,
        remove_title: remove_title.to_string(),
        copy_title,
    }
}
