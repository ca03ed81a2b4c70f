use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::view::{ItemNode, ListNode, Surface};

const ID_WIDTH: usize = 8;

fn item_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:22} {bar:30} {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

fn message_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Draws the node list as one progress bar per item.
pub struct TerminalSurface {
    multi: MultiProgress,
    status: ProgressBar,
    bars: Vec<ProgressBar>,
}

impl TerminalSurface {
    /// Draws to stdout, leaving stderr to the logger.
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stdout())
    }

    pub fn with_target(target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);
        let status = multi.add(ProgressBar::new(0));
        status.set_style(message_style());
        Self {
            multi,
            status,
            bars: Vec::new(),
        }
    }

    pub fn bars(&self) -> &[ProgressBar] {
        &self.bars
    }

    fn draw_item(bar: &ProgressBar, node: &ItemNode) {
        let short_id: String = node.id.chars().take(ID_WIDTH).collect();
        bar.set_style(item_style());
        bar.set_prefix(format!("{} {}", short_id, node.status_label));
        bar.set_position(node.progress.round() as u64);
        bar.set_message(Self::item_message(node));
    }

    fn item_message(node: &ItemNode) -> String {
        let mut message = node.url.clone();
        if !node.details.is_empty() {
            message.push_str(" | ");
            message.push_str(&node.details);
        }
        if let Some(title) = &node.copy_title {
            message.push_str(&format!(" [{}: copy {}]", title, node.id));
        }
        message
    }
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for TerminalSurface {
    fn replace_all(&mut self, nodes: &[ListNode]) {
        for bar in self.bars.drain(..) {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }

        for node in nodes {
            let bar = self.multi.add(ProgressBar::new(100));
            match node {
                ListNode::Placeholder(text) => {
                    bar.set_style(message_style());
                    bar.set_message(text.clone());
                }
                ListNode::Item(item) => Self::draw_item(&bar, item),
            }
            self.bars.push(bar);
        }
    }

    fn replace_node(&mut self, index: usize, node: &ItemNode) {
        if let Some(bar) = self.bars.get(index) {
            Self::draw_item(bar, node);
        }
    }

    fn update_progress(&mut self, index: usize, node: &ItemNode) {
        if let Some(bar) = self.bars.get(index) {
            bar.set_position(node.progress.round() as u64);
            bar.set_message(Self::item_message(node));
        }
    }

    fn show_status(&mut self, text: &str) {
        self.status.set_message(text.to_string());
    }

    fn show_panel(&mut self, lines: &[String]) {
        for line in lines {
            self.multi.println(line).ok();
        }
    }
}
