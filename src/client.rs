//! The controller: the only place where the store, projector, settings
//! mirror, status line and probe panel are touched.
//!
//! Inbound events go decode → reconcile → schedule a view patch; patches are
//! flushed once the queued burst has been drained, so a storm of progress
//! ticks costs one draw per item. HTTP calls run on their own tasks and come
//! back as [`ApiReply`] values.

use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::api::{ApiClient, ApiFailure};
use crate::codec::ServerEvent;
use crate::dispatch::{parse_url_list, CommandDispatcher};
use crate::error::{ClientError, Result};
use crate::i18n::Translations;
use crate::model::{Queue, Upsert};
use crate::notices::StatusLine;
use crate::probe::{ContentProbeResult, LiveMode, ProbePanel, ProbeView};
use crate::repl::HELP;
use crate::settings::SettingsState;
use crate::store::QueueStore;
use crate::transport::{sleep_until, TransportEvent};
use crate::view::{Surface, ViewProjector};

/// Something the user asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Raw URL input, one URL per line.
    Add(String),
    /// Item id, or a unique prefix of one.
    Remove(String),
    Clear,
    UpdateTool,
    Probe(String),
    /// Format id, or its index in the probe listing.
    PickFormat(String),
    SelectEntry { index: usize, checked: bool },
    SelectAll(bool),
    SetLiveMode(LiveMode),
    EnqueueSelected,
    SelectFolder,
    OpenFolder,
    SaveSettings { concurrency: Option<u32> },
    DismissWelcome,
    Copy(String),
    Help,
    /// Input that could not be understood; shown back as a notice.
    Invalid(String),
    Quit,
}

/// HTTP work started by an intent, run off the controller loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    Probe {
        generation: u64,
        url: String,
        cookie_browser: String,
    },
    SelectFolder,
    OpenFolder {
        path: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiReply {
    Probe {
        generation: u64,
        url: String,
        result: std::result::Result<ContentProbeResult, ApiFailure>,
    },
    Folder(std::result::Result<Option<String>, ApiFailure>),
    Opened(std::result::Result<(), ApiFailure>),
}

impl ApiRequest {
    pub async fn execute(self, api: &ApiClient) -> ApiReply {
        match self {
            ApiRequest::Probe {
                generation,
                url,
                cookie_browser,
            } => {
                let result = api.probe(&url, &cookie_browser).await;
                ApiReply::Probe {
                    generation,
                    url,
                    result,
                }
            }
            ApiRequest::SelectFolder => ApiReply::Folder(api.select_folder().await),
            ApiRequest::OpenFolder { path } => ApiReply::Opened(api.open_folder(&path).await),
        }
    }
}

fn applied(done: bool, message: &str) -> Result<()> {
    if done {
        Ok(())
    } else {
        Err(ClientError::InvalidChoice(message.to_string()))
    }
}

#[derive(Debug, Default)]
struct Pending {
    full: bool,
    items: Vec<String>,
    progress: Vec<String>,
    status: bool,
    panel: bool,
}

impl Pending {
    fn item(&mut self, id: String) {
        if !self.items.contains(&id) {
            self.items.push(id);
        }
    }

    fn progress(&mut self, id: String) {
        if !self.progress.contains(&id) {
            self.progress.push(id);
        }
    }
}

pub struct QueueClient<S> {
    translations: Arc<Translations>,
    store: QueueStore,
    view: ViewProjector<S>,
    settings: SettingsState,
    status: StatusLine,
    probe: ProbePanel,
    probe_url: Option<String>,
    probe_generation: u64,
    dispatcher: CommandDispatcher,
    connected: bool,
    pending: Pending,
}

impl<S: Surface> QueueClient<S> {
    pub fn new(surface: S, dispatcher: CommandDispatcher, translations: Arc<Translations>) -> Self {
        let mut view = ViewProjector::new(surface, Arc::clone(&translations));
        view.render(&Queue::new());
        Self {
            store: QueueStore::new(),
            view,
            settings: SettingsState::new(),
            status: StatusLine::new(Arc::clone(&translations)),
            probe: ProbePanel::new(),
            probe_url: None,
            probe_generation: 0,
            dispatcher,
            connected: false,
            pending: Pending::default(),
            translations,
        }
    }

    pub fn handle_transport(&mut self, event: TransportEvent, now: Instant) {
        match event {
            TransportEvent::Connected => {
                // the server pushes a full queue_update on connect, which
                // replaces whatever deltas arrived while we were away
                info!("client: connected");
                self.connected = true;
            }
            TransportEvent::Disconnected { reason } => {
                warn!("client: disconnected: {}", reason);
                self.connected = false;
            }
            TransportEvent::Event(named) => {
                if let Some(event) = ServerEvent::decode(&named) {
                    self.handle_server_event(event, now);
                }
            }
        }
    }

    pub fn handle_server_event(&mut self, event: ServerEvent, now: Instant) {
        match event {
            ServerEvent::QueueUpdate { queue } => {
                self.store.apply_snapshot(queue);
                self.pending.full = true;
            }
            ServerEvent::ItemUpdate { item } => {
                let id = item.id.clone();
                match self.store.apply_item_update(item) {
                    Upsert::Inserted => self.pending.full = true,
                    Upsert::Replaced => self.pending.item(id),
                }
            }
            ServerEvent::DownloadProgress {
                id,
                progress,
                details,
            } => {
                if self.store.apply_progress_update(&id, progress, &details) {
                    self.pending.progress(id);
                } else {
                    debug!("client: progress for unknown item {}", id);
                }
            }
            ServerEvent::SettingsLoaded { settings } => {
                self.settings.load(settings);
                if self.settings.show_welcome_notice() {
                    let text = self
                        .translations
                        .text_or("welcome_notice", "Welcome! Type `help` for commands.")
                        .to_string();
                    self.status.notice(text, now);
                    self.pending.status = true;
                }
            }
            ServerEvent::SettingsSaved { message_key } => {
                self.status.settings_saved(message_key.as_deref(), now);
                self.pending.status = true;
            }
            ServerEvent::UpdateStatus {
                message_key,
                version,
            } => {
                self.status
                    .update_status(&message_key, version.as_deref(), now);
                self.pending.status = true;
            }
            ServerEvent::VersionInfo { version } => {
                self.status.set_version(&version);
                self.pending.status = true;
            }
        }
    }

    /// Runs one intent. Rejections come back as errors and change nothing.
    pub fn handle_intent(&mut self, intent: Intent, now: Instant) -> Result<Option<ApiRequest>> {
        match intent {
            Intent::Add(text) => {
                self.dispatcher
                    .enqueue(parse_url_list(&text), self.settings.job_options())?;
            }
            Intent::Remove(needle) => {
                let id = self.resolve_item(&needle)?;
                self.dispatcher.remove_item(&id)?;
            }
            Intent::Clear => self.dispatcher.clear_queue()?,
            Intent::UpdateTool => {
                if !self.status.update_enabled() {
                    return Err(ClientError::UpdateInProgress);
                }
                self.dispatcher.trigger_tool_update()?;
            }
            Intent::Probe(url) => {
                let url = url.trim().to_string();
                if url.is_empty() {
                    return Err(ClientError::EmptyUrlList);
                }
                self.probe_generation += 1;
                self.probe.hide();
                self.probe_url = None;
                self.pending.panel = true;
                return Ok(Some(ApiRequest::Probe {
                    generation: self.probe_generation,
                    url,
                    cookie_browser: self.settings.job_options().cookie_browser,
                }));
            }
            Intent::PickFormat(choice) => {
                let id = match choice.parse::<usize>() {
                    Ok(index) => self
                        .probe
                        .format_choices()
                        .get(index)
                        .map(|(id, _)| id.clone())
                        .unwrap_or(choice),
                    Err(_) => choice,
                };
                applied(self.probe.select_format(&id), "No such format")?;
            }
            Intent::SelectEntry { index, checked } => {
                applied(self.probe.set_entry_checked(index, checked), "No such playlist entry")?;
            }
            Intent::SelectAll(checked) => {
                applied(self.probe.set_all_checked(checked), "No playlist is shown")?;
            }
            Intent::SetLiveMode(mode) => {
                applied(self.probe.set_live_mode(mode), "No live stream is shown")?;
            }
            Intent::EnqueueSelected => self.enqueue_selected()?,
            Intent::SelectFolder => return Ok(Some(ApiRequest::SelectFolder)),
            Intent::OpenFolder => {
                let path = self.settings.job_options().save_path;
                if path.is_empty() {
                    return Err(ClientError::InvalidChoice("No save folder set".to_string()));
                }
                return Ok(Some(ApiRequest::OpenFolder { path }));
            }
            Intent::SaveSettings { concurrency } => {
                let options = self.settings.job_options();
                let settings = self.settings.apply_form(concurrency, options)?;
                self.dispatcher.save_settings(&settings)?;
            }
            Intent::DismissWelcome => {
                let settings = self.settings.dismiss_welcome()?;
                self.dispatcher.save_settings(&settings)?;
            }
            Intent::Copy(needle) => {
                let id = self.resolve_item(&needle)?;
                let text = self
                    .view
                    .item_node(&id)
                    .and_then(|node| node.copy_text())
                    .map(str::to_string)
                    .ok_or_else(|| ClientError::InvalidChoice("Only failed items can be copied".to_string()))?;
                self.view.show_panel(&[text]);
                let copied = self.translations.text_or("copied", "Copied!").to_string();
                self.status.notice(copied, now);
                self.pending.status = true;
            }
            Intent::Help => {
                let lines: Vec<String> = HELP.iter().map(|line| line.to_string()).collect();
                self.view.show_panel(&lines);
            }
            Intent::Invalid(message) => return Err(ClientError::InvalidChoice(message)),
            Intent::Quit => {}
        }
        Ok(None)
    }

    pub fn handle_api_reply(&mut self, reply: ApiReply, now: Instant) {
        match reply {
            ApiReply::Probe {
                generation,
                url,
                result,
            } => {
                if generation != self.probe_generation {
                    debug!("client: dropping stale probe result for {}", url);
                    return;
                }
                match result {
                    Ok(result) => {
                        debug!("client: probe of {} is {}", url, result.kind());
                        self.probe.show(result);
                        self.probe_url = Some(url);
                        self.pending.panel = true;
                    }
                    Err(failure) => self.notify(failure.error, now),
                }
            }
            ApiReply::Folder(Ok(Some(path))) => {
                self.settings.set_save_path(&path);
                self.notify(format!("Save folder: {}", path), now);
            }
            ApiReply::Folder(Ok(None)) => {}
            ApiReply::Folder(Err(failure)) | ApiReply::Opened(Err(failure)) => {
                self.notify(failure.error, now)
            }
            ApiReply::Opened(Ok(())) => {}
        }
    }

    /// Shows a rejected intent or failed request on the status line.
    pub fn report(&mut self, error: ClientError, now: Instant) {
        let text = match error {
            ClientError::EmptyUrlList => self
                .translations
                .text_or("alert_enter_url", "Please enter at least one URL.")
                .to_string(),
            other => other.to_string(),
        };
        debug!("client: rejected: {}", text);
        self.notify(text, now);
    }

    pub fn expire_notices(&mut self, now: Instant) {
        if self.status.expire(now) {
            self.pending.status = true;
        }
    }

    /// Pushes every scheduled change to the surface.
    pub fn flush(&mut self) {
        let pending = std::mem::take(&mut self.pending);

        if pending.full {
            self.view.render(self.store.snapshot());
        } else {
            let mut stale = false;
            for id in &pending.items {
                match self.store.get(id) {
                    Some(item) => stale |= !self.view.patch_item(item),
                    None => stale = true,
                }
            }
            for id in pending.progress.iter().filter(|id| !pending.items.contains(id)) {
                if let Some(item) = self.store.get(id) {
                    stale |= !self.view.patch_progress(id, item.progress, &item.details);
                }
            }
            if stale {
                self.view.render(self.store.snapshot());
            }
        }

        if pending.status {
            let text = self.status.text();
            self.view.show_status(&text);
        }
        if pending.panel {
            let lines = self.probe.describe();
            self.view.show_panel(&lines);
        }
    }

    /// Drives the controller until the user quits or the transport is gone.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
        mut intents: mpsc::UnboundedReceiver<Intent>,
        api: ApiClient,
    ) {
        let (reply_tx, mut replies) = mpsc::unbounded_channel();

        loop {
            let deadline = self.status.next_deadline();
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        info!("client: transport closed");
                        break;
                    };
                    let now = Instant::now();
                    self.handle_transport(event, now);
                    while let Ok(event) = events.try_recv() {
                        self.handle_transport(event, now);
                    }
                }
                intent = intents.recv() => {
                    let now = Instant::now();
                    match intent {
                        None | Some(Intent::Quit) => break,
                        Some(intent) => match self.handle_intent(intent, now) {
                            Ok(Some(request)) => {
                                let api = api.clone();
                                let reply_tx = reply_tx.clone();
                                tokio::spawn(async move {
                                    let _ = reply_tx.send(request.execute(&api).await);
                                });
                            }
                            Ok(None) => {}
                            Err(e) => self.report(e, now),
                        },
                    }
                }
                Some(reply) = replies.recv() => {
                    self.handle_api_reply(reply, Instant::now());
                }
                _ = sleep_until(deadline) => {
                    self.expire_notices(Instant::now());
                }
            }
            self.flush();
        }
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    pub fn view(&self) -> &ViewProjector<S> {
        &self.view
    }

    pub fn settings(&self) -> &SettingsState {
        &self.settings
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn probe(&self) -> &ProbePanel {
        &self.probe
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn enqueue_selected(&mut self) -> Result<()> {
        let mut options = self.settings.job_options();
        let urls = match self.probe.view() {
            ProbeView::Hidden => {
                return Err(ClientError::InvalidChoice("Nothing has been probed".to_string()))
            }
            ProbeView::Playlist { .. } => self.probe.selected_playlist_items(),
            ProbeView::Single { selected, .. } => {
                if let Some(format) = selected {
                    options.selected_format = format.clone();
                }
                self.probe_url.iter().cloned().collect()
            }
            ProbeView::Live { mode, .. } => {
                options.live_mode = Some(*mode);
                self.probe_url.iter().cloned().collect()
            }
        };
        self.dispatcher.enqueue(urls, options)?;
        self.probe.hide();
        self.probe_url = None;
        self.pending.panel = true;
        Ok(())
    }

    /// Exact id, else the single id starting with `needle`.
    fn resolve_item(&self, needle: &str) -> Result<String> {
        if self.store.get(needle).is_some() {
            return Ok(needle.to_string());
        }
        let mut matches = self.store.snapshot().ids().filter(|id| id.starts_with(needle));
        match (matches.next(), matches.next()) {
            (Some(id), None) if !needle.is_empty() => Ok(id.to_string()),
            _ => Err(ClientError::UnknownItem(needle.to_string())),
        }
    }

    fn notify(&mut self, text: String, now: Instant) {
        self.status.notice(text, now);
        self.pending.status = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DownloadItem, ItemStatus};
    use crate::transport::NamedEvent;
    use crate::view::{ItemNode, ListNode};
    use serde_json::{json, Value};

    #[derive(Debug, Default)]
    struct Recording {
        full_renders: usize,
        replaced: usize,
        progressed: usize,
        status: String,
        panel: Vec<String>,
    }

    impl Surface for Recording {
        fn replace_all(&mut self, _nodes: &[ListNode]) {
            self.full_renders += 1;
        }
        fn replace_node(&mut self, _index: usize, _node: &ItemNode) {
            self.replaced += 1;
        }
        fn update_progress(&mut self, _index: usize, _node: &ItemNode) {
            self.progressed += 1;
        }
        fn show_status(&mut self, text: &str) {
            self.status = text.to_string();
        }
        fn show_panel(&mut self, lines: &[String]) {
            self.panel = lines.to_vec();
        }
    }

    fn client() -> (QueueClient<Recording>, mpsc::UnboundedReceiver<NamedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = QueueClient::new(
            Recording::default(),
            CommandDispatcher::new(tx),
            Arc::new(Translations::builtin()),
        );
        (client, rx)
    }

    fn inbound(name: &str, payload: Value) -> TransportEvent {
        TransportEvent::Event(NamedEvent::new(name, payload))
    }

    fn sent(rx: &mut mpsc::UnboundedReceiver<NamedEvent>) -> Vec<NamedEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn starts_with_placeholder() {
        let (client, _rx) = client();
        assert_eq!(
            client.view().nodes(),
            &[ListNode::Placeholder("No downloads yet.".into())]
        );
    }

    #[test]
    fn progress_burst_is_drawn_once() {
        let (mut client, _rx) = client();
        let now = Instant::now();
        client.handle_transport(
            inbound("queue_update", json!({"queue": {"a": {"id": "a", "url": "u", "status": "downloading"}}})),
            now,
        );
        client.flush();
        assert_eq!(client.view().surface().full_renders, 2);

        for p in 1..=10 {
            client.handle_transport(
                inbound("download_progress", json!({"id": "a", "progress": p * 10, "details": format!("tick {p}")})),
                now,
            );
        }
        client.flush();

        let surface = client.view().surface();
        assert_eq!(surface.progressed, 1);
        assert_eq!(surface.full_renders, 2);
        let node = client.view().item_node("a").unwrap();
        assert_eq!(node.progress, 100.0);
        assert_eq!(node.details, "tick 10");
    }

    #[test]
    fn replace_patches_one_node_and_insert_renders() {
        let (mut client, _rx) = client();
        let now = Instant::now();
        client.handle_transport(
            inbound("queue_update", json!({"queue": {"a": {"id": "a", "url": "u"}}})),
            now,
        );
        client.flush();

        client.handle_transport(
            inbound("item_update", json!({"item": {"id": "a", "url": "u", "status": "downloading"}})),
            now,
        );
        client.handle_transport(
            inbound("download_progress", json!({"id": "a", "progress": 5})),
            now,
        );
        client.flush();
        assert_eq!(client.view().surface().replaced, 1);
        assert_eq!(client.view().surface().progressed, 0);
        assert_eq!(client.view().item_node("a").unwrap().progress, 5.0);

        client.handle_transport(inbound("item_update", json!({"item": {"id": "b", "url": "v"}})), now);
        client.flush();
        assert_eq!(client.view().surface().full_renders, 3);
        assert_eq!(client.view().nodes().len(), 2);
    }

    #[test]
    fn reconnect_snapshot_replaces_missed_state() {
        let (mut client, _rx) = client();
        let now = Instant::now();
        client.handle_transport(TransportEvent::Connected, now);
        client.handle_transport(
            inbound("queue_update", json!({"queue": {"a": {"id": "a", "url": "u", "status": "downloading"}}})),
            now,
        );

        client.handle_transport(TransportEvent::Disconnected { reason: "gone".into() }, now);
        assert!(!client.is_connected());
        // a delta that raced the reconnect is shown until the snapshot lands
        client.handle_transport(inbound("item_update", json!({"item": {"id": "b", "url": "v"}})), now);
        client.handle_transport(TransportEvent::Connected, now);
        assert!(client.is_connected());
        assert_eq!(client.store().snapshot().len(), 2);

        client.handle_transport(
            inbound("queue_update", json!({"queue": {"a": {"id": "a", "url": "u", "status": "completed"}}})),
            now,
        );
        client.flush();
        assert_eq!(client.view().nodes().len(), 1);
        assert_eq!(client.view().item_node("a").unwrap().status_key, "completed");
    }

    #[test]
    fn empty_add_shows_alert_and_sends_nothing() {
        let (mut client, mut rx) = client();
        let now = Instant::now();
        let err = client.handle_intent(Intent::Add(" \n\n ".into()), now).unwrap_err();
        client.report(err, now);
        client.flush();
        assert!(sent(&mut rx).is_empty());
        assert_eq!(client.view().surface().status, "Please enter at least one URL.");
    }

    #[test]
    fn add_uses_remembered_options() {
        let (mut client, mut rx) = client();
        let now = Instant::now();
        client.handle_transport(
            inbound("settings_loaded", json!({"settings": {
                "general": {"concurrentDownloads": 2, "showWelcomeNotice": false},
                "last_options": {"savePath": "/dl", "cookieBrowser": "firefox"}
            }})),
            now,
        );
        client
            .handle_intent(Intent::Add("  https://a \n\nhttps://b\n".into()), now)
            .unwrap();
        let events = sent(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["urls"], json!(["https://a", "https://b"]));
        assert_eq!(events[0].payload["options"]["savePath"], json!("/dl"));
        assert_eq!(events[0].payload["options"]["cookieBrowser"], json!("firefox"));
    }

    #[test]
    fn remove_accepts_id_prefix() {
        let (mut client, mut rx) = client();
        let now = Instant::now();
        client.handle_transport(
            inbound("queue_update", json!({"queue": {
                "3f2a-1": {"url": "u"}, "9bc0-2": {"url": "v"}
            }})),
            now,
        );
        client.handle_intent(Intent::Remove("9b".into()), now).unwrap();
        assert_eq!(sent(&mut rx)[0].payload, json!({"id": "9bc0-2"}));

        let err = client.handle_intent(Intent::Remove("zz".into()), now).unwrap_err();
        assert!(matches!(err, ClientError::UnknownItem(_)));
        assert!(sent(&mut rx).is_empty());
    }

    #[test]
    fn update_trigger_refused_while_updating() {
        let (mut client, mut rx) = client();
        let now = Instant::now();
        client.handle_transport(
            inbound("update_status", json!({"message_key": "update_status_updating"})),
            now,
        );
        let err = client.handle_intent(Intent::UpdateTool, now).unwrap_err();
        assert!(matches!(err, ClientError::UpdateInProgress));
        assert!(sent(&mut rx).is_empty());

        client.handle_transport(
            inbound("update_status", json!({"message_key": "update_status_failed"})),
            now,
        );
        client.handle_intent(Intent::UpdateTool, now).unwrap();
        assert_eq!(sent(&mut rx)[0].name, "update_yt_dlp");
    }

    #[test]
    fn stale_probe_replies_are_dropped() {
        let (mut client, _rx) = client();
        let now = Instant::now();
        let first = client.handle_intent(Intent::Probe("https://one".into()), now).unwrap();
        let second = client.handle_intent(Intent::Probe("https://two".into()), now).unwrap();
        let (Some(ApiRequest::Probe { generation: g1, .. }), Some(ApiRequest::Probe { generation: g2, .. })) =
            (first, second)
        else {
            panic!("expected probe requests");
        };

        let live = ContentProbeResult::from_value(json!({"content_type": "live", "is_live": true})).unwrap();
        client.handle_api_reply(
            ApiReply::Probe { generation: g1, url: "https://one".into(), result: Ok(live) },
            now,
        );
        assert!(!client.probe().is_visible());

        let single = ContentProbeResult::from_value(json!({"formats": []})).unwrap();
        client.handle_api_reply(
            ApiReply::Probe { generation: g2, url: "https://two".into(), result: Ok(single) },
            now,
        );
        client.flush();
        assert!(client.probe().is_visible());
        assert!(client.view().surface().panel[0].starts_with("Single video"));
    }

    #[test]
    fn probe_failure_is_one_notice() {
        let (mut client, _rx) = client();
        let now = Instant::now();
        client.handle_intent(Intent::Probe("x".into()), now).unwrap();
        client.handle_api_reply(
            ApiReply::Probe {
                generation: 1,
                url: "x".into(),
                result: Err(ApiFailure::new("Server returned 500")),
            },
            now,
        );
        client.flush();
        assert_eq!(client.view().surface().status, "Server returned 500");
        assert!(client.store().snapshot().is_empty());
    }

    #[test]
    fn live_enqueue_carries_record_mode() {
        let (mut client, mut rx) = client();
        let now = Instant::now();
        client.handle_intent(Intent::Probe("https://live".into()), now).unwrap();
        let live = ContentProbeResult::from_value(json!({"content_type": "live", "is_live": false})).unwrap();
        client.handle_api_reply(
            ApiReply::Probe { generation: 1, url: "https://live".into(), result: Ok(live) },
            now,
        );
        client.handle_intent(Intent::SetLiveMode(LiveMode::Safe), now).unwrap();
        client.handle_intent(Intent::EnqueueSelected, now).unwrap();

        let events = sent(&mut rx);
        assert_eq!(events[0].payload["urls"], json!(["https://live"]));
        assert_eq!(events[0].payload["options"]["liveMode"], json!("safe"));
        assert!(!client.probe().is_visible());
    }

    #[test]
    fn single_enqueue_uses_picked_format() {
        let (mut client, mut rx) = client();
        let now = Instant::now();
        client.handle_intent(Intent::Probe("https://v".into()), now).unwrap();
        let single = ContentProbeResult::from_value(json!({"formats": [
            {"id": "137+140", "resolution": "1080p", "ext": "mp4"},
            {"id": "22", "resolution": "720p", "ext": "mp4"}
        ]}))
        .unwrap();
        client.handle_api_reply(
            ApiReply::Probe { generation: 1, url: "https://v".into(), result: Ok(single) },
            now,
        );

        assert!(client.handle_intent(Intent::PickFormat("9".into()), now).is_err());
        client.handle_intent(Intent::PickFormat("1".into()), now).unwrap();
        client.handle_intent(Intent::EnqueueSelected, now).unwrap();
        let events = sent(&mut rx);
        assert_eq!(events[0].payload["options"]["selectedFormat"], json!("22"));
    }

    #[test]
    fn folder_reply_updates_save_path() {
        let (mut client, _rx) = client();
        let now = Instant::now();
        assert!(client.handle_intent(Intent::OpenFolder, now).is_err());
        assert_eq!(
            client.handle_intent(Intent::SelectFolder, now).unwrap(),
            Some(ApiRequest::SelectFolder)
        );
        client.handle_api_reply(ApiReply::Folder(Ok(Some("/videos".into()))), now);
        assert_eq!(client.settings().job_options().save_path, "/videos");
        assert_eq!(
            client.handle_intent(Intent::OpenFolder, now).unwrap(),
            Some(ApiRequest::OpenFolder { path: "/videos".into() })
        );
    }

    #[test]
    fn copy_only_for_failed_items() {
        let (mut client, _rx) = client();
        let now = Instant::now();
        client.handle_server_event(
            ServerEvent::QueueUpdate {
                queue: vec![
                    DownloadItem::new("a", "u").with_status(ItemStatus::Error).with_details("HTTP 403"),
                    DownloadItem::new("b", "v"),
                ]
                .into_iter()
                .collect(),
            },
            now,
        );
        client.flush();
        client.handle_intent(Intent::Copy("a".into()), now).unwrap();
        assert_eq!(client.view().surface().panel, vec!["HTTP 403".to_string()]);
        assert!(client.handle_intent(Intent::Copy("b".into()), now).is_err());
    }

    #[test]
    fn save_and_dismiss_send_full_settings() {
        let (mut client, mut rx) = client();
        let now = Instant::now();
        client.handle_transport(
            inbound("settings_loaded", json!({"settings": {"general": {"showWelcomeNotice": true, "theme": "dark"}}})),
            now,
        );
        client.flush();
        assert!(client.view().surface().status.starts_with("Welcome"));

        client.handle_intent(Intent::SaveSettings { concurrency: Some(3) }, now).unwrap();
        client.handle_intent(Intent::DismissWelcome, now).unwrap();
        let events = sent(&mut rx);
        assert_eq!(events[0].payload["settings"]["general"]["concurrentDownloads"], json!(3));
        assert_eq!(events[1].payload["settings"]["general"]["showWelcomeNotice"], json!(false));
        assert_eq!(events[1].payload["settings"]["general"]["theme"], json!("dark"));
    }

    #[test]
    fn settings_writes_wait_for_first_load() {
        let (mut client, mut rx) = client();
        let now = Instant::now();
        let err = client
            .handle_intent(Intent::SaveSettings { concurrency: Some(2) }, now)
            .unwrap_err();
        assert!(matches!(err, ClientError::SettingsNotLoaded));
        assert!(matches!(
            client.handle_intent(Intent::DismissWelcome, now),
            Err(ClientError::SettingsNotLoaded)
        ));
        assert!(sent(&mut rx).is_empty());
        assert!(!client.settings().is_loaded());
    }

    #[test]
    fn null_field_in_loaded_settings_keeps_the_rest() {
        let (mut client, mut rx) = client();
        let now = Instant::now();
        client.handle_transport(
            inbound("settings_loaded", json!({"settings": {
                "general": {"concurrentDownloads": null, "showWelcomeNotice": true},
                "last_options": {"savePath": "/srv/videos", "cookieBrowser": "firefox", "proxy": "socks5://x"}
            }})),
            now,
        );
        assert!(client.settings().is_loaded());

        client.handle_intent(Intent::DismissWelcome, now).unwrap();
        let events = sent(&mut rx);
        assert_eq!(events.len(), 1);
        let saved = &events[0].payload["settings"];
        assert_eq!(saved["general"]["concurrentDownloads"], json!(1));
        assert_eq!(saved["general"]["showWelcomeNotice"], json!(false));
        assert_eq!(saved["last_options"]["savePath"], json!("/srv/videos"));
        assert_eq!(saved["last_options"]["cookieBrowser"], json!("firefox"));
        assert_eq!(saved["last_options"]["proxy"], json!("socks5://x"));
    }

    #[tokio::test(start_paused = true)]
    async fn saved_toast_expires() {
        let (mut client, _rx) = client();
        let start = Instant::now();
        client.handle_transport(inbound("settings_saved", json!({"message_key": "settings_saved"})), start);
        client.flush();
        assert_eq!(client.view().surface().status, "Settings saved.");

        tokio::time::advance(std::time::Duration::from_secs(2)).await;
        client.expire_notices(Instant::now());
        client.flush();
        assert_eq!(client.view().surface().status, "");
    }
}
