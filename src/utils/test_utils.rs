//! In-memory stand-ins for the page, the runtime channel, the provider and
//! the browser tab/window APIs.

use crate::core::background::{TabBroker, TabId, TabInfo, WindowError, WindowId, WindowManager};
use crate::core::protocol::{ChannelError, Reply, Request, RuntimeChannel, VisibleChat};
use crate::core::providers::{Completer, Provider, ProviderError};
use crate::core::settings::Settings;
use crate::page::{ChatHeader, ElementId, PageAdapter};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Focus(ElementId),
    SelectAll(ElementId),
    SelectContents(ElementId),
    Insert(ElementId, String),
    SetText(ElementId, String),
    Click(ElementId),
    Enter(ElementId),
    ShowOverlay,
    HideOverlay,
}

#[derive(Default)]
struct PageState {
    next_id: u64,
    editables: Vec<(ElementId, String)>,
    active: Option<ElementId>,
    selected: Option<ElementId>,
    select_all_broken: bool,
    send_controls: HashMap<ElementId, ElementId>,
    headers: Vec<(ChatHeader, Option<ElementId>)>,
    overlay_visible: bool,
    events: Vec<PageEvent>,
    sent: Vec<String>,
}

impl PageState {
    fn allocate(&mut self) -> ElementId {
        self.next_id += 1;
        ElementId(self.next_id)
    }

    fn text_mut(&mut self, element: ElementId) -> Option<&mut String> {
        self.editables
            .iter_mut()
            .find(|(id, _)| *id == element)
            .map(|(_, text)| text)
    }

    fn send(&mut self, field: ElementId) {
        if let Some(text) = self.text_mut(field) {
            let message = std::mem::take(text);
            self.sent.push(message);
        }
    }
}

/// A page with editable fields, optional send buttons and chat headers.
/// Submitting a field moves its text to [`FakePage::sent`] and clears it.
pub struct FakePage {
    location: String,
    state: Mutex<PageState>,
}

impl FakePage {
    pub fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            state: Mutex::new(PageState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, PageState> {
        self.state.lock().unwrap()
    }

    pub fn add_editable(&self, text: &str) -> ElementId {
        let mut state = self.state();
        let id = state.allocate();
        state.editables.push((id, text.to_string()));
        id
    }

    pub fn add_send_control(&self, field: ElementId) -> ElementId {
        let mut state = self.state();
        let id = state.allocate();
        state.send_controls.insert(field, id);
        id
    }

    pub fn add_header(&self, text: &str, visible: bool, editable: Option<ElementId>) -> usize {
        let mut state = self.state();
        let index = state.headers.len();
        state.headers.push((
            ChatHeader {
                index,
                text: text.to_string(),
                visible,
            },
            editable,
        ));
        index
    }

    /// Make the editor's select-all a no-op, as some rich-text editors do.
    pub fn break_select_all(&self) {
        self.state().select_all_broken = true;
    }

    pub fn activate(&self, element: ElementId) {
        self.state().active = Some(element);
    }

    pub fn events(&self) -> Vec<PageEvent> {
        self.state().events.clone()
    }

    pub fn clear_events(&self) {
        self.state().events.clear();
    }

    pub fn inserts(&self) -> Vec<String> {
        self.state()
            .events
            .iter()
            .filter_map(|event| match event {
                PageEvent::Insert(_, text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn submissions(&self) -> usize {
        self.state()
            .events
            .iter()
            .filter(|event| matches!(event, PageEvent::Click(_) | PageEvent::Enter(_)))
            .count()
    }

    /// Messages submitted so far, oldest first.
    pub fn sent(&self) -> Vec<String> {
        self.state().sent.clone()
    }

    pub fn overlay_visible(&self) -> bool {
        self.state().overlay_visible
    }
}

impl PageAdapter for FakePage {
    fn location(&self) -> String {
        self.location.clone()
    }

    fn active_editable(&self) -> Option<ElementId> {
        self.state().active
    }

    fn first_editable(&self) -> Option<ElementId> {
        self.state().editables.first().map(|(id, _)| *id)
    }

    fn text(&self, element: ElementId) -> String {
        self.state()
            .text_mut(element)
            .map(|text| text.clone())
            .unwrap_or_default()
    }

    fn focus(&self, element: ElementId) {
        let mut state = self.state();
        state.active = Some(element);
        state.events.push(PageEvent::Focus(element));
    }

    fn select_all(&self, element: ElementId) {
        let mut state = self.state();
        state.events.push(PageEvent::SelectAll(element));
        if !state.select_all_broken {
            state.selected = Some(element);
        }
    }

    fn selection_text(&self) -> String {
        let mut state = self.state();
        match state.selected {
            Some(element) => state
                .text_mut(element)
                .map(|text| text.clone())
                .unwrap_or_default(),
            None => String::new(),
        }
    }

    fn select_contents(&self, element: ElementId) {
        let mut state = self.state();
        state.events.push(PageEvent::SelectContents(element));
        state.selected = Some(element);
    }

    fn insert_text(&self, element: ElementId, text: &str) {
        let mut state = self.state();
        state.events.push(PageEvent::Insert(element, text.to_string()));
        let replace = state.selected == Some(element);
        state.selected = None;
        if let Some(current) = state.text_mut(element) {
            if replace {
                *current = text.to_string();
            } else {
                current.push_str(text);
            }
        }
    }

    fn set_text(&self, element: ElementId, text: &str) {
        let mut state = self.state();
        state.events.push(PageEvent::SetText(element, text.to_string()));
        if let Some(current) = state.text_mut(element) {
            *current = text.to_string();
        }
    }

    fn find_send_control(&self, element: ElementId) -> Option<ElementId> {
        self.state().send_controls.get(&element).copied()
    }

    fn click(&self, control: ElementId) {
        let mut state = self.state();
        state.events.push(PageEvent::Click(control));
        let field = state
            .send_controls
            .iter()
            .find(|(_, button)| **button == control)
            .map(|(field, _)| *field);
        if let Some(field) = field {
            state.send(field);
        }
    }

    fn dispatch_enter(&self, element: ElementId) {
        let mut state = self.state();
        state.events.push(PageEvent::Enter(element));
        state.send(element);
    }

    fn show_loading_overlay(&self) {
        let mut state = self.state();
        state.overlay_visible = true;
        state.events.push(PageEvent::ShowOverlay);
    }

    fn hide_loading_overlay(&self) {
        let mut state = self.state();
        state.overlay_visible = false;
        state.events.push(PageEvent::HideOverlay);
    }

    fn chat_headers(&self) -> Vec<ChatHeader> {
        self.state()
            .headers
            .iter()
            .map(|(header, _)| header.clone())
            .collect()
    }

    fn editable_near_header(&self, index: usize, _max_levels: usize) -> Option<ElementId> {
        self.state()
            .headers
            .get(index)
            .and_then(|(_, editable)| *editable)
    }
}

type Responder = Box<dyn Fn(&Request) -> Reply + Send + Sync>;

/// Scripted runtime channel. GENERATE_RESPONSE answers with the configured
/// text, everything else with a bare acknowledgement.
pub struct FakeChannel {
    valid: AtomicBool,
    responder: Mutex<Responder>,
    failures: Mutex<VecDeque<ChannelError>>,
    sent: Mutex<Vec<Request>>,
    broadcasts: Mutex<Vec<Request>>,
    gate: watch::Sender<bool>,
    sent_counter: watch::Sender<usize>,
}

impl Default for FakeChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeChannel {
    pub fn new() -> Self {
        Self::replying("Hi there!")
    }

    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self {
            valid: AtomicBool::new(true),
            responder: Mutex::new(Box::new(move |request| match request {
                Request::GenerateResponse { .. } => Reply::text(text.clone()),
                _ => Reply::ack(),
            })),
            failures: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            broadcasts: Mutex::new(Vec::new()),
            gate: watch::channel(true).0,
            sent_counter: watch::channel(0).0,
        }
    }

    pub fn respond_with(&self, responder: impl Fn(&Request) -> Reply + Send + Sync + 'static) {
        *self.responder.lock().unwrap() = Box::new(responder);
    }

    /// Simulate the extension being unloaded under the page.
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }

    pub fn fail_next(&self, error: ChannelError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Park every reply until [`FakeChannel::release`].
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Resolve once at least `count` requests have been sent.
    pub async fn wait_for_sent(&self, count: usize) {
        let mut counter = self.sent_counter.subscribe();
        counter.wait_for(|sent| *sent >= count).await.unwrap();
    }

    pub fn sent(&self) -> Vec<Request> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn broadcasts(&self) -> Vec<Request> {
        self.broadcasts.lock().unwrap().clone()
    }
}

#[async_trait]
impl RuntimeChannel for FakeChannel {
    fn is_context_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    async fn send(&self, request: Request) -> Result<Reply, ChannelError> {
        let count = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(request.clone());
            sent.len()
        };
        self.sent_counter.send_replace(count);

        let mut gate = self.gate.subscribe();
        gate.wait_for(|open| *open).await.unwrap();

        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let reply = (self.responder.lock().unwrap())(&request);
        Ok(reply)
    }

    fn broadcast(&self, request: Request) -> Result<(), ChannelError> {
        self.broadcasts.lock().unwrap().push(request);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCall {
    pub prompt: String,
    pub system_instruction: Option<String>,
    pub model: String,
}

enum CompleterScript {
    Text(String),
    CredentialError,
}

pub struct FakeCompleter {
    script: Mutex<CompleterScript>,
    calls: Mutex<Vec<CompletionCall>>,
}

impl FakeCompleter {
    pub fn replying(text: &str) -> Self {
        Self {
            script: Mutex::new(CompleterScript::Text(text.to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_with_credential_error(&self) {
        *self.script.lock().unwrap() = CompleterScript::CredentialError;
    }

    pub fn calls(&self) -> Vec<CompletionCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completer for FakeCompleter {
    async fn complete(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        settings: &Settings,
    ) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(CompletionCall {
            prompt: prompt.to_string(),
            system_instruction: system_instruction.map(str::to_owned),
            model: settings.model.clone(),
        });
        match &*self.script.lock().unwrap() {
            CompleterScript::Text(text) => Ok(text.clone()),
            CompleterScript::CredentialError => Err(ProviderError::Credential {
                provider: Provider::Gemini,
            }),
        }
    }
}

struct FakeTab {
    info: TabInfo,
    chats: Result<Vec<VisibleChat>, ChannelError>,
    requests: Vec<Request>,
}

/// Tabs that answer GET_CHAT_NAME with a fixed list, or fail every request.
#[derive(Default)]
pub struct FakeTabs {
    tabs: Mutex<Vec<FakeTab>>,
}

impl FakeTabs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tab(&self, id: TabId, url: &str, chats: Result<Vec<VisibleChat>, ChannelError>) {
        self.tabs.lock().unwrap().push(FakeTab {
            info: TabInfo {
                id,
                url: url.to_string(),
                active: false,
            },
            chats,
            requests: Vec::new(),
        });
    }

    pub fn requests_for(&self, id: TabId) -> Vec<Request> {
        self.tabs
            .lock()
            .unwrap()
            .iter()
            .find(|tab| tab.info.id == id)
            .map(|tab| tab.requests.clone())
            .unwrap_or_default()
    }

    pub fn messages_sent_to(&self, id: TabId) -> usize {
        self.requests_for(id).len()
    }
}

#[async_trait]
impl TabBroker for FakeTabs {
    async fn query_tabs(&self, _url_pattern: &str) -> Vec<TabInfo> {
        self.tabs
            .lock()
            .unwrap()
            .iter()
            .map(|tab| tab.info.clone())
            .collect()
    }

    async fn send_to_tab(&self, tab_id: TabId, request: Request) -> Result<Reply, ChannelError> {
        let mut tabs = self.tabs.lock().unwrap();
        let Some(tab) = tabs.iter_mut().find(|tab| tab.info.id == tab_id) else {
            return Err(ChannelError::Disconnected(format!("No tab with id {tab_id}")));
        };
        tab.requests.push(request.clone());
        match (&tab.chats, request) {
            (Err(err), _) => Err(err.clone()),
            (Ok(chats), Request::GetChatName) => Ok(Reply::visible_chats(chats.clone())),
            (Ok(_), _) => Ok(Reply::ack()),
        }
    }
}

#[derive(Default)]
pub struct FakeWindows {
    next_id: AtomicU64,
    open: Mutex<Vec<WindowId>>,
    focused: Mutex<Vec<WindowId>>,
}

impl FakeWindows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self, id: WindowId) {
        self.open.lock().unwrap().retain(|open| *open != id);
    }

    pub fn created(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }

    pub fn focused(&self) -> Vec<WindowId> {
        self.focused.lock().unwrap().clone()
    }
}

#[async_trait]
impl WindowManager for FakeWindows {
    async fn window_exists(&self, id: WindowId) -> bool {
        self.open.lock().unwrap().contains(&id)
    }

    async fn focus(&self, id: WindowId) -> Result<(), WindowError> {
        self.focused.lock().unwrap().push(id);
        Ok(())
    }

    async fn create_popup(&self) -> Result<WindowId, WindowError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.open.lock().unwrap().push(id);
        Ok(id)
    }
}
