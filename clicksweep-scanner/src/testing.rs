//! Scripted in-memory [`Driver`] used by the unit tests.

use crate::driver::{Driver, ElementRef};
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
pub enum ClickBehavior {
    SamePage,
    NavigateTo(String),
    /// Native click fails (overlay); programmatic dispatch works.
    Obscured,
    /// Native click fails; dispatch navigates.
    ObscuredNavigateTo(String),
    /// Native click navigates, then reports a timeout anyway.
    NavigateThenFail(String),
    Broken(String),
}

#[derive(Debug, Clone)]
pub struct MockElement {
    pub text: Option<String>,
    pub selectors: Vec<String>,
    pub region: Option<String>,
    pub visible: bool,
    pub enabled: bool,
    /// Element only mounts once the viewport has reached this offset.
    pub appears_at: u64,
    pub behavior: ClickBehavior,
}

impl MockElement {
    pub fn new(selector: &str, text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            selectors: vec![selector.to_string()],
            region: None,
            visible: true,
            enabled: true,
            appears_at: 0,
            behavior: ClickBehavior::SamePage,
        }
    }

    pub fn button(text: &str) -> Self {
        Self::new("button", text)
    }

    pub fn link(text: &str) -> Self {
        Self::new("a", text)
    }

    pub fn unreadable(selector: &str) -> Self {
        let mut element = Self::new(selector, "");
        element.text = None;
        element
    }

    pub fn also(mut self, selector: &str) -> Self {
        self.selectors.push(selector.to_string());
        self
    }

    pub fn in_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn lazy(mut self, offset: u64) -> Self {
        self.appears_at = offset;
        self
    }

    pub fn navigates_to(mut self, url: &str) -> Self {
        self.behavior = ClickBehavior::NavigateTo(url.to_string());
        self
    }

    pub fn behaves(mut self, behavior: ClickBehavior) -> Self {
        self.behavior = behavior;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockPage {
    pub height: u64,
    pub elements: Vec<MockElement>,
    /// Quiescence never arrives on this page.
    pub hangs: bool,
}

impl MockPage {
    pub fn new(elements: Vec<MockElement>) -> Self {
        Self {
            height: 0,
            elements,
            hangs: false,
        }
    }

    pub fn tall(mut self, height: u64) -> Self {
        self.height = height;
        self
    }

    pub fn hanging(mut self) -> Self {
        self.hangs = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Query(String),
    Resolve(String),
    Click(String),
    Dispatch(String),
    Goto(String),
    Back,
    Quiescence(String),
    ScrollTo(u64),
    Remove(Vec<String>),
}

#[derive(Debug, Default)]
struct MockState {
    url: String,
    history: Vec<String>,
    scroll_y: u64,
    max_scroll: u64,
    removed: HashSet<String>,
    calls: Vec<Call>,
    alive: bool,
    native_clicks: usize,
}

pub struct MockDriver {
    pages: HashMap<String, MockPage>,
    state: Mutex<MockState>,
    cancel_on_click: Mutex<Option<(usize, CancellationToken)>>,
    die_on_click: Option<usize>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            state: Mutex::new(MockState {
                alive: true,
                ..MockState::default()
            }),
            cancel_on_click: Mutex::new(None),
            die_on_click: None,
        }
    }

    pub fn page(mut self, url: &str, page: MockPage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Start the driver already sitting on `url`.
    pub fn at(self, url: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.url = url.to_string();
            state.history.push(url.to_string());
        }
        self
    }

    /// Cancel `token` when the `n`th native click happens.
    pub fn cancel_on_click(self, n: usize, token: CancellationToken) -> Self {
        *self.cancel_on_click.lock().unwrap() = Some((n, token));
        self
    }

    /// Simulate the browser going away on the `n`th click.
    pub fn die_on_click(mut self, n: usize) -> Self {
        self.die_on_click = Some(n);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn click_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Click(_) | Call::Dispatch(_)))
            .collect()
    }

    pub fn url(&self) -> String {
        self.state.lock().unwrap().url.clone()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn current_page(&self) -> Option<&MockPage> {
        let url = self.state.lock().unwrap().url.clone();
        self.pages.get(&url)
    }

    fn mounted(&self, element: &MockElement) -> bool {
        let state = self.state.lock().unwrap();
        let removed = element
            .region
            .as_ref()
            .map(|r| state.removed.contains(r))
            .unwrap_or(false);
        !removed && element.appears_at <= state.max_scroll
    }

    fn element(&self, element: &ElementRef) -> Result<MockElement> {
        let index: usize = element
            .key
            .parse()
            .map_err(|_| ScanError::Other(format!("bad element key {}", element.key)))?;
        self.current_page()
            .and_then(|p| p.elements.get(index))
            .cloned()
            .ok_or_else(|| ScanError::Browser("element detached".to_string()))
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.state.lock().unwrap().alive {
            Ok(())
        } else {
            Err(ScanError::ContextLost("page closed".to_string()))
        }
    }

    fn navigate(&self, url: &str) {
        let mut state = self.state.lock().unwrap();
        state.url = url.to_string();
        state.history.push(url.to_string());
        state.scroll_y = 0;
        state.max_scroll = 0;
        state.removed.clear();
    }

    fn count_click(&self) {
        let clicks = {
            let mut state = self.state.lock().unwrap();
            state.native_clicks += 1;
            state.native_clicks
        };
        if let Some((n, token)) = self.cancel_on_click.lock().unwrap().as_ref()
            && *n == clicks
        {
            token.cancel();
        }
        if self.die_on_click == Some(clicks) {
            self.state.lock().unwrap().alive = false;
        }
    }

    fn apply(&self, behavior: &ClickBehavior) {
        match behavior {
            ClickBehavior::NavigateTo(url) | ClickBehavior::ObscuredNavigateTo(url) => {
                self.navigate(url)
            }
            _ => {}
        }
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn query_texts(&self, selector: &str) -> Result<Vec<Option<String>>> {
        self.ensure_alive()?;
        self.record(Call::Query(selector.to_string()));
        let (region, shape) = match selector.split_once(' ') {
            Some((region, shape)) => (Some(region), shape),
            None => (None, selector),
        };
        let Some(page) = self.current_page() else {
            return Ok(Vec::new());
        };
        Ok(page
            .elements
            .iter()
            .filter(|e| e.selectors.iter().any(|s| s == shape))
            .filter(|e| region.is_none() || e.region.as_deref() == region)
            .filter(|e| self.mounted(e))
            .map(|e| e.text.clone())
            .collect())
    }

    async fn resolve_by_text(&self, text: &str) -> Result<Option<ElementRef>> {
        self.ensure_alive()?;
        self.record(Call::Resolve(text.to_string()));
        let Some(page) = self.current_page() else {
            return Ok(None);
        };
        Ok(page
            .elements
            .iter()
            .position(|e| e.text.as_deref() == Some(text) && self.mounted(e))
            .map(|i| ElementRef::new(i.to_string())))
    }

    async fn is_visible(&self, element: &ElementRef) -> Result<bool> {
        Ok(self.element(element)?.visible)
    }

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool> {
        Ok(self.element(element)?.enabled)
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<()> {
        self.element(element).map(|_| ())
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        self.ensure_alive()?;
        let target = self.element(element)?;
        self.record(Call::Click(target.text.clone().unwrap_or_default()));
        self.count_click();
        self.ensure_alive()?;
        match &target.behavior {
            ClickBehavior::Obscured | ClickBehavior::ObscuredNavigateTo(_) => Err(
                ScanError::Browser("element is covered by another element".to_string()),
            ),
            ClickBehavior::Broken(reason) => Err(ScanError::Browser(reason.clone())),
            ClickBehavior::NavigateThenFail(url) => {
                self.navigate(url);
                Err(ScanError::Timeout {
                    what: "click".to_string(),
                    ms: 3000,
                })
            }
            behavior => {
                self.apply(behavior);
                Ok(())
            }
        }
    }

    async fn dispatch_click(&self, element: &ElementRef) -> Result<()> {
        self.ensure_alive()?;
        let target = self.element(element)?;
        self.record(Call::Dispatch(target.text.clone().unwrap_or_default()));
        match &target.behavior {
            ClickBehavior::Broken(reason) => Err(ScanError::Script(reason.clone())),
            behavior => {
                self.apply(behavior);
                Ok(())
            }
        }
    }

    async fn current_url(&self) -> Result<String> {
        self.ensure_alive()?;
        Ok(self.url())
    }

    async fn goto(&self, url: &str) -> Result<()> {
        self.ensure_alive()?;
        self.record(Call::Goto(url.to_string()));
        self.navigate(url);
        Ok(())
    }

    async fn go_back(&self) -> Result<()> {
        self.ensure_alive()?;
        self.record(Call::Back);
        let mut state = self.state.lock().unwrap();
        if state.history.len() > 1 {
            state.history.pop();
            state.url = state.history.last().cloned().unwrap_or_default();
            state.scroll_y = 0;
            state.max_scroll = 0;
            state.removed.clear();
        }
        Ok(())
    }

    async fn wait_for_quiescence(&self, timeout: Duration) -> Result<()> {
        self.ensure_alive()?;
        let url = self.url();
        self.record(Call::Quiescence(url.clone()));
        if self.pages.get(&url).map(|p| p.hangs).unwrap_or(false) {
            return Err(ScanError::Timeout {
                what: format!("quiescence on {}", url),
                ms: timeout.as_millis() as u64,
            });
        }
        Ok(())
    }

    async fn sleep(&self, _duration: Duration) {}

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.ensure_alive()?;
        Err(ScanError::Script(format!("mock cannot evaluate: {}", script)))
    }

    async fn is_alive(&self) -> bool {
        self.state.lock().unwrap().alive
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().alive = false;
        Ok(())
    }

    async fn scroll_height(&self) -> Result<u64> {
        self.ensure_alive()?;
        Ok(self.current_page().map(|p| p.height).unwrap_or(0))
    }

    async fn scroll_to(&self, y: u64) -> Result<()> {
        self.ensure_alive()?;
        self.record(Call::ScrollTo(y));
        let mut state = self.state.lock().unwrap();
        state.scroll_y = y;
        state.max_scroll = state.max_scroll.max(y);
        Ok(())
    }

    async fn remove_subtrees(&self, selectors: &[String]) -> Result<()> {
        self.ensure_alive()?;
        self.record(Call::Remove(selectors.to_vec()));
        let mut state = self.state.lock().unwrap();
        state.removed.extend(selectors.iter().cloned());
        Ok(())
    }
}

/// Sink that keeps every appended batch in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub batches: Vec<Vec<crate::result::ReportRow>>,
}

impl MemorySink {
    pub fn rows(&self) -> Vec<crate::result::ReportRow> {
        self.batches.iter().flatten().cloned().collect()
    }
}

impl crate::result::RowSink for MemorySink {
    fn append(&mut self, rows: &[crate::result::ReportRow]) -> Result<()> {
        self.batches.push(rows.to_vec());
        Ok(())
    }
}
