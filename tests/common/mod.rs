//! Scripted in-memory browser for driving the monitoring flow in tests.
//!
//! Static elements are keyed by the locator that finds them. The product
//! listing is scripted per poll cycle and advances on every reload.

#![allow(dead_code)]

use async_trait::async_trait;
use restock_watch::{
    Config, MonitorError, Result,
    candidate::NodeTraits,
    driver::Driver,
    notify::Notifier,
    selectors::{Locator, Selectors},
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const LOGIN_URL: &str = "https://shop.example/login";
pub const WATCH_URL: &str = "https://shop.example/cart";
pub const CONFIRMATION_URL: &str = "https://shop.example/order-confirmation?id=1";

#[derive(Debug, Clone, Default)]
pub struct FakeNode {
    pub label: String,
    pub class_name: String,
    pub child_count: usize,
    pub name: Option<String>,
    pub fail_click: bool,
    pub fail_force_click: bool,
    pub navigates_to: Option<String>,
}

impl FakeNode {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Default::default()
        }
    }

    /// Selectable product checkbox.
    pub fn checkbox(name: &str) -> Self {
        Self {
            label: name.to_string(),
            class_name: "product_checkbox__a1b2".into(),
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    /// Sold-out product checkbox.
    pub fn disabled(name: &str) -> Self {
        Self {
            class_name: "product_checkbox__a1b2 product_checkboxDisabled__c3d4".into(),
            ..Self::checkbox(name)
        }
    }

    /// Wrapper around a real checkbox, matched by the same prefix.
    pub fn container(label: &str) -> Self {
        Self {
            label: label.to_string(),
            class_name: "product_checkboxContainer__e5f6".into(),
            child_count: 1,
            ..Default::default()
        }
    }

    pub fn unnamed(mut self) -> Self {
        self.name = None;
        self
    }

    pub fn failing_click(mut self) -> Self {
        self.fail_click = true;
        self
    }

    pub fn failing_force_click(mut self) -> Self {
        self.fail_force_click = true;
        self
    }

    pub fn navigates_to(mut self, url: &str) -> Self {
        self.navigates_to = Some(url.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Navigate(String),
    Click(String),
    ForceClick(String),
    Type(String, String),
    Clear(String),
    Reload,
    Screenshot(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeElement(usize);

#[derive(Default)]
struct PageState {
    nodes: Vec<FakeNode>,
    present: HashMap<Locator, Vec<usize>>,
    listings: Vec<Vec<usize>>,
    cycle: usize,
    url: String,
    calls: Vec<Call>,
    failing_reloads: usize,
}

pub struct FakeDriver {
    selectors: Selectors,
    state: Mutex<PageState>,
}

impl FakeDriver {
    pub fn new(selectors: &Selectors) -> Self {
        Self {
            selectors: selectors.clone(),
            state: Mutex::new(PageState {
                url: "about:blank".into(),
                ..Default::default()
            }),
        }
    }

    /// Every element the login sequence needs, plus the cart indicator
    /// that confirms it.
    pub fn signed_in(selectors: &Selectors) -> Self {
        Self::new(selectors)
            .with(&selectors.consent_checkbox, FakeNode::new("consent"))
            .with(&selectors.email_input, FakeNode::new("email"))
            .with(&selectors.continue_button, FakeNode::new("continue"))
            .with(&selectors.password_input, FakeNode::new("password"))
            .with(&selectors.sign_in_button, FakeNode::new("sign in"))
            .with(&selectors.cart_indicator, FakeNode::new("cart"))
    }

    /// Adds a checkout button that lands on the confirmation page and a
    /// primary order button.
    pub fn with_checkout(self) -> Self {
        let selectors = self.selectors.clone();
        self.with(
            &selectors.checkout_button,
            FakeNode::new("checkout").navigates_to(CONFIRMATION_URL),
        )
        .with(&selectors.place_order_primary, FakeNode::new("place order"))
    }

    pub fn with(self, locator: &Locator, node: FakeNode) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = state.nodes.len();
            state.nodes.push(node);
            state.present.entry(locator.clone()).or_default().push(id);
        }
        self
    }

    pub fn without(self, locator: &Locator) -> Self {
        self.state.lock().unwrap().present.remove(locator);
        self
    }

    /// One listing per poll cycle; the last one repeats.
    pub fn with_listings(self, listings: Vec<Vec<FakeNode>>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for listing in listings {
                let mut ids = Vec::new();
                for node in listing {
                    ids.push(state.nodes.len());
                    state.nodes.push(node);
                }
                state.listings.push(ids);
            }
        }
        self
    }

    pub fn with_failing_reloads(self, count: usize) -> Self {
        self.state.lock().unwrap().failing_reloads = count;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clicked(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Click(label) => Some(label),
                _ => None,
            })
            .collect()
    }

    pub fn force_clicked(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::ForceClick(label) => Some(label),
                _ => None,
            })
            .collect()
    }

    pub fn reloads(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::Reload).count()
    }

    pub fn cycle(&self) -> usize {
        self.state.lock().unwrap().cycle
    }

    fn node(&self, element: &FakeElement) -> FakeNode {
        self.state.lock().unwrap().nodes[element.0].clone()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn current_listing(state: &PageState) -> Vec<usize> {
        match state.listings.len() {
            0 => Vec::new(),
            n => state.listings[state.cycle.min(n - 1)].clone(),
        }
    }
}

#[async_trait]
impl Driver for FakeDriver {
    type Element = FakeElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.url = url.to_string();
        state.calls.push(Call::Navigate(url.to_string()));
        Ok(())
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<FakeElement>> {
        let state = self.state.lock().unwrap();

        let ids = if *locator == self.selectors.candidates {
            Self::current_listing(&state)
        } else if *locator == self.selectors.available_candidate {
            Self::current_listing(&state)
                .into_iter()
                .filter(|id| !state.nodes[*id].class_name.contains("Disabled"))
                .collect()
        } else {
            state.present.get(locator).cloned().unwrap_or_default()
        };

        Ok(ids.into_iter().map(FakeElement).collect())
    }

    async fn click(&self, element: &FakeElement) -> Result<()> {
        let node = self.node(element);
        if node.fail_click {
            return Err(MonitorError::General(format!(
                "{} is covered by another element",
                node.label
            )));
        }

        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Click(node.label));
        if let Some(url) = node.navigates_to {
            state.url = url;
        }
        Ok(())
    }

    async fn force_click(&self, element: &FakeElement) -> Result<()> {
        let node = self.node(element);
        if node.fail_force_click {
            return Err(MonitorError::EvaluationError(format!(
                "{} detached before click",
                node.label
            )));
        }

        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ForceClick(node.label));
        if let Some(url) = node.navigates_to {
            state.url = url;
        }
        Ok(())
    }

    async fn type_text(&self, element: &FakeElement, text: &str) -> Result<()> {
        let node = self.node(element);
        self.record(Call::Type(node.label, text.to_string()));
        Ok(())
    }

    async fn clear(&self, element: &FakeElement) -> Result<()> {
        let node = self.node(element);
        self.record(Call::Clear(node.label));
        Ok(())
    }

    async fn describe(&self, element: &FakeElement) -> Result<NodeTraits> {
        let node = self.node(element);
        Ok(NodeTraits::new(node.class_name, node.child_count))
    }

    async fn nearby_text(&self, element: &FakeElement, _locator: &Locator) -> Result<Option<String>> {
        Ok(self.node(element).name)
    }

    async fn reload(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Reload);
        if state.failing_reloads > 0 {
            state.failing_reloads -= 1;
            return Err(MonitorError::Connection("page crashed".into()));
        }
        state.cycle += 1;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.record(Call::Screenshot(path.to_path_buf()));
        Ok(())
    }
}

/// Records every message instead of sending it.
#[derive(Clone)]
pub struct RecordingNotifier {
    channel: &'static str,
    fail: bool,
    pub sent: Arc<Mutex<Vec<(String, Option<PathBuf>)>>>,
}

impl RecordingNotifier {
    pub fn new(channel: &'static str) -> Self {
        Self {
            channel,
            fail: false,
            sent: Arc::default(),
        }
    }

    pub fn failing(channel: &'static str) -> Self {
        Self {
            fail: true,
            ..Self::new(channel)
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn channel(&self) -> &'static str {
        self.channel
    }

    async fn send(&self, text: &str, image: Option<&Path>) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((text.to_string(), image.map(Path::to_path_buf)));
        if self.fail {
            return Err(MonitorError::Notification {
                channel: self.channel,
                reason: "HTTP 500: unavailable".into(),
            });
        }
        Ok(())
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.credentials.email = "buyer@example.com".into();
    config.credentials.password = "hunter22".into();
    config.target.login_url = LOGIN_URL.into();
    config.target.url = Some(WATCH_URL.into());
    config.search.enabled = false;
    config
}
