//! Scripted in-memory page
//!
//! A [`Page`] whose DOM is a handful of selector sets. Every call is recorded
//! so tests can assert exactly which browser actions a helper performed.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{E2eError, E2eResult};
use crate::page::{ContextOptions, LoadState, Page, PageFactory, WaitState};

/// One recorded page interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Goto(String),
    CurrentUrl,
    WaitForSelector(String),
    WaitForLoadState(LoadState),
    WaitForUrl(String, bool),
    Click(String),
    Fill(String, String),
    Hover(String),
    IsChecked(String),
    GetAttribute(String, String),
    Screenshot(PathBuf),
    SaveStorageState(PathBuf),
    Close,
}

#[derive(Debug, Clone)]
struct LoginScript {
    login_url: String,
    submit: String,
    landing_url: String,
}

#[derive(Debug, Default)]
struct State {
    url: String,
    visible: HashSet<String>,
    broken: HashSet<String>,
    checked: HashMap<String, bool>,
    class_switches: HashMap<String, (String, bool)>,
    click_targets: HashMap<String, String>,
    login: Option<LoginScript>,
    authenticated: bool,
    simulate_waits: bool,
    late_redirect: bool,
    pending_redirect: Option<String>,
    calls: Vec<Call>,
}

/// In-memory page; clones share state
#[derive(Debug, Clone, Default)]
pub struct ScriptedPage {
    state: Arc<Mutex<State>>,
}

impl ScriptedPage {
    pub fn new(url: &str) -> Self {
        let page = Self::default();
        page.lock().url = url.to_string();
        page
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_visible<I, S>(self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().visible.extend(selectors.into_iter().map(Into::into));
        self
    }

    /// Waits on this selector fail with a non-timeout error
    pub fn with_broken_selector(self, selector: &str) -> Self {
        self.lock().broken.insert(selector.to_string());
        self
    }

    pub fn with_checked(self, selector: &str, checked: bool) -> Self {
        self.lock().checked.insert(selector.to_string(), checked);
        self
    }

    pub fn with_class_switch(self, selector: &str, class: &str, on: bool) -> Self {
        self.lock()
            .class_switches
            .insert(selector.to_string(), (class.to_string(), on));
        self
    }

    /// Clicking `selector` moves the page to `url`
    pub fn with_click_target(self, selector: &str, url: &str) -> Self {
        {
            let mut state = self.lock();
            state.visible.insert(selector.to_string());
            state.click_targets.insert(selector.to_string(), url.to_string());
        }
        self
    }

    /// Unauthenticated navigations land on `login_url`; clicking `submit`
    /// authenticates and lands on `landing_url`.
    pub fn with_login_form(
        self,
        login_url: &str,
        fields: [&str; 3],
        landing_url: &str,
        authenticated: bool,
    ) -> Self {
        {
            let mut state = self.lock();
            state.visible.extend(fields.iter().map(|f| f.to_string()));
            state.login = Some(LoginScript {
                login_url: login_url.to_string(),
                submit: fields[2].to_string(),
                landing_url: landing_url.to_string(),
            });
            state.authenticated = authenticated;
        }
        self
    }

    /// Unauthenticated navigations first land on the requested URL and only
    /// move to the login page once the network settles
    pub fn with_late_login_redirect(self) -> Self {
        self.lock().late_redirect = true;
        self
    }

    /// Misses sleep for the full timeout, as a real browser would
    pub fn with_simulated_waits(self) -> Self {
        self.lock().simulate_waits = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn selector_waits(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::WaitForSelector(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn click_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Click(_)))
            .count()
    }

    pub fn fill_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Fill(..)))
            .count()
    }

    pub fn url(&self) -> String {
        self.lock().url.clone()
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }

    fn missing(selector: &str) -> E2eError {
        E2eError::Playwright(format!("no element matches {}", selector))
    }
}

#[async_trait]
impl Page for ScriptedPage {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        let mut state = self.lock();
        state.calls.push(Call::Goto(url.to_string()));
        let redirect = match &state.login {
            Some(login) if !state.authenticated => Some(login.login_url.clone()),
            _ => None,
        };
        match redirect {
            Some(login_url) if state.late_redirect => {
                state.url = url.to_string();
                state.pending_redirect = Some(login_url);
            }
            Some(login_url) => state.url = login_url,
            None => state.url = url.to_string(),
        }
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        let mut state = self.lock();
        state.calls.push(Call::CurrentUrl);
        Ok(state.url.clone())
    }

    async fn wait_for_selector(&self, selector: &str, wait: WaitState, timeout: Duration) -> E2eResult<()> {
        let (reached, broken, simulate) = {
            let mut state = self.lock();
            state.calls.push(Call::WaitForSelector(selector.to_string()));
            let present = state.visible.contains(selector)
                || state.checked.contains_key(selector)
                || state.class_switches.contains_key(selector);
            let reached = match wait {
                WaitState::Visible | WaitState::Attached => present,
                WaitState::Hidden | WaitState::Detached => !present,
            };
            (reached, state.broken.contains(selector), state.simulate_waits)
        };

        if broken {
            return Err(E2eError::Playwright(format!("invalid selector {}", selector)));
        }
        if reached {
            return Ok(());
        }
        if simulate {
            tokio::time::sleep(timeout).await;
        }
        Err(E2eError::Timeout(format!("{} to be {}", selector, wait.as_str())))
    }

    async fn wait_for_load_state(&self, load: LoadState, _timeout: Duration) -> E2eResult<()> {
        let mut state = self.lock();
        state.calls.push(Call::WaitForLoadState(load));
        if load == LoadState::NetworkIdle {
            if let Some(url) = state.pending_redirect.take() {
                state.url = url;
            }
        }
        Ok(())
    }

    async fn wait_for_url(&self, fragment: &str, present: bool, _timeout: Duration) -> E2eResult<()> {
        let mut state = self.lock();
        state.calls.push(Call::WaitForUrl(fragment.to_string(), present));
        if state.url.contains(fragment) == present {
            Ok(())
        } else {
            Err(E2eError::Timeout(format!("url {} {}", if present { "to contain" } else { "to leave" }, fragment)))
        }
    }

    async fn click(&self, selector: &str, _timeout: Duration) -> E2eResult<()> {
        let mut state = self.lock();
        state.calls.push(Call::Click(selector.to_string()));

        if let Some(login) = state.login.clone() {
            if login.submit == selector {
                state.authenticated = true;
                state.pending_redirect = None;
                state.url = login.landing_url;
                return Ok(());
            }
        }
        if let Some(target) = state.click_targets.get(selector).cloned() {
            state.url = target;
            return Ok(());
        }
        if let Some(checked) = state.checked.get_mut(selector) {
            *checked = !*checked;
            return Ok(());
        }
        if let Some((_, on)) = state.class_switches.get_mut(selector) {
            *on = !*on;
            return Ok(());
        }
        if state.visible.contains(selector) {
            return Ok(());
        }
        Err(Self::missing(selector))
    }

    async fn fill(&self, selector: &str, value: &str, _timeout: Duration) -> E2eResult<()> {
        let mut state = self.lock();
        state.calls.push(Call::Fill(selector.to_string(), value.to_string()));
        if state.visible.contains(selector) {
            Ok(())
        } else {
            Err(Self::missing(selector))
        }
    }

    async fn hover(&self, selector: &str, _timeout: Duration) -> E2eResult<()> {
        let mut state = self.lock();
        state.calls.push(Call::Hover(selector.to_string()));
        if state.visible.contains(selector) {
            Ok(())
        } else {
            Err(Self::missing(selector))
        }
    }

    async fn is_checked(&self, selector: &str, _timeout: Duration) -> E2eResult<bool> {
        let mut state = self.lock();
        state.calls.push(Call::IsChecked(selector.to_string()));
        state.checked.get(selector).copied().ok_or_else(|| Self::missing(selector))
    }

    async fn get_attribute(&self, selector: &str, name: &str, _timeout: Duration) -> E2eResult<Option<String>> {
        let mut state = self.lock();
        state
            .calls
            .push(Call::GetAttribute(selector.to_string(), name.to_string()));
        match state.class_switches.get(selector) {
            Some((class, on)) if name == "class" => Ok(Some(if *on {
                format!("pe-switch {}", class)
            } else {
                "pe-switch".to_string()
            })),
            Some(_) => Ok(None),
            None if state.visible.contains(selector) => Ok(None),
            None => Err(Self::missing(selector)),
        }
    }

    async fn screenshot(&self, path: &Path, _full_page: bool) -> E2eResult<()> {
        self.record(Call::Screenshot(path.to_path_buf()));
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, b"\x89PNG\r\n\x1a\n").await?;
        Ok(())
    }

    async fn save_storage_state(&self, path: &Path) -> E2eResult<()> {
        self.record(Call::SaveStorageState(path.to_path_buf()));
        let state = serde_json::json!({ "cookies": [], "origins": [] });
        tokio::fs::write(path, serde_json::to_vec_pretty(&state)?).await?;
        Ok(())
    }

    async fn close(&self) -> E2eResult<()> {
        self.record(Call::Close);
        Ok(())
    }
}

type PageBuilder = Box<dyn Fn(usize) -> ScriptedPage + Send + Sync>;

/// Factory handing out scripted pages; `build` receives the open count
pub struct ScriptedFactory {
    build: PageBuilder,
    opened: Mutex<Vec<(ContextOptions, ScriptedPage)>>,
}

impl ScriptedFactory {
    pub fn new(build: impl Fn(usize) -> ScriptedPage + Send + Sync + 'static) -> Self {
        Self {
            build: Box::new(build),
            opened: Mutex::new(Vec::new()),
        }
    }

    fn opened(&self) -> MutexGuard<'_, Vec<(ContextOptions, ScriptedPage)>> {
        self.opened.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn pages(&self) -> Vec<ScriptedPage> {
        self.opened().iter().map(|(_, p)| p.clone()).collect()
    }

    pub fn options(&self) -> Vec<ContextOptions> {
        self.opened().iter().map(|(o, _)| o.clone()).collect()
    }
}

#[async_trait]
impl PageFactory for ScriptedFactory {
    async fn open(&self, options: ContextOptions) -> E2eResult<Box<dyn Page>> {
        let mut opened = self.opened();
        let page = (self.build)(opened.len());
        opened.push((options, page.clone()));
        Ok(Box::new(page))
    }
}
