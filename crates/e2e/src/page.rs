//! Browser page abstraction
//!
//! Every helper in this crate talks to the browser through [`Page`]. The
//! Playwright bridge is the production implementation; the scripted fixture
//! page implements the same trait for tests.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;

/// Element state a selector wait resolves on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

/// Page load milestones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Load,
    #[default]
    DomContentLoaded,
    NetworkIdle,
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::Load => "load",
            LoadState::DomContentLoaded => "domcontentloaded",
            LoadState::NetworkIdle => "networkidle",
        }
    }
}

/// Browser engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(format!("unknown browser engine: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport { width: 1280, height: 720 }
    }
}

/// Options applied when a browser context is created
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Storage state (cookies + local storage) to load into the context
    pub storage_state: Option<PathBuf>,

    /// Record a video of the session into this directory
    pub video_dir: Option<PathBuf>,

    /// Overrides the factory's headless setting (session capture runs headed)
    pub headless: Option<bool>,
}

/// One browser tab inside its own context
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> E2eResult<()>;

    async fn current_url(&self) -> E2eResult<String>;

    /// Returns `E2eError::Timeout` when the state is not reached in time.
    async fn wait_for_selector(&self, selector: &str, state: WaitState, timeout: Duration) -> E2eResult<()>;

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> E2eResult<()>;

    /// Wait until the URL contains (`present = true`) or no longer
    /// contains (`present = false`) `fragment`.
    async fn wait_for_url(&self, fragment: &str, present: bool, timeout: Duration) -> E2eResult<()>;

    async fn click(&self, selector: &str, timeout: Duration) -> E2eResult<()>;

    async fn fill(&self, selector: &str, value: &str, timeout: Duration) -> E2eResult<()>;

    async fn hover(&self, selector: &str, timeout: Duration) -> E2eResult<()>;

    async fn is_checked(&self, selector: &str, timeout: Duration) -> E2eResult<bool>;

    async fn get_attribute(&self, selector: &str, name: &str, timeout: Duration) -> E2eResult<Option<String>>;

    async fn screenshot(&self, path: &Path, full_page: bool) -> E2eResult<()>;

    async fn save_storage_state(&self, path: &Path) -> E2eResult<()>;

    async fn close(&self) -> E2eResult<()>;
}

/// Opens pages; one per test attempt
#[async_trait]
pub trait PageFactory: Send + Sync {
    async fn open(&self, options: ContextOptions) -> E2eResult<Box<dyn Page>>;
}
