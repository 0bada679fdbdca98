//! Persisted storage state for the SaaS dashboard
//!
//! The state file is shared by every test of a run. Context creation reads
//! it under a shared lock; capture, automated re-login and logout replace it
//! under an exclusive lock, always through a temp file + rename so a reader
//! never sees a half-written file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::auth::{self, Credentials, LoginForm, LoginOutcome};
use crate::config::Timeouts;
use crate::error::{E2eError, E2eResult};
use crate::page::{ContextOptions, LoadState, Page, PageFactory};

/// How long a human gets to finish an interactive capture
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
    lock: Arc<RwLock<()>>,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(RwLock::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Open a page whose context starts from the stored state
    pub async fn open_page(&self, factory: &dyn PageFactory, video_dir: Option<PathBuf>) -> E2eResult<Box<dyn Page>> {
        let _read = self.lock.read().await;
        if !self.exists() {
            return Err(E2eError::StorageStateMissing(self.path.display().to_string()));
        }
        factory
            .open(ContextOptions {
                storage_state: Some(self.path.clone()),
                video_dir,
                headless: None,
            })
            .await
    }

    /// Replace the stored state with the page's current cookies/local storage
    pub async fn save(&self, page: &dyn Page) -> E2eResult<()> {
        let _write = self.lock.write().await;
        self.write_state(page).await
    }

    async fn write_state(&self, page: &dyn Page) -> E2eResult<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&dir).await?;

        let tmp = tempfile::NamedTempFile::new_in(&dir)?;
        page.save_storage_state(tmp.path()).await?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        info!("Saved storage state to {}", self.path.display());
        Ok(())
    }

    /// Logout helper: forget the stored session. Returns whether a file was removed.
    pub async fn clear(&self) -> E2eResult<bool> {
        let _write = self.lock.write().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Removed storage state {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Make sure a state file exists, logging in once when it does not
    pub async fn ensure(
        &self,
        factory: &dyn PageFactory,
        base_url: &str,
        credentials: &Credentials,
        form: &LoginForm,
        timeouts: &Timeouts,
    ) -> E2eResult<()> {
        if self.exists() {
            return Ok(());
        }

        let _write = self.lock.write().await;
        if self.exists() {
            return Ok(());
        }
        if !credentials.is_complete() {
            return Err(E2eError::StorageStateMissing(self.path.display().to_string()));
        }

        info!("No storage state at {}, logging in", self.path.display());
        let page = factory.open(ContextOptions::default()).await?;
        let result: E2eResult<()> = async {
            auth::login(page.as_ref(), base_url, credentials, form, timeouts).await?;
            self.write_state(page.as_ref()).await
        }
        .await;
        if let Err(e) = page.close().await {
            warn!("Failed to close login page: {}", e);
        }
        result
    }

    /// Headed capture: automated when credentials are present, otherwise
    /// waits for a human to finish logging in.
    pub async fn capture(
        &self,
        factory: &dyn PageFactory,
        base_url: &str,
        credentials: &Credentials,
        form: &LoginForm,
        timeouts: &Timeouts,
    ) -> E2eResult<LoginOutcome> {
        let _write = self.lock.write().await;
        let page = factory
            .open(ContextOptions {
                headless: Some(false),
                ..Default::default()
            })
            .await?;

        let result = async {
            let outcome = if credentials.is_complete() {
                auth::login(page.as_ref(), base_url, credentials, form, timeouts).await?
            } else {
                page.goto(&auth::join_url(base_url, &form.entry_path)).await?;
                page.wait_for_load_state(LoadState::DomContentLoaded, timeouts.navigation)
                    .await?;
                info!("Complete the login in the browser window");
                page.wait_for_url(&form.login_path, false, CAPTURE_TIMEOUT).await?;
                LoginOutcome::LoggedIn
            };
            self.write_state(page.as_ref()).await?;
            Ok::<_, E2eError>(outcome)
        }
        .await;

        if let Err(e) = page.close().await {
            warn!("Failed to close capture page: {}", e);
        }
        result
    }
}
