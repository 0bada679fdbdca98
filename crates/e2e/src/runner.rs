//! Suite runner: login, steps, element counting, retries and serial suites

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::auth::{self, MenuPath};
use crate::config::{App, SuiteConfig, Timeouts};
use crate::error::{E2eError, E2eResult};
use crate::page::{ContextOptions, Page, PageFactory};
use crate::probe::{self, ElementCheck};
use crate::session::SessionStore;
use crate::spec::{SuiteFile, SuiteMode, TestSpec, TestStep};
use crate::toggle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    /// Passed on a retry
    Flaky,
    Failed,
    Skipped,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Flaky => "flaky",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
        }
    }
}

/// Result of executing a test step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub suite: String,
    pub name: String,
    pub status: TestStatus,
    pub attempts: u32,
    pub duration_ms: u64,
    pub found: usize,
    pub min_found: usize,
    pub elements: Vec<ElementCheck>,
    pub steps: Vec<StepResult>,
    pub screenshot: Option<PathBuf>,
    pub error: Option<String>,
}

impl TestResult {
    fn skipped(suite: &SuiteFile, test: &TestSpec, reason: &str) -> Self {
        Self {
            suite: suite.name.clone(),
            name: test.name.clone(),
            status: TestStatus::Skipped,
            attempts: 0,
            duration_ms: 0,
            found: 0,
            min_found: test.min_found,
            elements: vec![],
            steps: vec![],
            screenshot: None,
            error: Some(reason.to_string()),
        }
    }
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub app: App,
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub flaky: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Mutable record of one attempt; survives a timed-out attempt
#[derive(Debug, Default)]
struct Attempt {
    elements: Vec<ElementCheck>,
    steps: Vec<StepResult>,
    screenshot: Option<PathBuf>,
}

impl Attempt {
    fn found(&self) -> usize {
        self.elements.iter().filter(|e| e.found).count()
    }
}

/// Main suite runner
pub struct TestRunner {
    config: SuiteConfig,
    timeouts: Timeouts,
    factory: Arc<dyn PageFactory>,
    session: Option<SessionStore>,
}

impl TestRunner {
    pub fn new(config: SuiteConfig, factory: Arc<dyn PageFactory>) -> Self {
        let session = match config.app {
            App::Saas => config.storage_state.clone().map(SessionStore::new),
            App::Wordpress => None,
        };
        Self {
            timeouts: config.timeouts(),
            config,
            factory,
            session,
        }
    }

    /// Wait until the site under test answers HTTP at all
    pub async fn preflight(&self, timeout: Duration) -> E2eResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .danger_accept_invalid_certs(true)
            .build()?;

        let start = Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout {
            attempts += 1;
            match client.get(&self.config.base_url).send().await {
                Ok(resp) => {
                    debug!("Preflight {} -> {}", self.config.base_url, resp.status());
                    return Ok(());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for {} ...", self.config.base_url);
                    }
                    if !e.is_connect() {
                        warn!("Preflight error: {}", e);
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        Err(E2eError::SiteUnreachable {
            url: self.config.base_url.clone(),
            attempts,
        })
    }

    /// Apply `only` focus; an error under forbid_only
    pub fn select(&self, suites: Vec<SuiteFile>) -> E2eResult<Vec<SuiteFile>> {
        if let Some(focused) = suites.iter().find(|s| s.only) {
            if self.config.forbid_only {
                return Err(E2eError::ForbidOnly(focused.name.clone()));
            }
            let focused: Vec<SuiteFile> = suites.into_iter().filter(|s| s.only).collect();
            info!("Running {} focused suite(s) only", focused.len());
            return Ok(focused);
        }
        Ok(suites)
    }

    /// Run suites, up to `workers` files at a time
    pub async fn run_suites(&self, suites: &[SuiteFile]) -> E2eResult<TestSuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();

        if let Some(session) = &self.session {
            if suites.iter().any(|s| s.tests.iter().any(|t| t.login)) {
                session
                    .ensure(
                        self.factory.as_ref(),
                        &self.config.base_url,
                        &self.config.credentials,
                        &self.config.login_form(),
                        &self.timeouts,
                    )
                    .await?;
            }
        }

        let total: usize = suites.iter().map(|s| s.tests.len()).sum();
        info!(
            "Running {} test(s) from {} file(s) using {} worker(s)",
            total,
            suites.len(),
            self.config.workers
        );

        let mut per_suite: Vec<(usize, Vec<TestResult>)> = stream::iter(suites.iter().enumerate())
            .map(|(index, suite)| async move { (index, self.run_suite(suite).await) })
            .buffer_unordered(self.config.workers.max(1))
            .collect()
            .await;
        per_suite.sort_by_key(|(index, _)| *index);

        let results: Vec<TestResult> = per_suite.into_iter().flat_map(|(_, r)| r).collect();
        let count = |status: TestStatus| results.iter().filter(|r| r.status == status).count();

        Ok(TestSuiteResult {
            app: self.config.app,
            base_url: self.config.base_url.clone(),
            started_at,
            total: results.len(),
            passed: count(TestStatus::Passed),
            flaky: count(TestStatus::Flaky),
            failed: count(TestStatus::Failed),
            skipped: count(TestStatus::Skipped),
            duration_ms: start.elapsed().as_millis() as u64,
            results,
        })
    }

    /// Run the tests of one file in order
    pub async fn run_suite(&self, suite: &SuiteFile) -> Vec<TestResult> {
        let mut results = Vec::with_capacity(suite.tests.len());
        let mut failed = false;

        for test in &suite.tests {
            if failed && suite.mode == SuiteMode::Serial {
                warn!("- {} › {} skipped", suite.name, test.name);
                results.push(TestResult::skipped(
                    suite,
                    test,
                    "skipped: an earlier test in this serial suite failed",
                ));
                continue;
            }

            let result = self.run_test(suite, test).await;
            failed |= result.status == TestStatus::Failed;
            results.push(result);
        }

        results
    }

    /// Run one test with test-level retries
    pub async fn run_test(&self, suite: &SuiteFile, test: &TestSpec) -> TestResult {
        let start = Instant::now();
        let max_attempts = self.config.retries.saturating_add(1);
        let mut attempt_no = 0;

        loop {
            attempt_no += 1;
            let (attempt, outcome) = self.attempt(suite, test, attempt_no).await;

            let status = match &outcome {
                Ok(()) if attempt_no == 1 => TestStatus::Passed,
                Ok(()) => TestStatus::Flaky,
                Err(_) => TestStatus::Failed,
            };

            if status == TestStatus::Failed && attempt_no < max_attempts {
                if let Err(e) = &outcome {
                    warn!("↻ {} › {} attempt {} failed: {}", suite.name, test.name, attempt_no, e);
                }
                continue;
            }

            let duration_ms = start.elapsed().as_millis() as u64;
            match &outcome {
                Ok(()) => info!("✓ {} › {} ({} ms)", suite.name, test.name, duration_ms),
                Err(e) => error!("✗ {} › {} - {}", suite.name, test.name, e),
            }

            return TestResult {
                suite: suite.name.clone(),
                name: test.name.clone(),
                status,
                attempts: attempt_no,
                duration_ms,
                found: attempt.found(),
                min_found: test.min_found,
                elements: attempt.elements,
                steps: attempt.steps,
                screenshot: attempt.screenshot,
                error: outcome.err().map(|e| e.to_string()),
            };
        }
    }

    async fn open_page(&self, test: &TestSpec) -> E2eResult<Box<dyn Page>> {
        let video_dir = self.config.video_dir.clone();
        match &self.session {
            Some(session) if test.login => session.open_page(self.factory.as_ref(), video_dir).await,
            _ => {
                self.factory
                    .open(ContextOptions {
                        video_dir,
                        ..Default::default()
                    })
                    .await
            }
        }
    }

    async fn attempt(&self, suite: &SuiteFile, test: &TestSpec, attempt_no: u32) -> (Attempt, E2eResult<()>) {
        let mut attempt = Attempt::default();
        debug!("Running {} › {} (attempt {})", suite.name, test.name, attempt_no);

        let page = match self.open_page(test).await {
            Ok(page) => page,
            Err(e) => return (attempt, Err(e)),
        };

        let budget = test
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.timeouts.test);
        let outcome = match tokio::time::timeout(budget, self.execute(page.as_ref(), suite, test, &mut attempt)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(E2eError::Timeout(format!("test exceeded {} ms", budget.as_millis()))),
        };

        if outcome.is_err() {
            let path = self
                .config
                .screenshot_dir
                .join(format!("{}-{}-failure.png", slug(&suite.name), slug(&test.name)));
            match page.screenshot(&path, true).await {
                Ok(()) => attempt.screenshot = Some(path),
                Err(e) => warn!("Could not capture failure screenshot: {}", e),
            }
        }

        if let Err(e) = page.close().await {
            warn!("Failed to close page: {}", e);
        }

        (attempt, outcome)
    }

    async fn execute(&self, page: &dyn Page, suite: &SuiteFile, test: &TestSpec, attempt: &mut Attempt) -> E2eResult<()> {
        if test.login {
            self.authenticate(page).await?;
        }

        for step in &test.steps {
            let start = Instant::now();
            let outcome = self.execute_step(page, step, attempt).await;
            attempt.steps.push(StepResult {
                success: outcome.is_ok(),
                step_name: step.describe(),
                duration_ms: start.elapsed().as_millis() as u64,
                error: outcome.as_ref().err().map(|e| e.to_string()),
            });
            outcome.map_err(|e| E2eError::StepFailed {
                step: step.describe(),
                reason: e.to_string(),
            })?;
        }

        let found = attempt.found();
        info!(
            "{} › {}: {}/{} elements found (minimum {})",
            suite.name,
            test.name,
            found,
            attempt.elements.len(),
            test.min_found
        );
        if found < test.min_found {
            return Err(E2eError::AssertionFailed(format!(
                "found {} of {} probed elements, expected at least {}",
                found,
                attempt.elements.len(),
                test.min_found
            )));
        }

        if test.screenshot {
            let path = self
                .config
                .screenshot_dir
                .join(format!("{}-{}.png", slug(&suite.name), slug(&test.name)));
            page.screenshot(&path, true).await?;
            attempt.screenshot = Some(path);
        }

        Ok(())
    }

    async fn authenticate(&self, page: &dyn Page) -> E2eResult<()> {
        auth::login(
            page,
            &self.config.base_url,
            &self.config.credentials,
            &self.config.login_form(),
            &self.timeouts,
        )
        .await?;

        if let (App::Saas, Some(site)) = (self.config.app, &self.config.default_site) {
            if !auth::select_site(page, site, &self.timeouts).await? {
                warn!("Site '{}' not selectable, continuing with the current site", site);
            }
        }
        Ok(())
    }

    async fn execute_step(&self, page: &dyn Page, step: &TestStep, attempt: &mut Attempt) -> E2eResult<()> {
        let base_url = &self.config.base_url;
        let t = &self.timeouts;

        match step {
            TestStep::Navigate { url } => auth::navigate_to(page, base_url, url, t).await,
            TestStep::NavigateAdmin { page: admin_page } => {
                auth::navigate_to_admin_page(page, base_url, admin_page, t).await
            }
            TestStep::NavigateMenu { menu, submenu, fallback_page } => {
                let path = MenuPath {
                    menu: menu.clone(),
                    submenu: submenu.clone(),
                    fallback_page: fallback_page.clone(),
                };
                let route = auth::navigate_via_menu(page, base_url, &path, t).await?;
                debug!("Reached {} via {:?}", fallback_page, route);
                Ok(())
            }
            TestStep::Probe { label, candidates, timeout_ms, required } => {
                let timeout = timeout_ms.map(Duration::from_millis).unwrap_or(t.probe);
                let check = probe::check(page, candidates, label, timeout).await;
                let found = check.found;
                attempt.elements.push(check);
                if *required && !found {
                    return Err(E2eError::AssertionFailed(format!("required element '{}' not found", label)));
                }
                Ok(())
            }
            TestStep::Click { label, candidates, required } => {
                match probe::click_first(page, candidates, label, t.probe).await? {
                    Some(_) => Ok(()),
                    None if *required => Err(E2eError::AssertionFailed(format!("nothing to click for '{}'", label))),
                    None => {
                        warn!("Skipping click on '{}' (feature may not be available)", label);
                        Ok(())
                    }
                }
            }
            TestStep::Fill { selector, value } => page.fill(selector, value, t.action).await,
            TestStep::Toggle { selector, checked, state } => {
                toggle::ensure_toggle(page, selector, *checked, state, t.action).await.map(drop)
            }
            TestStep::Wait { selector, timeout_ms, state } => {
                page.wait_for_selector(selector, *state, Duration::from_millis(*timeout_ms))
                    .await
            }
            TestStep::WaitForLoad { state } => page.wait_for_load_state(*state, t.navigation).await,
            TestStep::Screenshot { name, full_page } => {
                let path = self.config.screenshot_dir.join(format!("{}.png", slug(name)));
                page.screenshot(&path, *full_page).await?;
                attempt.screenshot = Some(path);
                Ok(())
            }
            TestStep::Log { message } => {
                info!("[TEST LOG] {}", message);
                Ok(())
            }
        }
    }
}

/// File-name-safe form of a suite or test name.
///
/// Names without ASCII letters or digits are spelled out as hex code points
/// so that distinct names never share a file.
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let out = out.trim_matches('-');
    if !out.is_empty() {
        return out.to_string();
    }
    let points: Vec<String> = name.chars().map(|c| format!("{:x}", c as u32)).collect();
    format!("x-{}", points.join("-"))
}
