//! Playwright browser automation
//!
//! Each [`PlaywrightPage`] owns a `node` child running a small bridge script.
//! The bridge launches the browser once and then serves one JSON request per
//! stdin line, answering with one JSON line on stdout. Requests are strictly
//! sequential, which matches how a single test drives its page.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::page::{Browser, ContextOptions, LoadState, Page, PageFactory, Viewport, WaitState};

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport: Viewport,

    /// Directory whose `node_modules` provides the `playwright` package
    pub node_project_dir: PathBuf,

    pub navigation_timeout: Duration,

    /// How long the bridge may take to launch the browser
    pub launch_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport: Viewport::default(),
            node_project_dir: PathBuf::from("."),
            navigation_timeout: Duration::from_secs(30),
            launch_timeout: Duration::from_secs(60),
        }
    }
}

/// Launch options handed to the bridge script
#[derive(Debug, Serialize)]
struct LaunchOptions<'a> {
    headless: bool,
    viewport: Viewport,
    #[serde(rename = "storageState", skip_serializing_if = "Option::is_none")]
    storage_state: Option<&'a Path>,
    #[serde(rename = "videoDir", skip_serializing_if = "Option::is_none")]
    video_dir: Option<&'a Path>,
    #[serde(rename = "navigationTimeout")]
    navigation_timeout: u64,
}

const BRIDGE_BODY: &str = r#"
  const contextOptions = { viewport: launch.viewport };
  if (launch.storageState) contextOptions.storageState = launch.storageState;
  if (launch.videoDir) contextOptions.recordVideo = { dir: launch.videoDir };
  const context = await browser.newContext(contextOptions);
  const page = await context.newPage();
  page.setDefaultNavigationTimeout(launch.navigationTimeout);

  const reply = (message) => process.stdout.write(JSON.stringify(message) + '\n');
  const done = (promise) => promise.then(() => null);
  const handlers = {
    goto: (r) => done(page.goto(r.url)),
    url: async () => page.url(),
    wait_for_selector: (r) => done(page.waitForSelector(r.selector, { state: r.state, timeout: r.timeout })),
    wait_for_load_state: (r) => done(page.waitForLoadState(r.state, { timeout: r.timeout })),
    wait_for_url: (r) => done(page.waitForURL((u) => u.href.includes(r.fragment) === r.present, { timeout: r.timeout })),
    click: (r) => done(page.locator(r.selector).click({ timeout: r.timeout })),
    fill: (r) => done(page.locator(r.selector).fill(r.value, { timeout: r.timeout })),
    hover: (r) => done(page.locator(r.selector).hover({ timeout: r.timeout })),
    is_checked: (r) => page.locator(r.selector).isChecked({ timeout: r.timeout }),
    get_attribute: (r) => page.locator(r.selector).getAttribute(r.name, { timeout: r.timeout }),
    screenshot: (r) => done(page.screenshot({ path: r.path, fullPage: r.full_page })),
    storage_state: (r) => done(context.storageState({ path: r.path })),
  };

  reply({ id: 0, ok: true, value: 'ready' });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    const request = JSON.parse(line);
    if (request.op === 'close') {
      reply({ id: request.id, ok: true, value: null });
      break;
    }
    const handler = handlers[request.op];
    if (!handler) {
      reply({ id: request.id, ok: false, error: 'unknown op: ' + request.op });
      continue;
    }
    try {
      const value = await handler(request);
      reply({ id: request.id, ok: true, value: value === undefined ? null : value });
    } catch (error) {
      reply({ id: request.id, ok: false, timeout: error.name === 'TimeoutError', error: error.message });
    }
  }

  await context.close();
  await browser.close();
})().catch((error) => {
  console.error(error.stack || String(error));
  process.exit(1);
});
"#;

/// Factory that opens one bridged browser per page
#[derive(Debug, Clone)]
pub struct Playwright {
    config: PlaywrightConfig,
}

impl Playwright {
    /// Create a new Playwright factory
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config.node_project_dir)?;
        Ok(Self { config })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed(dir: &Path) -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Build the bridge script for one browser context
    pub fn build_script(&self, options: &ContextOptions) -> E2eResult<String> {
        let launch = LaunchOptions {
            headless: options.headless.unwrap_or(self.config.headless),
            viewport: self.config.viewport,
            storage_state: options.storage_state.as_deref(),
            video_dir: options.video_dir.as_deref(),
            navigation_timeout: self.config.navigation_timeout.as_millis() as u64,
        };

        let mut script = format!(
            r#"
const {{ chromium, firefox, webkit }} = require('playwright');
const readline = require('readline');

(async () => {{
  const launch = {launch};
  const browser = await {browser}.launch({{ headless: launch.headless }});
"#,
            launch = serde_json::to_string(&launch)?,
            browser = self.config.browser.as_str(),
        );
        script.push_str(BRIDGE_BODY);
        Ok(script)
    }
}

#[async_trait]
impl PageFactory for Playwright {
    async fn open(&self, options: ContextOptions) -> E2eResult<Box<dyn Page>> {
        let script = self.build_script(&options)?;
        let page = PlaywrightPage::spawn(&self.config, &script).await?;
        Ok(Box::new(page))
    }
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    id: u64,
    op: &'a str,
    #[serde(flatten)]
    args: Value,
}

#[derive(Debug, Deserialize)]
struct Response {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    timeout: bool,
}

struct BridgeIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

impl BridgeIo {
    async fn read_response(&mut self, id: u64) -> E2eResult<Response> {
        while let Some(line) = self.stdout.next_line().await? {
            match serde_json::from_str::<Response>(&line) {
                Ok(resp) if resp.id == id => return Ok(resp),
                Ok(resp) => warn!("Discarding stale bridge response {}", resp.id),
                Err(_) => debug!("[bridge] {}", line),
            }
        }
        Err(E2eError::BridgeClosed)
    }
}

/// A page served by a bridged Playwright browser
pub struct PlaywrightPage {
    io: Mutex<BridgeIo>,
    child: Mutex<Child>,
    // Keeps the script file alive for the lifetime of the child
    _script_dir: tempfile::TempDir,
}

impl PlaywrightPage {
    async fn spawn(config: &PlaywrightConfig, script: &str) -> E2eResult<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, script)?;

        debug!("Starting Playwright bridge: {}", script_path.display());

        let node_path = config.node_project_dir.join("node_modules");
        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .current_dir(&config.node_project_dir)
            .env("NODE_PATH", node_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Playwright(format!("Failed to spawn node: {}", e)))?;

        let stdin = child.stdin.take().ok_or(E2eError::BridgeClosed)?;
        let stdout = child.stdout.take().ok_or(E2eError::BridgeClosed)?;

        let mut io = BridgeIo {
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
        };

        let ready = tokio::time::timeout(config.launch_timeout, io.read_response(0))
            .await
            .map_err(|_| E2eError::Timeout(format!("{} launch", config.browser.as_str())))??;
        if !ready.ok {
            return Err(E2eError::Playwright(ready.error.unwrap_or_default()));
        }

        info!("Launched {} (headless: {})", config.browser.as_str(), config.headless);

        Ok(Self {
            io: Mutex::new(io),
            child: Mutex::new(child),
            _script_dir: script_dir,
        })
    }

    async fn request(&self, op: &str, args: Value) -> E2eResult<Value> {
        let mut io = self.io.lock().await;
        io.next_id += 1;
        let id = io.next_id;

        let mut line = serde_json::to_string(&Request { id, op, args })?;
        line.push('\n');
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;

        let resp = io.read_response(id).await?;
        if resp.ok {
            return Ok(resp.value);
        }

        let reason = resp.error.unwrap_or_else(|| "unknown error".to_string());
        if resp.timeout {
            Err(E2eError::Timeout(format!("{}: {}", op, reason)))
        } else {
            Err(E2eError::Playwright(format!("{}: {}", op, reason)))
        }
    }
}

fn millis(timeout: Duration) -> u64 {
    timeout.as_millis() as u64
}

#[async_trait]
impl Page for PlaywrightPage {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.request("goto", json!({ "url": url })).await.map(drop)
    }

    async fn current_url(&self) -> E2eResult<String> {
        let value = self.request("url", json!({})).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn wait_for_selector(&self, selector: &str, state: WaitState, timeout: Duration) -> E2eResult<()> {
        self.request(
            "wait_for_selector",
            json!({ "selector": selector, "state": state.as_str(), "timeout": millis(timeout) }),
        )
        .await
        .map(drop)
    }

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> E2eResult<()> {
        self.request(
            "wait_for_load_state",
            json!({ "state": state.as_str(), "timeout": millis(timeout) }),
        )
        .await
        .map(drop)
    }

    async fn wait_for_url(&self, fragment: &str, present: bool, timeout: Duration) -> E2eResult<()> {
        self.request(
            "wait_for_url",
            json!({ "fragment": fragment, "present": present, "timeout": millis(timeout) }),
        )
        .await
        .map(drop)
    }

    async fn click(&self, selector: &str, timeout: Duration) -> E2eResult<()> {
        self.request("click", json!({ "selector": selector, "timeout": millis(timeout) }))
            .await
            .map(drop)
    }

    async fn fill(&self, selector: &str, value: &str, timeout: Duration) -> E2eResult<()> {
        self.request(
            "fill",
            json!({ "selector": selector, "value": value, "timeout": millis(timeout) }),
        )
        .await
        .map(drop)
    }

    async fn hover(&self, selector: &str, timeout: Duration) -> E2eResult<()> {
        self.request("hover", json!({ "selector": selector, "timeout": millis(timeout) }))
            .await
            .map(drop)
    }

    async fn is_checked(&self, selector: &str, timeout: Duration) -> E2eResult<bool> {
        let value = self
            .request("is_checked", json!({ "selector": selector, "timeout": millis(timeout) }))
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn get_attribute(&self, selector: &str, name: &str, timeout: Duration) -> E2eResult<Option<String>> {
        let value = self
            .request(
                "get_attribute",
                json!({ "selector": selector, "name": name, "timeout": millis(timeout) }),
            )
            .await?;
        Ok(value.as_str().map(String::from))
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.request("screenshot", json!({ "path": path, "full_page": full_page }))
            .await
            .map(drop)
    }

    async fn save_storage_state(&self, path: &Path) -> E2eResult<()> {
        self.request("storage_state", json!({ "path": path })).await.map(drop)
    }

    async fn close(&self) -> E2eResult<()> {
        if let Err(e) = self.request("close", json!({})).await {
            debug!("Bridge close request failed: {}", e);
        }
        let mut child = self.child.lock().await;
        match tokio::time::timeout(Duration::from_secs(10), child.wait()).await {
            Ok(status) => {
                let status = status?;
                debug!("Bridge exited with {}", status);
            }
            Err(_) => {
                warn!("Bridge did not exit, killing it");
                child.kill().await?;
            }
        }
        Ok(())
    }
}
