//! Runner configuration
//!
//! One YAML file per suite (`config/wordpress.yaml`, `config/saas.yaml`).
//! Environment overrides are collected by the CLI into [`ConfigOverrides`]
//! and applied on top of the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{Credentials, LoginForm};
use crate::error::{E2eError, E2eResult};
use crate::page::{Browser, Viewport};
use crate::playwright::PlaywrightConfig;

/// Application under test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum App {
    /// PushEngage plugin inside wp-admin
    #[default]
    Wordpress,
    /// PushEngage hosted dashboard
    Saas,
}

impl App {
    pub fn as_str(&self) -> &'static str {
        match self {
            App::Wordpress => "wordpress",
            App::Saas => "saas",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reporter {
    List,
    Json,
    Html,
}

/// Timeouts used by helpers and the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Whole-test budget
    pub test: Duration,
    /// Per selector candidate
    pub probe: Duration,
    pub action: Duration,
    pub navigation: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            test: Duration::from_millis(default_test_timeout()),
            probe: Duration::from_millis(default_probe_timeout()),
            action: Duration::from_millis(default_action_timeout()),
            navigation: Duration::from_millis(default_navigation_timeout()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    #[serde(default)]
    pub app: App,

    pub base_url: String,

    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Test-level retries after a failed attempt
    #[serde(default)]
    pub retries: u32,

    #[serde(default = "default_test_timeout")]
    pub timeout_ms: u64,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,

    #[serde(default = "default_action_timeout")]
    pub action_timeout_ms: u64,

    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,

    #[serde(default)]
    pub browser: Browser,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default)]
    pub viewport: Viewport,

    #[serde(default = "default_reporters")]
    pub reporters: Vec<Reporter>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,

    #[serde(default)]
    pub video_dir: Option<PathBuf>,

    /// Captured storage state; loaded into every browser context when set
    #[serde(default)]
    pub storage_state: Option<PathBuf>,

    /// Login form; defaults to the app's stock form
    #[serde(default)]
    pub login: Option<LoginForm>,

    /// Site selected in the SaaS dashboard site picker
    #[serde(default)]
    pub default_site: Option<String>,

    #[serde(default)]
    pub forbid_only: bool,

    /// Check the site answers HTTP before launching browsers
    #[serde(default = "default_true")]
    pub preflight: bool,

    /// Directory whose node_modules provides Playwright
    #[serde(default = "default_node_project_dir")]
    pub node_project_dir: PathBuf,

    #[serde(default, skip_serializing)]
    pub credentials: Credentials,
}

fn default_workers() -> usize {
    1
}

fn default_test_timeout() -> u64 {
    120_000
}

fn default_probe_timeout() -> u64 {
    5_000
}

fn default_action_timeout() -> u64 {
    10_000
}

fn default_navigation_timeout() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_reporters() -> Vec<Reporter> {
    vec![Reporter::List]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("test-results")
}

fn default_screenshot_dir() -> PathBuf {
    PathBuf::from("test-results/screenshots")
}

fn default_node_project_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Values taken from the environment / command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_ms: Option<u64>,
    pub headless: Option<bool>,
    pub browser: Option<Browser>,
    pub report_dir: Option<PathBuf>,
    pub screenshot_dir: Option<PathBuf>,
    pub video_dir: Option<PathBuf>,
    pub default_site: Option<String>,
    pub retries: Option<u32>,
    pub workers: Option<usize>,
    /// Running under CI: `only` becomes an error
    pub ci: bool,
}

impl SuiteConfig {
    pub fn new(app: App, base_url: impl Into<String>) -> Self {
        Self {
            app,
            base_url: base_url.into(),
            workers: default_workers(),
            retries: 0,
            timeout_ms: default_test_timeout(),
            probe_timeout_ms: default_probe_timeout(),
            action_timeout_ms: default_action_timeout(),
            navigation_timeout_ms: default_navigation_timeout(),
            browser: Browser::default(),
            headless: true,
            viewport: Viewport::default(),
            reporters: default_reporters(),
            output_dir: default_output_dir(),
            screenshot_dir: default_screenshot_dir(),
            video_dir: None,
            storage_state: None,
            login: None,
            default_site: None,
            forbid_only: false,
            preflight: true,
            node_project_dir: default_node_project_dir(),
            credentials: Credentials::default(),
        }
    }

    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| E2eError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> E2eResult<()> {
        if self.base_url.is_empty() {
            return Err(E2eError::Config("base_url must not be empty".to_string()));
        }
        if self.workers == 0 {
            return Err(E2eError::Config("workers must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Layer overrides onto the file values
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.base_url {
            self.base_url = url;
        }
        if let Some(username) = overrides.username {
            self.credentials.username = username;
        }
        if let Some(password) = overrides.password {
            self.credentials.password = password;
        }
        if let Some(timeout) = overrides.timeout_ms {
            self.timeout_ms = timeout;
        }
        if let Some(headless) = overrides.headless {
            self.headless = headless;
        }
        if let Some(browser) = overrides.browser {
            self.browser = browser;
        }
        if let Some(dir) = overrides.report_dir {
            self.output_dir = dir;
        }
        if let Some(dir) = overrides.screenshot_dir {
            self.screenshot_dir = dir;
        }
        if overrides.video_dir.is_some() {
            self.video_dir = overrides.video_dir;
        }
        if overrides.default_site.is_some() {
            self.default_site = overrides.default_site;
        }
        if let Some(retries) = overrides.retries {
            self.retries = retries;
        }
        if let Some(workers) = overrides.workers {
            self.workers = workers.max(1);
        }
        if overrides.ci {
            self.forbid_only = true;
        }
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            test: Duration::from_millis(self.timeout_ms),
            probe: Duration::from_millis(self.probe_timeout_ms),
            action: Duration::from_millis(self.action_timeout_ms),
            navigation: Duration::from_millis(self.navigation_timeout_ms),
        }
    }

    /// Browser launch settings derived from this config
    pub fn playwright_config(&self) -> PlaywrightConfig {
        PlaywrightConfig {
            browser: self.browser,
            headless: self.headless,
            viewport: self.viewport,
            node_project_dir: self.node_project_dir.clone(),
            navigation_timeout: Duration::from_millis(self.navigation_timeout_ms),
            ..PlaywrightConfig::default()
        }
    }

    pub fn login_form(&self) -> LoginForm {
        self.login.clone().unwrap_or_else(|| match self.app {
            App::Wordpress => LoginForm::wordpress(),
            App::Saas => LoginForm::saas(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_defaults() {
        let config = SuiteConfig::from_yaml("base_url: http://localhost:8080\n").unwrap();
        assert_eq!(config.app, App::Wordpress);
        assert_eq!(config.workers, 1);
        assert_eq!(config.timeout_ms, 120_000);
        assert_eq!(config.timeouts().probe, Duration::from_secs(5));
        assert_eq!(config.reporters, vec![Reporter::List]);
        assert!(config.headless);
        assert_eq!(config.login_form(), LoginForm::wordpress());
    }

    #[test]
    fn test_saas_config() {
        let yaml = r#"
app: saas
base_url: https://app.pushengage.test
workers: 1
retries: 1
reporters: [list, json, html]
storage_state: test-results/.auth/app-state.json
browser: firefox
"#;
        let config = SuiteConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.app, App::Saas);
        assert_eq!(config.browser, Browser::Firefox);
        assert_eq!(config.reporters.len(), 3);
        assert_eq!(config.login_form(), LoginForm::saas());
        assert_eq!(
            config.storage_state.as_deref(),
            Some(Path::new("test-results/.auth/app-state.json"))
        );
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = SuiteConfig::from_yaml("base_url: http://x\nworkers: 0\n").unwrap_err();
        assert!(matches!(err, E2eError::Config(_)));
    }

    #[test]
    fn test_overrides_win() {
        let mut config = SuiteConfig::new(App::Wordpress, "http://file.test");
        config.apply(ConfigOverrides {
            base_url: Some("http://env.test".to_string()),
            username: Some("editor".to_string()),
            password: Some("pw".to_string()),
            headless: Some(false),
            retries: Some(2),
            ci: true,
            ..Default::default()
        });
        assert_eq!(config.base_url, "http://env.test");
        assert_eq!(config.credentials.username, "editor");
        assert!(!config.headless);
        assert_eq!(config.retries, 2);
        assert!(config.forbid_only);
    }

    #[test]
    fn test_credentials_never_serialized() {
        let mut config = SuiteConfig::new(App::Saas, "http://x");
        config.credentials = Credentials::new("u", "hunter2");
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("hunter2"));
    }
}
