//! Declarative YAML suite files
//!
//! A suite file holds one or more tests against one app. Each test logs in,
//! walks its steps, counts how many probed elements were found and asserts a
//! minimum.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::App;
use crate::error::{E2eError, E2eResult};
use crate::page::{LoadState, WaitState};
use crate::probe::Candidates;
use crate::toggle::ToggleState;

/// Suite file name suffixes picked up by [`SuiteFile::load_all`]
pub const SUITE_SUFFIXES: [&str; 2] = [".spec.yaml", ".spec.yml"];

/// A complete suite file parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteFile {
    /// Unique name for this suite
    pub name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default)]
    pub app: App,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,

    #[serde(default)]
    pub mode: SuiteMode,

    /// Focus this suite; rejected when forbid_only is set
    #[serde(default, skip_serializing_if = "is_false")]
    pub only: bool,

    pub tests: Vec<TestSpec>,

    /// File the suite was loaded from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// How the tests of one file relate to each other
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteMode {
    /// Tests are independent
    #[default]
    Parallel,
    /// Later tests rely on state left by earlier ones; the first failure
    /// skips the rest
    Serial,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    pub name: String,

    /// Overall budget; falls back to the runner config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Log in (or load the stored session) before the steps
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub login: bool,

    /// Minimum number of probed elements that must be found
    #[serde(default)]
    pub min_found: usize,

    /// Full-page screenshot after the last step
    #[serde(default = "default_true")]
    pub screenshot: bool,

    /// Steps to execute in order
    pub steps: Vec<TestStep>,
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

/// A single step in a test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Navigate to a URL (relative to base)
    Navigate {
        url: String,
    },

    /// Open `wp-admin/admin.php?page=<page>`
    NavigateAdmin {
        page: String,
    },

    /// Hover/click through the sidebar, falling back to the admin page
    NavigateMenu {
        menu: Candidates,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        submenu: Option<Candidates>,
        fallback_page: String,
    },

    /// Look for an element; counts towards `min_found`
    Probe {
        label: String,
        candidates: Candidates,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
        /// A miss fails the test instead of being tolerated
        #[serde(default)]
        required: bool,
    },

    /// Click the first candidate that resolves
    Click {
        label: String,
        candidates: Candidates,
        #[serde(default)]
        required: bool,
    },

    /// Fill an input field
    Fill {
        selector: String,
        value: String,
    },

    /// Bring a checkbox/switch to a state
    Toggle {
        selector: String,
        checked: bool,
        #[serde(default, with = "serde_yaml::with::singleton_map")]
        state: ToggleState,
    },

    /// Wait for an element condition
    Wait {
        selector: String,
        #[serde(default = "default_wait_timeout")]
        timeout_ms: u64,
        #[serde(default)]
        state: WaitState,
    },

    /// Wait for a page load milestone
    WaitForLoad {
        #[serde(default)]
        state: LoadState,
    },

    /// Take a screenshot
    Screenshot {
        name: String,
        #[serde(default = "default_true")]
        full_page: bool,
    },

    /// Log a message (for debugging)
    Log {
        message: String,
    },
}

fn default_wait_timeout() -> u64 {
    5000 // 5 seconds default
}

impl TestStep {
    /// Short name used in logs and results
    pub fn describe(&self) -> String {
        match self {
            TestStep::Navigate { url } => format!("navigate:{}", url),
            TestStep::NavigateAdmin { page } => format!("navigate_admin:{}", page),
            TestStep::NavigateMenu { fallback_page, .. } => format!("navigate_menu:{}", fallback_page),
            TestStep::Probe { label, .. } => format!("probe:{}", label),
            TestStep::Click { label, .. } => format!("click:{}", label),
            TestStep::Fill { selector, .. } => format!("fill:{}", selector),
            TestStep::Toggle { selector, checked, .. } => format!("toggle:{}={}", selector, checked),
            TestStep::Wait { selector, .. } => format!("wait:{}", selector),
            TestStep::WaitForLoad { state } => format!("wait_for_load:{}", state.as_str()),
            TestStep::Screenshot { name, .. } => format!("screenshot:{}", name),
            TestStep::Log { message } => {
                let end = message.char_indices().nth(30).map(|(i, _)| i).unwrap_or(message.len());
                format!("log:{}", &message[..end])
            }
        }
    }
}

impl SuiteFile {
    /// Parse a suite from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let suite: Self = serde_yaml::from_str(yaml)?;
        suite.validate()?;
        Ok(suite)
    }

    /// Parse a suite from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut suite = Self::from_yaml(&content)
            .map_err(|e| E2eError::SuiteParse(format!("{}: {}", path.display(), e)))?;
        suite.source = Some(path.to_path_buf());
        Ok(suite)
    }

    fn validate(&self) -> E2eResult<()> {
        if self.tests.is_empty() {
            return Err(E2eError::SuiteParse(format!("suite '{}' has no tests", self.name)));
        }
        Ok(())
    }

    /// Load every suite file under a directory, sorted by path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                let name = e.file_name().to_string_lossy();
                SUITE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        paths.iter().map(|p| Self::from_file(p)).collect()
    }

    pub fn to_yaml(&self) -> E2eResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Narrows a loaded suite list
#[derive(Debug, Clone, Default)]
pub struct SuiteFilter {
    pub app: Option<App>,
    pub priority: Option<String>,
    pub feature: Option<String>,
    /// Suite name or test name
    pub name: Option<String>,
}

impl SuiteFilter {
    pub fn matches(&self, suite: &SuiteFile) -> bool {
        if let Some(app) = self.app {
            if suite.app != app {
                return false;
            }
        }
        if let Some(priority) = &self.priority {
            if suite.priority.as_deref() != Some(priority.as_str()) {
                return false;
            }
        }
        if let Some(feature) = &self.feature {
            if suite.feature.as_deref() != Some(feature.as_str()) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if suite.name != *name && !suite.tests.iter().any(|t| t.name == *name) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, suites: Vec<SuiteFile>) -> Vec<SuiteFile> {
        suites.into_iter().filter(|s| self.matches(s)).collect()
    }
}
