//! PushEngage regression suite engine
//!
//! This crate drives a real browser against the PushEngage WordPress plugin
//! admin or the PushEngage SaaS dashboard:
//! - Controls Playwright through a long-lived node bridge (JSON lines)
//! - Probes UI elements through ordered selector fallbacks
//! - Logs in once and persists the SaaS session as storage state
//! - Parses declarative YAML suite files and reports list/JSON/HTML
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Suite Runner (Rust)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── preflight() -> base URL answers                      │
//! │    ├── SessionStore::ensure() -> storage state (SaaS)       │
//! │    ├── run_suites() -> up to `workers` files at once        │
//! │    └── run_test() -> retries, failure screenshot            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Helpers over dyn Page                                      │
//! │    ├── probe::check(candidates) -> ElementCheck             │
//! │    ├── toggle::ensure_toggle(desired) -> at most one click  │
//! │    └── auth::login / navigate_via_menu / select_site        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteFile (YAML)                                           │
//! │    ├── name, app, priority, feature, mode                   │
//! │    └── tests: [TestSpec { min_found, steps: [TestStep] }]   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod fixture;
pub mod page;
pub mod playwright;
pub mod probe;
pub mod report;
pub mod runner;
pub mod session;
pub mod spec;
pub mod toggle;

pub use config::{App, ConfigOverrides, Reporter, SuiteConfig, Timeouts};
pub use error::{E2eError, E2eResult};
pub use page::{Page, PageFactory};
pub use playwright::{Playwright, PlaywrightConfig};
pub use probe::{Candidates, ElementCheck};
pub use runner::{TestResult, TestRunner, TestStatus, TestSuiteResult};
pub use session::SessionStore;
pub use spec::{SuiteFile, SuiteFilter, TestSpec, TestStep};
