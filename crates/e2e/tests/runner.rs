//! Suite runner behaviour against scripted pages

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pushengage_e2e::auth::Credentials;
use pushengage_e2e::fixture::{Call, ScriptedFactory, ScriptedPage};
use pushengage_e2e::{App, E2eError, SuiteConfig, SuiteFile, TestRunner, TestStatus};
use tempfile::TempDir;

const WP: &str = "https://wp.example.test";
const APP: &str = "https://app.example.test";

fn wp_page() -> ScriptedPage {
    ScriptedPage::new("about:blank").with_login_form(
        "https://wp.example.test/wp-login.php?redirect_to=%2Fwp-admin%2F",
        ["#user_login", "#user_pass", "#wp-submit"],
        "https://wp.example.test/wp-admin/",
        false,
    )
}

fn saas_page(authenticated: bool) -> ScriptedPage {
    ScriptedPage::new("about:blank").with_login_form(
        "https://app.example.test/login",
        ["input[name=\"email\"]", "input[name=\"password\"]", "button[type=\"submit\"]"],
        "https://app.example.test/dashboard",
        authenticated,
    )
}

fn wp_config(dir: &Path) -> SuiteConfig {
    let mut config = SuiteConfig::new(App::Wordpress, WP);
    config.credentials = Credentials::new("admin", "secret");
    config.screenshot_dir = dir.join("screenshots");
    config.output_dir = dir.to_path_buf();
    config.probe_timeout_ms = 10;
    config
}

const DASHBOARD_SUITE: &str = r##"
name: dashboard
app: wordpress
priority: critical
feature: dashboard
tests:
  - name: widgets render
    min_found: 2
    steps:
      - action: navigate_admin
        page: pushengage
      - action: probe
        label: subscriber count
        candidates: ["#pe-subscribers", ".pe-stat-subscribers"]
      - action: probe
        label: campaign widget
        candidates: ["#pe-campaigns"]
      - action: probe
        label: optional upsell
        candidates: [".pe-upsell"]
"##;

#[tokio::test]
async fn test_suite_passes_when_enough_elements_found() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(ScriptedFactory::new(|_| {
        wp_page().with_visible([".pe-stat-subscribers", "#pe-campaigns"])
    }));
    let runner = TestRunner::new(wp_config(dir.path()), factory.clone());
    let suite = SuiteFile::from_yaml(DASHBOARD_SUITE).unwrap();

    let results = runner.run_suites(&[suite]).await.unwrap();

    assert!(results.success());
    assert_eq!(results.passed, 1);
    let test = &results.results[0];
    assert_eq!(test.status, TestStatus::Passed);
    assert_eq!(test.found, 2);
    assert_eq!(test.elements.len(), 3);
    assert_eq!(test.elements[0].matched.as_deref(), Some(".pe-stat-subscribers"));

    let shot = test.screenshot.clone().unwrap();
    assert_eq!(shot, dir.path().join("screenshots/dashboard-widgets-render.png"));
    assert!(shot.is_file());

    let page = &factory.pages()[0];
    assert_eq!(page.fill_count(), 2);
    assert!(page.calls().contains(&Call::Goto(
        "https://wp.example.test/wp-admin/admin.php?page=pushengage".to_string()
    )));
    assert_eq!(page.calls().last(), Some(&Call::Close));
}

#[tokio::test]
async fn test_min_found_failure_takes_screenshot() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(ScriptedFactory::new(|_| wp_page().with_visible(["#pe-campaigns"])));
    let runner = TestRunner::new(wp_config(dir.path()), factory);
    let suite = SuiteFile::from_yaml(DASHBOARD_SUITE).unwrap();

    let results = runner.run_suites(&[suite]).await.unwrap();

    assert!(!results.success());
    let test = &results.results[0];
    assert_eq!(test.status, TestStatus::Failed);
    assert_eq!(test.found, 1);
    assert!(test.error.as_deref().unwrap().contains("expected at least 2"));

    let shot = test.screenshot.clone().unwrap();
    assert_eq!(shot, dir.path().join("screenshots/dashboard-widgets-render-failure.png"));
    assert!(shot.is_file());
}

#[tokio::test]
async fn test_pass_on_retry_is_flaky() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(ScriptedFactory::new(|opened| {
        let page = wp_page().with_visible(["#pe-campaigns"]);
        if opened == 0 {
            page
        } else {
            page.with_visible(["#pe-subscribers"])
        }
    }));
    let mut config = wp_config(dir.path());
    config.retries = 2;
    let runner = TestRunner::new(config, factory.clone());

    let results = runner
        .run_suites(&[SuiteFile::from_yaml(DASHBOARD_SUITE).unwrap()])
        .await
        .unwrap();

    let test = &results.results[0];
    assert_eq!(test.status, TestStatus::Flaky);
    assert_eq!(test.attempts, 2);
    assert_eq!(results.flaky, 1);
    assert!(results.success());
    assert_eq!(factory.pages().len(), 2);
}

#[tokio::test]
async fn test_serial_suite_skips_after_failure() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(ScriptedFactory::new(|_| wp_page()));
    let runner = TestRunner::new(wp_config(dir.path()), factory.clone());
    let suite = SuiteFile::from_yaml(
        r##"
name: campaign lifecycle
mode: serial
tests:
  - name: create
    screenshot: false
    steps:
      - action: click
        label: add new
        candidates: ["#pe-add-campaign"]
        required: true
  - name: edit
    steps:
      - action: log
        message: editing
  - name: delete
    steps:
      - action: log
        message: deleting
"##,
    )
    .unwrap();

    let results = runner.run_suites(&[suite]).await.unwrap();

    let statuses: Vec<TestStatus> = results.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![TestStatus::Failed, TestStatus::Skipped, TestStatus::Skipped]
    );
    assert_eq!(results.skipped, 2);
    assert_eq!(factory.pages().len(), 1);
}

#[tokio::test]
async fn test_parallel_files_keep_file_order() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(ScriptedFactory::new(|_| wp_page()));
    let mut config = wp_config(dir.path());
    config.workers = 3;
    let runner = TestRunner::new(config, factory);

    let suites: Vec<SuiteFile> = ["alpha", "beta", "gamma"]
        .iter()
        .map(|name| {
            SuiteFile::from_yaml(&format!(
                "name: {}\ntests:\n  - name: smoke\n    screenshot: false\n    steps:\n      - action: log\n        message: hi\n",
                name
            ))
            .unwrap()
        })
        .collect();

    let results = runner.run_suites(&suites).await.unwrap();

    let names: Vec<&str> = results.results.iter().map(|r| r.suite.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    assert_eq!(results.passed, 3);
}

#[test]
fn test_only_focuses_and_forbid_only_rejects() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(ScriptedFactory::new(|_| wp_page()));
    let mut focused = SuiteFile::from_yaml(DASHBOARD_SUITE).unwrap();
    focused.only = true;
    let mut other = focused.clone();
    other.name = "other".to_string();
    other.only = false;

    let runner = TestRunner::new(wp_config(dir.path()), factory.clone());
    let selected = runner.select(vec![other.clone(), focused.clone()]).unwrap();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].name, "dashboard");

    let mut config = wp_config(dir.path());
    config.forbid_only = true;
    let strict = TestRunner::new(config, factory);
    let err = strict.select(vec![other, focused]).unwrap_err();
    assert!(matches!(err, E2eError::ForbidOnly(name) if name == "dashboard"));
}

#[tokio::test(start_paused = true)]
async fn test_test_timeout_fails_with_screenshot() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(ScriptedFactory::new(|_| wp_page().with_simulated_waits()));
    let runner = TestRunner::new(wp_config(dir.path()), factory.clone());
    let suite = SuiteFile::from_yaml(
        r##"
name: slow
tests:
  - name: t
    timeout_ms: 1000
    steps:
      - action: probe
        label: late widget
        candidates: ["#pe-late"]
        timeout_ms: 10000
"##,
    )
    .unwrap();

    let start = tokio::time::Instant::now();
    let results = runner.run_suites(&[suite]).await.unwrap();

    assert!(start.elapsed() < std::time::Duration::from_secs(10));
    let test = &results.results[0];
    assert_eq!(test.status, TestStatus::Failed);
    assert!(test.error.as_deref().unwrap().contains("exceeded 1000 ms"));

    let shot = test.screenshot.clone().unwrap();
    assert_eq!(shot, dir.path().join("screenshots/slow-t-failure.png"));
    assert!(shot.is_file());
    assert_eq!(factory.pages()[0].calls().last(), Some(&Call::Close));
}

#[tokio::test]
async fn test_unbounded_retries_do_not_overflow() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(ScriptedFactory::new(|_| wp_page()));
    let mut config = wp_config(dir.path());
    config.retries = u32::MAX;
    let runner = TestRunner::new(config, factory.clone());
    let suite = SuiteFile::from_yaml(
        "name: s\ntests:\n  - name: t\n    screenshot: false\n    steps:\n      - action: log\n        message: x\n",
    )
    .unwrap();

    let results = runner.run_suites(&[suite]).await.unwrap();

    assert_eq!(results.results[0].status, TestStatus::Passed);
    assert_eq!(results.results[0].attempts, 1);
    assert_eq!(factory.pages().len(), 1);
}

#[tokio::test]
async fn test_menu_step_falls_back_to_admin_url() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(ScriptedFactory::new(|_| wp_page()));
    let runner = TestRunner::new(wp_config(dir.path()), factory.clone());
    let suite = SuiteFile::from_yaml(
        r##"
name: menu
tests:
  - name: settings via sidebar
    screenshot: false
    steps:
      - action: navigate_menu
        menu: ["#toplevel_page_pushengage"]
        submenu: ["text=Settings"]
        fallback_page: pushengage#/settings
"##,
    )
    .unwrap();

    let results = runner.run_suites(&[suite]).await.unwrap();

    assert_eq!(results.passed, 1);
    assert_eq!(results.results[0].steps[0].step_name, "navigate_menu:pushengage#/settings");
    assert_eq!(
        factory.pages()[0].url(),
        "https://wp.example.test/wp-admin/admin.php?page=pushengage#/settings"
    );
}

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

#[tokio::test]
async fn test_bundled_serial_suite_navigates_in_every_test() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(ScriptedFactory::new(|_| {
        wp_page().with_visible([
            "table.pe-campaigns",
            "a:has-text(\"Create\")",
            "input[name=\"title\"]",
            ".pe-notification-preview",
        ])
    }));
    let runner = TestRunner::new(wp_config(dir.path()), factory.clone());
    let suite = SuiteFile::from_file(&repo_root().join("tests/suite/critical/campaigns/01-campaigns-list.spec.yaml"))
        .unwrap();

    let results = runner.run_suites(&[suite]).await.unwrap();

    assert_eq!(results.passed, 2);
    let campaigns = Call::Goto("https://wp.example.test/wp-admin/admin.php?page=pushengage#/campaigns/notifications".to_string());
    let create = Call::Click("a:has-text(\"Create\")".to_string());
    let pages = factory.pages();
    assert_eq!(pages.len(), 2);
    for page in &pages {
        let calls = page.calls();
        let navigated = calls.iter().position(|c| c == &campaigns).unwrap();
        if let Some(clicked) = calls.iter().position(|c| c == &create) {
            assert!(navigated < clicked);
        }
    }
    assert!(pages[1].calls().contains(&create));
}

#[tokio::test]
async fn test_saas_logs_in_once_and_reuses_state() {
    let dir = TempDir::new().unwrap();
    let state = dir.path().join(".auth/app-state.json");
    let factory = Arc::new(ScriptedFactory::new(|opened| saas_page(opened > 0)));

    let mut config = SuiteConfig::new(App::Saas, APP);
    config.credentials = Credentials::new("qa@example.test", "pw");
    config.storage_state = Some(state.clone());
    config.screenshot_dir = dir.path().join("screenshots");
    config.workers = 2;
    let runner = TestRunner::new(config, factory.clone());

    let suite = SuiteFile::from_yaml(
        r#"
name: campaigns
app: saas
tests:
  - name: list
    screenshot: false
    steps:
      - action: navigate
        url: /campaigns
  - name: drafts
    screenshot: false
    steps:
      - action: navigate
        url: /campaigns/drafts
"#,
    )
    .unwrap();

    let results = runner.run_suites(&[suite]).await.unwrap();

    assert_eq!(results.passed, 2);
    assert!(state.is_file());

    let pages = factory.pages();
    let options = factory.options();
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0].fill_count(), 2);
    assert!(options[0].storage_state.is_none());
    for (page, opts) in pages.iter().zip(options.iter()).skip(1) {
        assert_eq!(page.fill_count(), 0);
        assert_eq!(opts.storage_state.as_deref(), Some(state.as_path()));
    }
}

#[tokio::test]
async fn test_saas_without_state_or_credentials_fails() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(ScriptedFactory::new(|_| saas_page(false)));
    let mut config = SuiteConfig::new(App::Saas, APP);
    config.storage_state = Some(dir.path().join("missing.json"));
    let runner = TestRunner::new(config, factory.clone());

    let suite = SuiteFile::from_yaml(
        "name: s\napp: saas\ntests:\n  - name: t\n    steps:\n      - action: log\n        message: x\n",
    )
    .unwrap();

    let err = runner.run_suites(&[suite]).await.unwrap_err();
    assert!(matches!(err, E2eError::StorageStateMissing(_)));
    assert!(factory.pages().is_empty());
}
