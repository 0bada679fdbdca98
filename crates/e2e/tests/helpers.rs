//! Probe, toggle and login helpers driven through a scripted page

use std::time::Duration;

use pushengage_e2e::auth::{self, Credentials, LoginForm, LoginOutcome, MenuPath, NavigationRoute};
use pushengage_e2e::fixture::{Call, ScriptedPage};
use pushengage_e2e::probe;
use pushengage_e2e::toggle::{self, ToggleOutcome, ToggleState};
use pushengage_e2e::{Candidates, Timeouts};
use tokio::time::Instant;

const BASE: &str = "https://wp.example.test";

fn candidates(list: &[&str]) -> Candidates {
    Candidates::new("element", list.iter().copied()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_missing_element_costs_one_timeout_per_candidate() {
    let page = ScriptedPage::new(BASE).with_simulated_waits();
    let list = candidates(&["#a", ".b", "text=C"]);
    let per_candidate = Duration::from_secs(5);

    let start = Instant::now();
    let check = probe::check(&page, &list, "missing widget", per_candidate).await;

    assert!(!check.found);
    assert_eq!(check.attempts, 3);
    assert_eq!(start.elapsed(), per_candidate * 3);
}

#[tokio::test(start_paused = true)]
async fn test_found_element_stops_waiting() {
    let page = ScriptedPage::new(BASE).with_simulated_waits().with_visible([".b"]);
    let list = candidates(&["#a", ".b", "text=C"]);

    let start = Instant::now();
    let found = probe::probe(&page, &list, "widget", Duration::from_secs(5)).await;

    assert!(found);
    assert_eq!(start.elapsed(), Duration::from_secs(5));
    assert_eq!(page.selector_waits(), vec!["#a", ".b"]);
}

#[tokio::test]
async fn test_probe_never_errors_on_broken_selectors() {
    let page = ScriptedPage::new(BASE)
        .with_broken_selector("role=button[name=")
        .with_visible(["#save"]);
    let list = candidates(&["role=button[name=", "#save"]);

    let matched = probe::resolve(&page, &list, "save", Duration::from_millis(10)).await;
    assert_eq!(matched.as_deref(), Some("#save"));
}

#[tokio::test]
async fn test_toggle_is_idempotent() {
    let page = ScriptedPage::new(BASE).with_checked("#pe-welcome-notification", true);
    let t = Duration::from_millis(10);

    for desired in [false, false, true, true] {
        toggle::ensure_toggle(&page, "#pe-welcome-notification", desired, &ToggleState::Checked, t)
            .await
            .unwrap();
        let state = toggle::read_state(&page, "#pe-welcome-notification", &ToggleState::Checked, t)
            .await
            .unwrap();
        assert_eq!(state, desired);
    }
    assert_eq!(page.click_count(), 2);

    let outcome = toggle::ensure_toggle(&page, "#pe-welcome-notification", true, &ToggleState::Checked, t)
        .await
        .unwrap();
    assert_eq!(outcome, ToggleOutcome::AlreadySet);
}

#[tokio::test]
async fn test_login_then_menu_navigation() {
    let page = ScriptedPage::new("about:blank")
        .with_login_form(
            "https://wp.example.test/wp-login.php",
            ["#user_login", "#user_pass", "#wp-submit"],
            "https://wp.example.test/wp-admin/",
            false,
        )
        .with_visible(["#toplevel_page_pushengage"])
        .with_click_target(
            "#toplevel_page_pushengage a[href*=\"campaigns\"]",
            "https://wp.example.test/wp-admin/admin.php?page=pushengage#/campaigns",
        );
    let timeouts = Timeouts {
        probe: Duration::from_millis(10),
        ..Timeouts::default()
    };

    let outcome = auth::login(&page, BASE, &Credentials::new("admin", "secret"), &LoginForm::wordpress(), &timeouts)
        .await
        .unwrap();
    assert_eq!(outcome, LoginOutcome::LoggedIn);

    let path = MenuPath {
        menu: candidates(&["#toplevel_page_pushengage"]),
        submenu: Some(candidates(&["#toplevel_page_pushengage a[href*=\"campaigns\"]"])),
        fallback_page: "pushengage#/campaigns".to_string(),
    };
    let route = auth::navigate_via_menu(&page, BASE, &path, &timeouts).await.unwrap();

    assert_eq!(route, NavigationRoute::Menu);
    assert!(page.url().ends_with("#/campaigns"));
    assert!(page.calls().contains(&Call::Hover("#toplevel_page_pushengage".to_string())));
}
