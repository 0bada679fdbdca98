//! Login and admin navigation
//!
//! All waits here are condition based: load states, URL changes and
//! selector visibility, each with an explicit timeout.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Timeouts;
use crate::error::{E2eError, E2eResult};
use crate::page::{LoadState, Page};
use crate::probe::{self, Candidates};

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Where the login form lives and how to fill it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginForm {
    /// Page opened first; an unauthenticated session gets redirected from here
    pub entry_path: String,
    /// URL fragment identifying the login page
    pub login_path: String,
    pub username: String,
    pub password: String,
    pub submit: String,
}

impl LoginForm {
    pub fn wordpress() -> Self {
        Self {
            entry_path: "/wp-admin/".to_string(),
            login_path: "wp-login.php".to_string(),
            username: "#user_login".to_string(),
            password: "#user_pass".to_string(),
            submit: "#wp-submit".to_string(),
        }
    }

    pub fn saas() -> Self {
        Self {
            entry_path: "/dashboard".to_string(),
            login_path: "/login".to_string(),
            username: "input[name=\"email\"]".to_string(),
            password: "input[name=\"password\"]".to_string(),
            submit: "button[type=\"submit\"]".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    AlreadyAuthenticated,
    LoggedIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationRoute {
    Menu,
    DirectUrl,
}

/// Join a base URL and a path without doubling or dropping the slash
pub fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// `wp-admin/admin.php?page=<slug>` under `base_url`
pub fn admin_page_url(base_url: &str, slug: &str) -> String {
    join_url(base_url, &format!("/wp-admin/admin.php?page={}", slug))
}

/// Establish an authenticated session.
///
/// Opens the form's entry page; the form is filled only when that lands on
/// the login path.
pub async fn login(
    page: &dyn Page,
    base_url: &str,
    credentials: &Credentials,
    form: &LoginForm,
    timeouts: &Timeouts,
) -> E2eResult<LoginOutcome> {
    let entry = join_url(base_url, &form.entry_path);
    page.goto(&entry).await?;
    // client-side redirects to the login page can fire after DOMContentLoaded
    page.wait_for_load_state(LoadState::NetworkIdle, timeouts.navigation)
        .await?;

    let landed = page.current_url().await?;
    if !landed.contains(&form.login_path) {
        info!("Already authenticated at {}", landed);
        return Ok(LoginOutcome::AlreadyAuthenticated);
    }

    if !credentials.is_complete() {
        return Err(E2eError::MissingCredentials(format!(
            "login form at {} needs a username and password",
            landed
        )));
    }

    info!("Logging in as {}", credentials.username);
    page.fill(&form.username, &credentials.username, timeouts.action)
        .await?;
    page.fill(&form.password, &credentials.password, timeouts.action)
        .await?;
    page.click(&form.submit, timeouts.action).await?;

    match page
        .wait_for_url(&form.login_path, false, timeouts.navigation)
        .await
    {
        Ok(()) => {}
        Err(e) if e.is_timeout() => {
            let stuck = page.current_url().await.unwrap_or(landed);
            return Err(E2eError::LoginFailed(stuck));
        }
        Err(e) => return Err(e),
    }
    page.wait_for_load_state(LoadState::DomContentLoaded, timeouts.navigation)
        .await?;

    info!("Logged in");
    Ok(LoginOutcome::LoggedIn)
}

/// Open `path` (relative to `base_url`) and wait for the network to settle
pub async fn navigate_to(page: &dyn Page, base_url: &str, path: &str, timeouts: &Timeouts) -> E2eResult<()> {
    let url = join_url(base_url, path);
    info!("Navigating to {}", url);
    page.goto(&url).await?;
    page.wait_for_load_state(LoadState::NetworkIdle, timeouts.navigation)
        .await
}

/// Open an admin page by slug
pub async fn navigate_to_admin_page(page: &dyn Page, base_url: &str, slug: &str, timeouts: &Timeouts) -> E2eResult<()> {
    navigate_to(page, base_url, &admin_page_url(base_url, slug), timeouts).await
}

/// Sidebar route to an admin section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuPath {
    /// Top-level sidebar entry
    pub menu: Candidates,
    /// Entry inside the flyout; the top-level entry is clicked when absent
    #[serde(default)]
    pub submenu: Option<Candidates>,
    /// Admin page slug used when the menu route fails
    pub fallback_page: String,
}

/// Hover/click through the sidebar, falling back to the direct admin URL
pub async fn navigate_via_menu(
    page: &dyn Page,
    base_url: &str,
    path: &MenuPath,
    timeouts: &Timeouts,
) -> E2eResult<NavigationRoute> {
    match follow_menu(page, path, timeouts).await {
        Ok(true) => {
            page.wait_for_load_state(LoadState::NetworkIdle, timeouts.navigation)
                .await?;
            Ok(NavigationRoute::Menu)
        }
        Ok(false) => {
            warn!("Menu route unavailable, opening {} directly", path.fallback_page);
            navigate_to_admin_page(page, base_url, &path.fallback_page, timeouts).await?;
            Ok(NavigationRoute::DirectUrl)
        }
        Err(e) => {
            warn!("Menu route failed ({}), opening {} directly", e, path.fallback_page);
            navigate_to_admin_page(page, base_url, &path.fallback_page, timeouts).await?;
            Ok(NavigationRoute::DirectUrl)
        }
    }
}

async fn follow_menu(page: &dyn Page, path: &MenuPath, timeouts: &Timeouts) -> E2eResult<bool> {
    let Some(menu) = probe::resolve(page, &path.menu, "sidebar menu", timeouts.probe).await else {
        return Ok(false);
    };

    let Some(submenu) = &path.submenu else {
        page.click(&menu, timeouts.action).await?;
        return Ok(true);
    };

    page.hover(&menu, timeouts.action).await?;
    match probe::click_first(page, submenu, "submenu", timeouts.probe).await? {
        Some(_) => Ok(true),
        None => Ok(false),
    }
}

/// Pick `site` in the SaaS dashboard's site switcher.
///
/// Returns false when the switcher or the site entry is not on the page.
pub async fn select_site(page: &dyn Page, site: &str, timeouts: &Timeouts) -> E2eResult<bool> {
    let switcher = Candidates::new(
        "site switcher",
        [
            "[data-testid=\"site-switcher\"]",
            ".site-selector",
            "role=combobox[name=/site/i]",
        ],
    )?;
    if probe::click_first(page, &switcher, "site switcher", timeouts.probe)
        .await?
        .is_none()
    {
        return Ok(false);
    }

    let quoted = quote(site);
    let entry = Candidates::new(
        "site entry",
        [format!("role=option[name={}]", quoted), format!("text={}", quoted)],
    )?;
    let picked = probe::click_first(page, &entry, site, timeouts.probe).await?;
    if picked.is_some() {
        page.wait_for_load_state(LoadState::NetworkIdle, timeouts.navigation)
            .await?;
        info!("Selected site {}", site);
    }
    Ok(picked.is_some())
}

/// Double-quoted selector string with `\` and `"` escaped
fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{Call, ScriptedPage};
    use test_case::test_case;

    const BASE: &str = "https://wp.example.test";

    fn wp_page(authenticated: bool) -> ScriptedPage {
        ScriptedPage::new("about:blank").with_login_form(
            "https://wp.example.test/wp-login.php?redirect_to=%2Fwp-admin%2F",
            ["#user_login", "#user_pass", "#wp-submit"],
            "https://wp.example.test/wp-admin/",
            authenticated,
        )
    }

    fn creds() -> Credentials {
        Credentials::new("admin", "secret")
    }

    #[test_case("https://a.test", "/wp-admin/", "https://a.test/wp-admin/")]
    #[test_case("https://a.test/", "/wp-admin/", "https://a.test/wp-admin/")]
    #[test_case("https://a.test/", "login", "https://a.test/login")]
    #[test_case("https://a.test", "https://b.test/x", "https://b.test/x")]
    fn test_join_url(base: &str, path: &str, expected: &str) {
        assert_eq!(join_url(base, path), expected);
    }

    #[test]
    fn test_admin_page_url() {
        assert_eq!(
            admin_page_url("https://wp.example.test/", "pushengage#/campaigns"),
            "https://wp.example.test/wp-admin/admin.php?page=pushengage#/campaigns"
        );
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let rendered = format!("{:?}", creds());
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("secret"));
    }

    #[tokio::test]
    async fn test_authenticated_session_skips_form() {
        let page = wp_page(true);

        let outcome = login(&page, BASE, &creds(), &LoginForm::wordpress(), &Timeouts::default())
            .await
            .unwrap();

        assert_eq!(outcome, LoginOutcome::AlreadyAuthenticated);
        assert_eq!(page.fill_count(), 0);
        assert_eq!(page.click_count(), 0);
    }

    #[tokio::test]
    async fn test_redirect_to_login_fills_form_once() {
        let page = wp_page(false);

        let outcome = login(&page, BASE, &creds(), &LoginForm::wordpress(), &Timeouts::default())
            .await
            .unwrap();

        assert_eq!(outcome, LoginOutcome::LoggedIn);
        let calls = page.calls();
        let actions: Vec<&Call> = calls
            .iter()
            .filter(|c| matches!(c, Call::Fill(..) | Call::Click(_)))
            .collect();
        assert_eq!(
            actions,
            vec![
                &Call::Fill("#user_login".to_string(), "admin".to_string()),
                &Call::Fill("#user_pass".to_string(), "secret".to_string()),
                &Call::Click("#wp-submit".to_string()),
            ]
        );
        assert_eq!(page.url(), "https://wp.example.test/wp-admin/");
    }

    #[tokio::test]
    async fn test_login_without_credentials_fails_before_typing() {
        let page = wp_page(false);

        let err = login(&page, BASE, &Credentials::default(), &LoginForm::wordpress(), &Timeouts::default())
            .await
            .unwrap_err();

        assert!(matches!(err, E2eError::MissingCredentials(_)));
        assert_eq!(page.fill_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_login_reports_stuck_url() {
        // Submit button exists but never authenticates
        let page = ScriptedPage::new("about:blank")
            .with_login_form(
                "https://wp.example.test/wp-login.php",
                ["#user_login", "#user_pass", "#other-submit"],
                "https://wp.example.test/wp-admin/",
                false,
            )
            .with_visible(["#wp-submit"]);

        let err = login(&page, BASE, &creds(), &LoginForm::wordpress(), &Timeouts::default())
            .await
            .unwrap_err();

        assert!(matches!(err, E2eError::LoginFailed(url) if url.contains("wp-login.php")));
    }

    #[tokio::test]
    async fn test_menu_navigation_hovers_then_clicks_submenu() {
        let page = ScriptedPage::new("https://wp.example.test/wp-admin/")
            .with_visible(["#toplevel_page_pushengage"])
            .with_click_target(
                "a[href*=\"pushengage#/campaigns\"]",
                "https://wp.example.test/wp-admin/admin.php?page=pushengage#/campaigns",
            );
        let path = MenuPath {
            menu: Candidates::new("menu", ["#toplevel_page_pushengage"]).unwrap(),
            submenu: Some(Candidates::new("sub", ["text=Campaigns", "a[href*=\"pushengage#/campaigns\"]"]).unwrap()),
            fallback_page: "pushengage#/campaigns".to_string(),
        };

        let route = navigate_via_menu(&page, BASE, &path, &Timeouts::default()).await.unwrap();

        assert_eq!(route, NavigationRoute::Menu);
        assert!(page.calls().contains(&Call::Hover("#toplevel_page_pushengage".to_string())));
        assert!(page.url().ends_with("page=pushengage#/campaigns"));
        assert!(!page.calls().iter().any(|c| matches!(c, Call::Goto(_))));
    }

    #[tokio::test]
    async fn test_select_site() {
        let page = ScriptedPage::new("https://app.example.test/dashboard")
            .with_visible([".site-selector", "text=\"Staging Blog\""]);

        assert!(select_site(&page, "Staging Blog", &Timeouts::default()).await.unwrap());
        assert!(page.calls().contains(&Call::Click("text=\"Staging Blog\"".to_string())));
        assert!(!select_site(&page, "Other", &Timeouts::default()).await.unwrap());
    }

    #[test_case("Staging Blog", r#""Staging Blog""#)]
    #[test_case(r#"The "Main" Blog"#, r#""The \"Main\" Blog""#)]
    #[test_case(r"C:\sites", r#""C:\\sites""#)]
    fn test_quote(text: &str, expected: &str) {
        assert_eq!(quote(text), expected);
    }

    #[tokio::test]
    async fn test_select_site_escapes_quotes() {
        let page = ScriptedPage::new("https://app.example.test/dashboard")
            .with_visible([".site-selector", r#"text="The \"Main\" Blog""#]);

        assert!(select_site(&page, r#"The "Main" Blog"#, &Timeouts::default()).await.unwrap());
        assert!(page
            .selector_waits()
            .contains(&r#"role=option[name="The \"Main\" Blog"]"#.to_string()));
        assert!(page
            .calls()
            .contains(&Call::Click(r#"text="The \"Main\" Blog""#.to_string())));
    }

    #[tokio::test]
    async fn test_late_redirect_to_login_still_logs_in() {
        let page = wp_page(false).with_late_login_redirect();

        let outcome = login(&page, BASE, &creds(), &LoginForm::wordpress(), &Timeouts::default())
            .await
            .unwrap();

        assert_eq!(outcome, LoginOutcome::LoggedIn);
        assert_eq!(page.fill_count(), 2);
        assert_eq!(page.url(), "https://wp.example.test/wp-admin/");
    }

    #[tokio::test]
    async fn test_missing_menu_falls_back_to_direct_url() {
        let page = ScriptedPage::new("https://wp.example.test/wp-admin/");
        let path = MenuPath {
            menu: Candidates::new("menu", ["#toplevel_page_pushengage", "text=PushEngage"]).unwrap(),
            submenu: None,
            fallback_page: "pushengage#/settings".to_string(),
        };

        let route = navigate_via_menu(&page, BASE, &path, &Timeouts::default()).await.unwrap();

        assert_eq!(route, NavigationRoute::DirectUrl);
        assert_eq!(
            page.url(),
            "https://wp.example.test/wp-admin/admin.php?page=pushengage#/settings"
        );
    }
}
