//! CLI Commands

pub mod generate;
pub mod run;
pub mod session;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use pushengage_e2e::page::Browser;
use pushengage_e2e::{App, ConfigOverrides, SuiteConfig};
use tracing::debug;

/// Settings read from the environment (flags win)
#[derive(Args, Debug, Clone, Default)]
pub struct EnvArgs {
    /// WordPress site URL
    #[arg(long, env = "PE_WP_BASE_URL", hide_env_values = true)]
    pub wp_base_url: Option<String>,

    /// PushEngage dashboard URL
    #[arg(long, env = "PE_APP_BASE_URL", hide_env_values = true)]
    pub app_base_url: Option<String>,

    #[arg(long, env = "PE_WP_USERNAME", hide_env_values = true)]
    pub wp_username: Option<String>,

    #[arg(long, env = "PE_WP_PASSWORD", hide_env_values = true)]
    pub wp_password: Option<String>,

    #[arg(long, env = "PE_APP_USERNAME", hide_env_values = true)]
    pub app_username: Option<String>,

    #[arg(long, env = "PE_APP_PASSWORD", hide_env_values = true)]
    pub app_password: Option<String>,

    /// Per-test timeout in milliseconds
    #[arg(long, env = "PE_DEFAULT_TIMEOUT")]
    pub timeout_ms: Option<u64>,

    #[arg(long, env = "PE_HEADLESS")]
    pub headless: Option<bool>,

    /// chromium, firefox or webkit
    #[arg(long, env = "PE_BROWSER")]
    pub browser: Option<Browser>,

    #[arg(long, env = "PE_REPORT_DIR")]
    pub report_dir: Option<PathBuf>,

    #[arg(long, env = "PE_SCREENSHOT_DIR")]
    pub screenshot_dir: Option<PathBuf>,

    #[arg(long, env = "PE_VIDEO_DIR")]
    pub video_dir: Option<PathBuf>,

    /// Site picked in the dashboard site switcher
    #[arg(long, env = "PE_DEFAULT_SITE")]
    pub default_site: Option<String>,

    #[arg(long, env = "PE_RETRIES")]
    pub retries: Option<u32>,

    #[arg(long, env = "PE_WORKERS")]
    pub workers: Option<usize>,

    /// Running under CI; suites marked `only` are rejected
    #[arg(long, env = "CI", action = clap::ArgAction::Set, value_parser = parse_ci, default_value = "false")]
    pub ci: bool,
}

fn parse_ci(value: &str) -> Result<bool, String> {
    Ok(!matches!(value.trim().to_ascii_lowercase().as_str(), "" | "0" | "false" | "no"))
}

impl EnvArgs {
    /// Overrides for `app`; the other app's variables are ignored
    pub fn overrides(&self, app: App) -> ConfigOverrides {
        let (base_url, username, password) = match app {
            App::Wordpress => (&self.wp_base_url, &self.wp_username, &self.wp_password),
            App::Saas => (&self.app_base_url, &self.app_username, &self.app_password),
        };
        ConfigOverrides {
            base_url: base_url.clone(),
            username: username.clone(),
            password: password.clone(),
            timeout_ms: self.timeout_ms,
            headless: self.headless,
            browser: self.browser,
            report_dir: self.report_dir.clone(),
            screenshot_dir: self.screenshot_dir.clone(),
            video_dir: self.video_dir.clone(),
            default_site: self.default_site.clone(),
            retries: self.retries,
            workers: self.workers,
            ci: self.ci,
        }
    }
}

/// Read a suite config file and layer the environment on top
pub fn load_config(path: &Path, env: &EnvArgs) -> Result<SuiteConfig> {
    let mut config = SuiteConfig::from_file(path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;
    config.apply(env.overrides(config.app));
    config.validate()?;
    debug!("Effective config: {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("true", true)]
    #[test_case("1", true)]
    #[test_case("false", false)]
    #[test_case("0", false)]
    #[test_case("", false)]
    fn test_parse_ci(raw: &str, expected: bool) {
        assert_eq!(parse_ci(raw).unwrap(), expected);
    }

    #[test]
    fn test_overrides_pick_app_variables() {
        let env = EnvArgs {
            wp_base_url: Some("https://wp.example.test".to_string()),
            wp_username: Some("admin".to_string()),
            app_base_url: Some("https://app.example.test".to_string()),
            app_username: Some("qa@example.test".to_string()),
            app_password: Some("pw".to_string()),
            ..Default::default()
        };

        let wp = env.overrides(App::Wordpress);
        assert_eq!(wp.base_url.as_deref(), Some("https://wp.example.test"));
        assert_eq!(wp.username.as_deref(), Some("admin"));
        assert!(wp.password.is_none());

        let saas = env.overrides(App::Saas);
        assert_eq!(saas.base_url.as_deref(), Some("https://app.example.test"));
        assert_eq!(saas.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_load_config_applies_env() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("saas.yaml");
        std::fs::write(&path, "app: saas\nbase_url: https://staging.example.test\n").unwrap();

        let env = EnvArgs {
            app_base_url: Some("https://app.example.test".to_string()),
            retries: Some(2),
            ci: true,
            ..Default::default()
        };
        let config = load_config(&path, &env).unwrap();

        assert_eq!(config.base_url, "https://app.example.test");
        assert_eq!(config.retries, 2);
        assert!(config.forbid_only);
    }
}
