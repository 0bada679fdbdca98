//! The suite files and configs shipped with the repository must stay loadable

use std::path::PathBuf;

use pushengage_e2e::spec::SuiteMode;
use pushengage_e2e::{App, SuiteConfig, SuiteFile, SuiteFilter};

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

#[test]
fn test_bundled_suites_parse() {
    let suites = SuiteFile::load_all(&repo_root().join("tests/suite")).unwrap();

    assert!(suites.len() >= 4);
    assert!(suites.iter().all(|s| s.source.is_some()));
    assert!(suites.iter().all(|s| !s.only));

    let campaigns = suites.iter().find(|s| s.name == "campaigns-list").unwrap();
    assert_eq!(campaigns.mode, SuiteMode::Serial);
    assert_eq!(campaigns.tests.len(), 2);
}

#[test]
fn test_bundled_suites_split_by_app() {
    let suites = SuiteFile::load_all(&repo_root().join("tests/suite")).unwrap();

    let saas = SuiteFilter {
        app: Some(App::Saas),
        ..Default::default()
    }
    .apply(suites.clone());
    assert!(!saas.is_empty());
    assert!(saas.iter().all(|s| s.app == App::Saas));

    let critical_wp = SuiteFilter {
        app: Some(App::Wordpress),
        priority: Some("critical".to_string()),
        ..Default::default()
    }
    .apply(suites);
    assert!(critical_wp.iter().any(|s| s.name == "dashboard-widgets"));
}

#[test]
fn test_bundled_configs_parse() {
    let wp = SuiteConfig::from_file(&repo_root().join("config/wordpress.yaml")).unwrap();
    assert_eq!(wp.app, App::Wordpress);
    assert!(wp.storage_state.is_none());

    let saas = SuiteConfig::from_file(&repo_root().join("config/saas.yaml")).unwrap();
    assert_eq!(saas.app, App::Saas);
    assert_eq!(saas.workers, 1);
    assert!(saas.storage_state.is_some());
}
