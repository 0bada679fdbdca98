//! Test plan scaffold generator
//!
//! Expands a YAML test plan (priority → feature → descriptors) into one
//! `.spec.yaml` scaffold per unfinished descriptor plus a README per
//! priority tier with completion figures.
//!
//! Descriptors not marked `DONE` are rewritten on every run, so edits made
//! to a scaffold in place are lost until its status is flipped.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use pushengage_e2e::probe::Candidates;
use pushengage_e2e::spec::{SuiteMode, TestSpec, TestStep};
use pushengage_e2e::{App, SuiteFile};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const DONE: &str = "DONE";

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("cannot read test plan {path}: {source}")]
    ReadPlan {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid test plan: {0}")]
    Plan(#[from] serde_yaml::Error),

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot render scaffold: {0}")]
    Render(#[from] pushengage_e2e::E2eError),
}

pub type GenerateResult<T> = Result<T, GenerateError>;

/// The whole plan, in display order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestPlan {
    #[serde(default)]
    pub app: App,
    pub priorities: Vec<Priority>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Priority {
    pub name: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    #[serde(default)]
    pub tests: Vec<Descriptor>,
}

/// One planned or finished test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Descriptor {
    pub slug: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Descriptor {
    pub fn is_done(&self) -> bool {
        self.status.as_deref() == Some(DONE)
    }
}

/// `k` done out of `n`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub done: usize,
    pub total: usize,
}

impl Completion {
    fn of<'a>(descriptors: impl IntoIterator<Item = &'a Descriptor>) -> Self {
        descriptors.into_iter().fold(Self::default(), |acc, d| Self {
            done: acc.done + usize::from(d.is_done()),
            total: acc.total + 1,
        })
    }

    /// round(100·k/n), halves rounding up; 0 when there is nothing to do
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            return 0;
        }
        (200 * self.done + self.total) / (2 * self.total)
    }
}

impl std::fmt::Display for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} - {}%", self.done, self.total, self.percent())
    }
}

/// What one run produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
    pub written: Vec<PathBuf>,
    pub readmes: Vec<PathBuf>,
}

impl TestPlan {
    pub fn from_yaml(yaml: &str) -> GenerateResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> GenerateResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| GenerateError::ReadPlan {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn completion(&self) -> Completion {
        Completion::of(
            self.priorities
                .iter()
                .flat_map(|p| &p.features)
                .flat_map(|f| &f.tests),
        )
    }
}

/// `<root>/<priority>/<feature>/<NN-slug>.spec.yaml`
pub fn scaffold_path(root: &Path, priority: &str, feature: &str, position: usize, slug: &str) -> PathBuf {
    root.join(priority)
        .join(feature)
        .join(format!("{:02}-{}.spec.yaml", position, slug))
}

/// Write every scaffold and README of the plan under `root`
pub fn generate(plan: &TestPlan, root: &Path) -> GenerateResult<GenerationReport> {
    let mut report = GenerationReport::default();

    for priority in &plan.priorities {
        for feature in &priority.features {
            for (index, descriptor) in feature.tests.iter().enumerate() {
                if descriptor.is_done() {
                    debug!("{}/{}/{} is done, leaving it alone", priority.name, feature.name, descriptor.slug);
                    continue;
                }
                let path = scaffold_path(root, &priority.name, &feature.name, index + 1, &descriptor.slug);
                let content = render_scaffold(plan.app, &priority.name, &feature.name, descriptor)?;
                write_file(&path, &content)?;
                report.written.push(path);
            }
        }

        let readme = root.join(&priority.name).join("README.md");
        write_file(&readme, &render_readme(priority))?;
        report.readmes.push(readme);
    }

    let completion = plan.completion();
    report.total = completion.total;
    report.completed = completion.done;
    report.remaining = completion.total - completion.done;

    info!(
        "Generated {} scaffold(s) and {} README(s) under {}",
        report.written.len(),
        report.readmes.len(),
        root.display()
    );
    Ok(report)
}

fn write_file(path: &Path, content: &str) -> GenerateResult<()> {
    let io = |source| GenerateError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io)?;
    }
    std::fs::write(path, content).map_err(io)
}

/// Suite file skeleton for one descriptor
pub fn render_scaffold(app: App, priority: &str, feature: &str, descriptor: &Descriptor) -> GenerateResult<String> {
    let (entry, screen) = match app {
        App::Wordpress => (
            TestStep::NavigateAdmin {
                page: "pushengage".to_string(),
            },
            Candidates::new(
                "PushEngage admin screen",
                ["#pushengage-admin", ".pushengage-wrapper", "text=PushEngage"],
            )?,
        ),
        App::Saas => (
            TestStep::Navigate {
                url: "/dashboard".to_string(),
            },
            Candidates::new(
                "PushEngage dashboard",
                ["[data-testid=\"dashboard\"]", "main .dashboard", "text=Dashboard"],
            )?,
        ),
    };

    let suite = SuiteFile {
        name: descriptor.slug.clone(),
        description: descriptor.description.clone(),
        app,
        priority: Some(priority.to_string()),
        feature: Some(feature.to_string()),
        mode: SuiteMode::Parallel,
        only: false,
        tests: vec![TestSpec {
            name: descriptor.description.clone(),
            timeout_ms: Some(120_000),
            login: true,
            min_found: 1,
            screenshot: true,
            steps: vec![
                entry,
                TestStep::Probe {
                    label: screen.first().to_string(),
                    candidates: screen,
                    timeout_ms: None,
                    required: false,
                },
                TestStep::Log {
                    message: format!("Scaffold for '{}': add the feature steps", descriptor.description),
                },
            ],
        }],
        source: None,
    };

    let mut out = String::new();
    let _ = writeln!(out, "# {} / {} / {}", priority, feature, descriptor.slug);
    let _ = writeln!(out, "# Generated by `pe-suite generate`. Set `status: {}` on this", DONE);
    let _ = writeln!(out, "# descriptor in the test plan once implemented; until then");
    let _ = writeln!(out, "# every run rewrites this file.");
    out.push_str(&suite.to_yaml()?);
    Ok(out)
}

/// Per-tier summary listing every descriptor
pub fn render_readme(priority: &Priority) -> String {
    let tier = Completion::of(priority.features.iter().flat_map(|f| &f.tests));

    let mut out = String::new();
    let _ = writeln!(out, "# {} tests", priority.name);
    let _ = writeln!(out);
    let _ = writeln!(out, "Completion: {}", tier);

    for feature in &priority.features {
        let _ = writeln!(out);
        let _ = writeln!(out, "## {} ({})", feature.name, Completion::of(&feature.tests));
        let _ = writeln!(out);
        for (index, descriptor) in feature.tests.iter().enumerate() {
            let _ = writeln!(
                out,
                "- [{}] {:02}-{}: {}",
                if descriptor.is_done() { "x" } else { " " },
                index + 1,
                descriptor.slug,
                descriptor.description
            );
        }
    }
    out
}
