//! Result reporters: list (log lines), JSON and a static HTML page

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::config::Reporter;
use crate::error::E2eResult;
use crate::runner::{TestStatus, TestSuiteResult};

pub const JSON_REPORT: &str = "test-results.json";
pub const HTML_REPORT: &str = "html-report/index.html";

/// Emit every configured reporter; returns the files written
pub fn write_reports(results: &TestSuiteResult, reporters: &[Reporter], output_dir: &Path) -> E2eResult<Vec<PathBuf>> {
    let mut written = Vec::new();
    for reporter in reporters {
        match reporter {
            Reporter::List => log_list(results),
            Reporter::Json => written.push(write_json(results, output_dir)?),
            Reporter::Html => written.push(write_html(results, output_dir)?),
        }
    }
    Ok(written)
}

/// One log line per test, then the totals
pub fn log_list(results: &TestSuiteResult) {
    for result in &results.results {
        let line = format!(
            "{} › {} [{}/{} found, {} attempt(s), {} ms]",
            result.suite, result.name, result.found, result.min_found, result.attempts, result.duration_ms
        );
        match result.status {
            TestStatus::Passed => info!("  ✓ {}", line),
            TestStatus::Flaky => warn!("  ~ {}", line),
            TestStatus::Skipped => warn!("  - {}", line),
            TestStatus::Failed => error!(
                "  ✗ {} - {}",
                line,
                result.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    info!("");
    info!(
        "Test Results: {} passed, {} flaky, {} failed, {} skipped ({} ms)",
        results.passed, results.flaky, results.failed, results.skipped, results.duration_ms
    );
}

/// Write test results to JSON file
pub fn write_json(results: &TestSuiteResult, output_dir: &Path) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join(JSON_REPORT);
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

pub fn write_html(results: &TestSuiteResult, output_dir: &Path) -> E2eResult<PathBuf> {
    let path = output_dir.join(HTML_REPORT);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, render_html(results))?;

    info!("HTML report written to: {}", path.display());
    Ok(path)
}

pub fn render_html(results: &TestSuiteResult) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>PushEngage regression report</title>
<style>
body {{ font-family: system-ui, sans-serif; margin: 2rem; }}
table {{ border-collapse: collapse; width: 100%; }}
th, td {{ border: 1px solid #ddd; padding: .4rem .6rem; text-align: left; vertical-align: top; }}
.passed {{ color: #1a7f37; }} .flaky {{ color: #9a6700; }} .failed {{ color: #cf222e; }} .skipped {{ color: #6e7781; }}
</style>
</head>
<body>
<h1>{app} regression report</h1>
<p>{base_url} &middot; started {started} &middot; {duration} ms</p>
<p><span class="passed">{passed} passed</span> &middot; <span class="flaky">{flaky} flaky</span> &middot; <span class="failed">{failed} failed</span> &middot; <span class="skipped">{skipped} skipped</span></p>
<table>
<tr><th>Suite</th><th>Test</th><th>Status</th><th>Found</th><th>Attempts</th><th>Duration</th><th>Details</th></tr>
"#,
        app = escape(results.app.as_str()),
        base_url = escape(&results.base_url),
        started = results.started_at.to_rfc3339(),
        duration = results.duration_ms,
        passed = results.passed,
        flaky = results.flaky,
        failed = results.failed,
        skipped = results.skipped,
    );

    for result in &results.results {
        let mut details = String::new();
        for element in &result.elements {
            let _ = write!(
                details,
                "{} {}<br>",
                if element.found { "✓" } else { "✗" },
                escape(&element.label)
            );
        }
        if let Some(err) = &result.error {
            let _ = write!(details, "<pre>{}</pre>", escape(err));
        }
        if let Some(shot) = &result.screenshot {
            let _ = write!(details, "<code>{}</code>", escape(&shot.display().to_string()));
        }

        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td class=\"{status}\">{status}</td><td>{}/{}</td><td>{}</td><td>{} ms</td><td>{}</td></tr>",
            escape(&result.suite),
            escape(&result.name),
            result.found,
            result.min_found,
            result.attempts,
            result.duration_ms,
            details,
            status = result.status.as_str(),
        );
    }

    html.push_str("</table>\n</body>\n</html>\n");
    html
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
