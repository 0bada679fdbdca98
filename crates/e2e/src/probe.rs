//! Selector-fallback probing
//!
//! The admin UI renders the same logical element differently across plugin
//! versions and plan tiers, so call sites describe an element by an ordered
//! list of candidate locators. [`resolve`] walks that list and reports the
//! first candidate that becomes visible. A miss is an answer, not an error.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::page::{Page, WaitState};

/// Default per-candidate wait
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Ordered, non-empty list of locators for one logical element.
///
/// Earlier entries are preferred; once one resolves the rest are never tried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Candidates(Vec<String>);

impl Candidates {
    pub fn new<I, S>(label: &str, candidates: I) -> E2eResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<String> = candidates.into_iter().map(Into::into).collect();
        if list.is_empty() {
            return Err(E2eError::EmptyCandidates(label.to_string()));
        }
        Ok(Self(list))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn first(&self) -> &str {
        &self.0[0]
    }
}

impl TryFrom<Vec<String>> for Candidates {
    type Error = E2eError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Candidates::new("<unnamed>", value)
    }
}

impl From<Candidates> for Vec<String> {
    fn from(value: Candidates) -> Self {
        value.0
    }
}

impl fmt::Display for Candidates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(" | "))
    }
}

/// Outcome of probing one logical element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementCheck {
    pub label: String,
    pub found: bool,
    /// The candidate that resolved, when one did
    pub matched: Option<String>,
    /// Candidates actually attempted
    pub attempts: usize,
}

/// Probe candidates in order and return the full check result.
///
/// Never fails: timeouts and any other page error count as a miss for that
/// candidate and the walk continues.
pub async fn check(page: &dyn Page, candidates: &Candidates, label: &str, timeout: Duration) -> ElementCheck {
    let mut attempts = 0;

    for candidate in candidates.iter() {
        attempts += 1;
        match page.wait_for_selector(candidate, WaitState::Visible, timeout).await {
            Ok(()) => {
                info!("  ✓ {}: found via {}", label, candidate);
                info!("{}: found ({}/{} candidates tried)", label, attempts, candidates.len());
                return ElementCheck {
                    label: label.to_string(),
                    found: true,
                    matched: Some(candidate.to_string()),
                    attempts,
                };
            }
            Err(e) if e.is_timeout() => {
                debug!("  ✗ {}: {} not visible within {:?}", label, candidate, timeout);
            }
            Err(e) => {
                debug!("  ✗ {}: {} failed: {}", label, candidate, e);
            }
        }
    }

    warn!("{}: not found after {} candidates (may not be available)", label, attempts);
    ElementCheck {
        label: label.to_string(),
        found: false,
        matched: None,
        attempts,
    }
}

/// First candidate that becomes visible within `timeout`, if any
pub async fn resolve(page: &dyn Page, candidates: &Candidates, label: &str, timeout: Duration) -> Option<String> {
    check(page, candidates, label, timeout).await.matched
}

/// Whether any candidate becomes visible within `timeout`
pub async fn probe(page: &dyn Page, candidates: &Candidates, label: &str, timeout: Duration) -> bool {
    check(page, candidates, label, timeout).await.found
}

/// Resolve and click the matched candidate.
///
/// `Ok(None)` when nothing resolved; the click's own error propagates.
pub async fn click_first(
    page: &dyn Page,
    candidates: &Candidates,
    label: &str,
    timeout: Duration,
) -> E2eResult<Option<String>> {
    match resolve(page, candidates, label, timeout).await {
        Some(selector) => {
            page.click(&selector, timeout).await?;
            Ok(Some(selector))
        }
        None => Ok(None),
    }
}
