//! Idempotent checkbox / switch control

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::E2eResult;
use crate::page::Page;

/// How the current state of a control is read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleState {
    /// Native checkbox: the `checked` property
    #[default]
    Checked,
    /// Styled switch: on while its `class` attribute carries this class
    Class(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleOutcome {
    AlreadySet,
    Clicked,
}

/// Read the current on/off state of a control
pub async fn read_state(page: &dyn Page, selector: &str, state: &ToggleState, timeout: Duration) -> E2eResult<bool> {
    match state {
        ToggleState::Checked => page.is_checked(selector, timeout).await,
        ToggleState::Class(class) => {
            let classes = page.get_attribute(selector, "class", timeout).await?;
            Ok(classes
                .as_deref()
                .map(|c| c.split_whitespace().any(|c| c == class))
                .unwrap_or(false))
        }
    }
}

/// Bring a control to `desired`, clicking at most once.
///
/// Errors from the underlying click (zero or several matches) propagate.
pub async fn ensure_toggle(
    page: &dyn Page,
    selector: &str,
    desired: bool,
    state: &ToggleState,
    timeout: Duration,
) -> E2eResult<ToggleOutcome> {
    let current = read_state(page, selector, state, timeout).await?;
    if current == desired {
        debug!("{} already {}", selector, if desired { "on" } else { "off" });
        return Ok(ToggleOutcome::AlreadySet);
    }

    page.click(selector, timeout).await?;
    info!("Toggled {} {}", selector, if desired { "on" } else { "off" });
    Ok(ToggleOutcome::Clicked)
}
