use std::time::Duration;

use condition_waiter::Locator;
use fanout_core_types::{JobId, ProfileId};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
pub struct DriveCtx {
    pub job: JobId,
    pub profile: ProfileId,
    pub cancel: CancellationToken,
}

impl DriveCtx {
    pub fn new(job: JobId, profile: ProfileId, cancel: CancellationToken) -> Self {
        Self {
            job,
            profile,
            cancel,
        }
    }
}

/// Selector glue: where the script finds its controls on the target page.
#[derive(Clone, Debug)]
pub struct PageScript {
    pub input: Locator,
    pub submit: Locator,
    pub chooser: Locator,
    pub option_role: String,
    pub result: Locator,
    /// Content-source attribute of the result container.
    pub result_attr: String,
    /// Sentinel the page parks in the content-source attribute before a real
    /// value lands.
    pub placeholder: String,
}

impl Default for PageScript {
    fn default() -> Self {
        Self {
            input: Locator::id("chatinput"),
            submit: Locator::id("chatinput-send-message-button"),
            chooser: Locator::id("profile-chooser"),
            option_role: "menuitemradio".to_string(),
            result: Locator::id("live-preview-panel"),
            result_attr: "src".to_string(),
            placeholder: "about:blank".to_string(),
        }
    }
}

impl PageScript {
    /// Validity predicate for the result attribute: non-empty after trim and
    /// not the placeholder sentinel.
    pub fn result_value_is_valid(&self, value: &str) -> bool {
        let trimmed = value.trim();
        !trimmed.is_empty() && trimmed != self.placeholder
    }
}

/// Fixed pacing of the script. Bounded, not configurable at call sites; lets
/// the page's own post-render wiring attach before the driver interacts.
#[derive(Clone, Debug)]
pub struct DriveTempo {
    /// After the submit control appears, before touching the chooser.
    pub pre_select_settle: Duration,
    /// After opening the chooser, before matching options.
    pub chooser_settle: Duration,
    /// After selection, before submitting.
    pub pre_submit_settle: Duration,
    /// Debounce window for the result attribute.
    pub stabilization: Duration,
    /// Bound on each condition wait.
    pub wait_timeout: Duration,
}

impl Default for DriveTempo {
    fn default() -> Self {
        Self {
            pre_select_settle: Duration::from_secs(2),
            chooser_settle: Duration::from_millis(500),
            pre_submit_settle: Duration::from_secs(1),
            stabilization: Duration::from_secs(2),
            wait_timeout: Duration::from_secs(10),
        }
    }
}
