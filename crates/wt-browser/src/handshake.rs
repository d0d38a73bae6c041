//! Interstitial view model and the proceed handshake.

use tracing::info;
use tracing::warn;
use wt_core::TrackerResult;
use wt_ipc::ExtensionRequest;
use wt_storage::AllowList;
use wt_url::WarningLink;

/// What the interstitial shows, read from its own location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningView {
    pub original_url: String,
    pub domain: String,
}

impl WarningView {
    pub fn from_location(location: &str) -> TrackerResult<Self> {
        let link = WarningLink::from_page_url(location)?;
        Ok(Self {
            original_url: link.url,
            domain: link.domain,
        })
    }

    /// Message sent when the user clicks through the warning.
    pub fn proceed_request(&self) -> ExtensionRequest {
        ExtensionRequest::Proceed {
            domain: self.domain.clone(),
            original_url: self.original_url.clone(),
        }
    }
}

/// Result of handling a `proceed` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProceedOutcome {
    pub allow_recorded: bool,
    pub navigate_to: String,
}

/// Records the allow decision, then hands back the URL to resume.
///
/// Without a usable store the allow write is skipped and the tab is still
/// navigated; the next visit to the domain will warn again.
pub fn accept_proceed(
    allow_list: &mut AllowList,
    domain: &str,
    original_url: &str,
) -> ProceedOutcome {
    let allow_recorded = match allow_list.allow(domain) {
        Ok(()) => true,
        Err(error) => {
            warn!(domain, %error, "proceeding without recording allow decision");
            false
        }
    };

    info!(domain, allow_recorded, "user proceeded past warning");
    ProceedOutcome {
        allow_recorded,
        navigate_to: original_url.to_owned(),
    }
}
