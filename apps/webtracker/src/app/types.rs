use serde::Deserialize;
use serde::Serialize;
use wt_browser::MessageSender;
use wt_browser::NavigationEvent;
use wt_browser::TabAction;
use wt_ipc::ExtensionRequest;
use wt_security::Verdict;

/// One line of a recorded host event stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(super) enum ReplayRecord {
    TabUpdated(NavigationEvent),
    Message {
        request: ExtensionRequest,
        #[serde(default)]
        sender: MessageSender,
    },
    Installed,
    Startup,
    SessionEnd,
}

#[derive(Debug, Serialize)]
pub(super) struct ReplayLine {
    pub line: usize,
    pub outcome: String,
    pub actions: Vec<TabAction>,
}

#[derive(Debug, Serialize)]
pub(super) struct CheckOutput<'a> {
    pub url: &'a str,
    pub domain: &'a str,
    pub verdict: &'a Verdict,
}

#[derive(Debug, Serialize)]
pub(super) struct WarningOutput<'a> {
    pub domain: &'a str,
    pub url: &'a str,
}
