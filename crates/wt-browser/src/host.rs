//! Host platform contract: tab events in, tab commands out.

use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use wt_core::TrackerResult;

/// Host-assigned tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab#{}", self.0)
    }
}

/// Lifecycle stage reported with a tab update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    Complete,
}

/// One tab-update tick from the host. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationEvent {
    pub tab_id: TabId,
    pub status: TabStatus,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub active: bool,
}

impl NavigationEvent {
    pub fn loading(tab_id: TabId, url: impl Into<String>) -> Self {
        Self {
            tab_id,
            status: TabStatus::Loading,
            url: Some(url.into()),
            active: true,
        }
    }

    pub fn complete(tab_id: TabId, url: impl Into<String>) -> Self {
        Self {
            tab_id,
            status: TabStatus::Complete,
            url: Some(url.into()),
            active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Context a message arrived from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageSender {
    #[serde(default)]
    pub tab_id: Option<TabId>,
    #[serde(default)]
    pub url: Option<String>,
}

impl MessageSender {
    pub fn tab(tab_id: TabId, url: impl Into<String>) -> Self {
        Self {
            tab_id: Some(tab_id),
            url: Some(url.into()),
        }
    }
}

/// Tab-control operations the host exposes.
pub trait TabHost {
    /// Navigates an existing tab.
    fn update_tab(&mut self, tab: TabId, url: &str) -> TrackerResult<()>;

    /// Opens a new tab and returns its id.
    fn create_tab(&mut self, url: &str) -> TrackerResult<TabId>;
}

/// A command issued to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TabAction {
    Update { tab: TabId, url: String },
    Create { tab: TabId, url: String },
}

/// Host that accepts every command and keeps a log of them.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    actions: Vec<TabAction>,
    next_tab: u32,
}

impl RecordingHost {
    /// Newly created tabs are numbered from `first_tab` upward.
    pub fn starting_at(first_tab: u32) -> Self {
        Self {
            actions: Vec::new(),
            next_tab: first_tab,
        }
    }

    pub fn actions(&self) -> &[TabAction] {
        &self.actions
    }

    pub fn take_actions(&mut self) -> Vec<TabAction> {
        std::mem::take(&mut self.actions)
    }

    pub fn created_tabs(&self) -> usize {
        self.actions
            .iter()
            .filter(|action| matches!(action, TabAction::Create { .. }))
            .count()
    }
}

impl TabHost for RecordingHost {
    fn update_tab(&mut self, tab: TabId, url: &str) -> TrackerResult<()> {
        self.actions.push(TabAction::Update {
            tab,
            url: url.to_owned(),
        });
        Ok(())
    }

    fn create_tab(&mut self, url: &str) -> TrackerResult<TabId> {
        let tab = TabId(self.next_tab);
        self.next_tab = self.next_tab.saturating_add(1);
        self.actions.push(TabAction::Create {
            tab,
            url: url.to_owned(),
        });
        Ok(tab)
    }
}
