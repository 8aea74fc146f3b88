//! Tab context.
//!
//! Tab queries belong to the host environment; the engine only needs to
//! know which domain the active tab is on. [`ActiveTabTracker`] is an
//! explicitly constructed context object: callers create it, refresh it
//! on tab-activation notifications, and drop it with the component that
//! owns it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(Uuid);

impl TabId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

/// A host tab, reduced to what cookie inspection needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    pub title: Option<String>,
}

/// A handle to the host's tab query surface.
pub type TabsApiHandle = Arc<dyn TabsApi + Send + Sync>;

#[async_trait::async_trait]
pub trait TabsApi: Send + Sync {
    /// The currently active tab, if any.
    async fn active_tab(&self) -> Option<TabInfo>;
}

/// Tracks the active tab and its domain.
pub struct ActiveTabTracker {
    api: TabsApiHandle,
    current: Option<TabInfo>,
}

impl ActiveTabTracker {
    pub fn new(api: TabsApiHandle) -> Self {
        Self { api, current: None }
    }

    /// Re-queries the host; call on tab-activation notifications.
    pub async fn refresh(&mut self) -> Option<&TabInfo> {
        self.current = self.api.active_tab().await;
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&TabInfo> {
        self.current.as_ref()
    }

    /// Lowercased domain of the active tab's URL.
    pub fn current_domain(&self) -> Option<String> {
        self.current.as_ref().and_then(|tab| url_domain(&tab.url))
    }
}

/// Extracts the lowercased host from a URL, with or without a scheme.
pub fn url_domain(url: &str) -> Option<String> {
    let direct = Url::parse(url).ok().filter(Url::has_host);
    let parsed = match direct {
        Some(parsed) => parsed,
        None => Url::parse(&format!("http://{url}")).ok()?,
    };
    parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_ascii_lowercase)
}
