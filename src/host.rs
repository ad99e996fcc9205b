/// The browser capabilities the core depends on.
///
/// Chrome and Firefox expose the same operations under different globals and
/// with callback or promise flavours; all of that lives behind this trait so
/// the scoring, history and restore logic never touches the browser directly.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HostError;
use crate::tab_data::TabInfo;

/// Filter for a tab query. The default matches every tab in every window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabQuery {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub current_window: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl TabQuery {
    pub fn all() -> Self {
        TabQuery::default()
    }

    pub fn current_window() -> Self {
        TabQuery {
            current_window: true,
            active: None,
        }
    }

    pub fn active_in_current_window() -> Self {
        TabQuery {
            current_window: true,
            active: Some(true),
        }
    }
}

/// Properties for creating a tab, mirroring `tabs.create`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProperties {
    pub url: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i32>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub pinned: bool,
}

/// A context menu entry to register.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuItem {
    pub id: String,
    pub title: String,
    pub contexts: Vec<String>,
}

/// Toolbar icon variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IconKind {
    Active,
}

impl IconKind {
    /// Icon paths keyed by pixel size, as `action.setIcon` expects.
    pub fn paths(self) -> [(u32, &'static str); 3] {
        match self {
            IconKind::Active => [
                (16, "icons/icon16.png"),
                (48, "icons/icon48.png"),
                (128, "icons/icon128.png"),
            ],
        }
    }
}

#[async_trait(?Send)]
pub trait TabHost {
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<TabInfo>, HostError>;

    async fn remove_tabs(&self, tab_ids: &[i32]) -> Result<(), HostError>;

    async fn create_tab(&self, props: &CreateProperties) -> Result<(), HostError>;

    async fn move_tab(&self, tab_id: i32, index: usize) -> Result<(), HostError>;

    /// Read one key from local storage; `None` when the key was never written.
    async fn storage_get(&self, key: &str) -> Result<Option<Value>, HostError>;

    async fn storage_set(&self, key: &str, value: Value) -> Result<(), HostError>;

    async fn clear_context_menus(&self) -> Result<(), HostError>;

    async fn create_context_menu(&self, item: &MenuItem) -> Result<(), HostError>;

    async fn set_action_icon(&self, icon: IconKind) -> Result<(), HostError>;

    /// Wall clock in epoch milliseconds.
    fn now_ms(&self) -> i64;
}
