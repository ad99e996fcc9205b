/// Data structures for Tab Eater
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A live browser tab as reported by `tabs.query`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TabInfo {
    pub id: i32,
    pub window_id: Option<i32>,
    pub index: Option<i32>,
    pub url: String,
    /// URL the tab is navigating to before it commits.
    pub pending_url: String,
    pub title: String,
    pub pinned: bool,
    pub active: bool,
    pub audible: bool,
    pub discarded: bool,
    pub incognito: bool,
    /// Epoch milliseconds of the last time the tab was focused.
    pub last_accessed: Option<f64>,
}

impl TabInfo {
    pub fn new(id: i32, window_id: i32, index: i32, url: &str) -> TabInfo {
        TabInfo {
            id,
            window_id: Some(window_id),
            index: Some(index),
            url: url.to_string(),
            ..Default::default()
        }
    }

    /// The committed URL, or the pending one while the tab is still loading.
    pub fn resolved_url(&self) -> Option<&str> {
        [self.url.as_str(), self.pending_url.as_str()]
            .into_iter()
            .find(|url| !url.is_empty())
    }
}

/// Minimal record of a closed tab, enough to recreate it in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub window_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub index: Option<i32>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub pinned: bool,
}

impl TabSnapshot {
    /// Snapshot a live tab. Tabs without any URL cannot be restored and yield `None`.
    pub fn from_tab(tab: &TabInfo) -> Option<TabSnapshot> {
        let url = tab.resolved_url()?;

        Some(TabSnapshot {
            url: url.to_string(),
            window_id: tab.window_id,
            index: tab.index,
            active: tab.active,
            pinned: tab.pinned,
        })
    }

    /// Rebuild a snapshot from an untrusted record, e.g. one kept by the popup
    /// across sessions. Placement fields that are not integers are dropped.
    pub fn from_value(value: &Value) -> Option<TabSnapshot> {
        let record = value.as_object()?;
        let url = record.get("url").and_then(Value::as_str)?;

        let snapshot = TabSnapshot {
            url: url.to_string(),
            window_id: record.get("windowId").and_then(integer_field),
            index: record.get("index").and_then(integer_field),
            active: record.get("active").and_then(Value::as_bool).unwrap_or(false),
            pinned: record.get("pinned").and_then(Value::as_bool).unwrap_or(false),
        };

        snapshot.is_restorable().then_some(snapshot)
    }

    pub fn is_restorable(&self) -> bool {
        !self.url.is_empty()
    }
}

fn integer_field(value: &Value) -> Option<i32> {
    value.as_i64().and_then(|n| i32::try_from(n).ok())
}
