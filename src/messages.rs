/// Request/response contract between the popup, menus and the background core.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::operations::CloseOutcome;
use crate::settings::Settings;
use crate::stats::StatsRecord;
use crate::suggestions::SuggestionItem;

/// A message sent to the background. Types are accepted with or without the
/// `pc:` prefix older popups used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    #[serde(alias = "pc:closeByKeyword")]
    CloseByKeyword {
        #[serde(default)]
        query: String,
    },
    #[serde(alias = "pc:closeInactive")]
    CloseInactive,
    #[serde(alias = "pc:closeDuplicates")]
    CloseDuplicates,
    #[serde(alias = "pc:restoreTabs")]
    RestoreTabs {
        #[serde(default)]
        tabs: Value,
    },
    #[serde(alias = "pc:sortTabsByOpenCount")]
    SortTabsByOpenCount,
    #[serde(alias = "pc:getSuggestions")]
    GetSuggestions,
    #[serde(alias = "pc:getSettings")]
    GetSettings,
    #[serde(alias = "pc:updateSettings")]
    UpdateSettings {
        #[serde(default)]
        payload: Value,
    },
    #[serde(alias = "pc:getStats")]
    GetStats,
    #[serde(alias = "pc:resetStats")]
    ResetStats,
}

impl Request {
    /// Parse a raw message; `None` for messages meant for someone else.
    pub fn from_value(value: Value) -> Option<Request> {
        serde_json::from_value(value).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOutcome {
    pub restored_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortOutcome {
    pub sorted_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Closed(CloseOutcome),
    Restored(RestoreOutcome),
    Sorted(SortOutcome),
    Suggestions { suggestions: Vec<SuggestionItem> },
    Settings { settings: Settings },
    Stats { stats: StatsRecord },
}

/// Every response carries `ok`; payload fields are flattened next to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub ok: bool,
    #[serde(flatten)]
    pub payload: Option<Payload>,
}

impl Response {
    pub fn ok(payload: Payload) -> Response {
        Response {
            ok: true,
            payload: Some(payload),
        }
    }

    pub fn done() -> Response {
        Response { ok: true, payload: None }
    }

    pub fn failed() -> Response {
        Response {
            ok: false,
            payload: None,
        }
    }
}
