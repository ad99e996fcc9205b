/// Closed-tab history: how often, and how recently, each domain was closed.
use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{domain_from_url, normalize_domain};
use crate::error::Result;
use crate::host::TabHost;
use crate::settings::Settings;
use crate::storage::{self, HISTORY_KEY, count_field, millis_field};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub domain: String,
    pub count: u64,
    /// Epoch milliseconds.
    pub last_closed_at: i64,
}

impl HistoryEntry {
    /// Rebuild an entry from a stored record. Numbers written as floats are
    /// accepted; records without a domain are not.
    pub fn from_value(value: &Value) -> Option<HistoryEntry> {
        let record = value.as_object()?;
        let domain = record.get("domain").and_then(Value::as_str)?.trim();
        if domain.is_empty() {
            return None;
        }

        Some(HistoryEntry {
            domain: domain.to_string(),
            count: record.get("count").and_then(count_field).unwrap_or(0),
            last_closed_at: record.get("lastClosedAt").and_then(millis_field).unwrap_or(0),
        })
    }
}

/// Resolve a history input to a domain key.
///
/// Inputs containing a `.` are taken as domains; anything with a scheme is
/// parsed as a URL. Other strings are parsed as URLs and, failing that, kept
/// as a bare lowercase host name such as `localhost`.
pub fn resolve_domain(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let domain = if trimmed.contains("://") {
        domain_from_url(trimmed)?
    } else if trimmed.contains('.') {
        normalize_domain(trimmed)
    } else {
        domain_from_url(trimmed).unwrap_or_else(|| trimmed.to_lowercase())
    };

    (!domain.is_empty()).then_some(domain)
}

/// Fold closed domains into `entries`, most recent first, capped at `cap`.
pub fn apply_closes<'a, I>(entries: Vec<HistoryEntry>, inputs: I, now: i64, cap: usize) -> Vec<HistoryEntry>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut order: Vec<String> = entries.iter().map(|e| e.domain.clone()).collect();
    let mut by_domain: HashMap<String, HistoryEntry> =
        entries.into_iter().map(|e| (e.domain.clone(), e)).collect();

    for domain in inputs.into_iter().filter_map(resolve_domain) {
        let entry = by_domain.entry(domain.clone()).or_insert_with(|| {
            order.push(domain.clone());
            HistoryEntry {
                domain,
                count: 0,
                last_closed_at: 0,
            }
        });
        entry.count += 1;
        entry.last_closed_at = now;
    }

    let mut updated: Vec<HistoryEntry> = order
        .into_iter()
        .filter_map(|domain| by_domain.remove(&domain))
        .collect();
    updated.sort_by(|a, b| b.last_closed_at.cmp(&a.last_closed_at));
    updated.truncate(cap);
    updated
}

/// Stored history, or empty when tracking is off or nothing was recorded.
pub async fn read<H: TabHost + ?Sized>(host: &H, settings: &Settings) -> Result<Vec<HistoryEntry>> {
    if !settings.track_history {
        return Ok(Vec::new());
    }

    let entries: Vec<HistoryEntry> = match storage::load_raw(host, HISTORY_KEY).await? {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let entry = HistoryEntry::from_value(item);
                if entry.is_none() {
                    warn!("Dropping unreadable history entry: {}", item);
                }
                entry
            })
            .collect(),
        Some(other) => {
            warn!("Ignoring malformed history record: {}", other);
            Vec::new()
        }
        None => Vec::new(),
    };
    Ok(entries)
}

pub async fn try_record<H: TabHost + ?Sized>(host: &H, settings: &Settings, inputs: &[String]) -> Result<()> {
    if !settings.track_history || inputs.is_empty() {
        return Ok(());
    }

    let entries = read(host, settings).await?;
    let updated = apply_closes(
        entries,
        inputs.iter().map(String::as_str),
        host.now_ms(),
        settings.history_cap(),
    );
    storage::save(host, HISTORY_KEY, &updated).await
}

/// Record closed domains or URLs. History is best-effort: failures are logged
/// and never reach the caller.
pub async fn record<H: TabHost + ?Sized>(host: &H, settings: &Settings, inputs: &[String]) {
    if let Err(e) = try_record(host, settings, inputs).await {
        warn!("Failed to record closed-tab history: {}", e);
    }
}
