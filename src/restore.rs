/// Undo for close operations: recreate tabs from their snapshots.
use std::collections::HashSet;

use log::warn;
use serde_json::Value;

use crate::host::{CreateProperties, TabHost};
use crate::tab_data::TabSnapshot;

/// Parse, filter and order snapshots for restoring.
///
/// Records without a URL are dropped. The rest are ordered by window, then
/// index; unknown placement sorts last, and equal keys keep input order.
pub fn prepare(records: &[Value]) -> Vec<TabSnapshot> {
    let mut snapshots: Vec<TabSnapshot> = records.iter().filter_map(TabSnapshot::from_value).collect();
    snapshots.sort_by_key(|s| {
        (
            s.window_id.map_or(i64::MAX, i64::from),
            s.index.map_or(i64::MAX, i64::from),
        )
    });
    snapshots
}

/// Decide which snapshots may be created as the active tab: the first active
/// one per known window, plus one more among those with no known window.
pub fn plan_creates(snapshots: &[TabSnapshot]) -> Vec<CreateProperties> {
    let mut activated_windows = HashSet::new();
    let mut activated_fallback = false;

    snapshots
        .iter()
        .map(|tab| {
            let active = tab.active
                && match tab.window_id {
                    Some(window_id) => activated_windows.insert(window_id),
                    None => !std::mem::replace(&mut activated_fallback, true),
                };

            CreateProperties {
                url: tab.url.clone(),
                active,
                window_id: tab.window_id,
                index: tab.index.map(|i| i.max(0)),
                pinned: tab.pinned,
            }
        })
        .collect()
}

/// Recreate tabs one by one. A tab whose window is gone is retried once
/// without placement; a tab that still fails is skipped. Returns the number
/// of tabs created.
pub async fn restore_tabs<H: TabHost + ?Sized>(host: &H, records: &[Value]) -> usize {
    let snapshots = prepare(records);
    let mut restored = 0;

    for props in plan_creates(&snapshots) {
        match host.create_tab(&props).await {
            Ok(()) => restored += 1,
            Err(e) if props.window_id.is_some() => {
                let fallback = CreateProperties {
                    window_id: None,
                    index: None,
                    ..props
                };
                match host.create_tab(&fallback).await {
                    Ok(()) => restored += 1,
                    Err(fallback_err) => {
                        warn!("Failed to restore {} ({}); fallback also failed: {}", fallback.url, e, fallback_err)
                    }
                }
            }
            Err(e) => warn!("Failed to restore {}: {}", props.url, e),
        }
    }

    restored
}
