/// Recommendation engine: which domains (and whether idle tabs) to close.
///
/// Scoring combines three signals:
/// - how many tabs of the domain are open right now
/// - how often the domain was closed before
/// - how recently it was closed, decayed exponentially over `decayDays`
///
/// Domains that were never closed still get a flat recency boost so the list
/// is useful on a fresh install.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::count_domains;
use crate::error::Result;
use crate::history::{self, HistoryEntry};
use crate::host::{TabHost, TabQuery};
use crate::settings::Settings;
use crate::tab_data::TabInfo;

const COLD_START_BOOST: f64 = 0.2;
const MAX_DOMAIN_SUGGESTIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SuggestionItem {
    #[serde(rename_all = "camelCase")]
    Inactive { inactive_count: usize },
    #[serde(rename_all = "camelCase")]
    Domain {
        domain: String,
        open_count: usize,
        freq: u64,
        last_closed_at: i64,
    },
}

/// A tab that nobody has looked at for a while and that is safe to close.
pub fn tab_looks_inactive(tab: &TabInfo, threshold_ms: f64, now: i64) -> bool {
    if tab.incognito || tab.pinned || tab.audible || tab.active {
        return false;
    }
    match tab.last_accessed {
        Some(last) if last > 0.0 => now as f64 - last >= threshold_ms,
        _ => tab.discarded,
    }
}

/// `exp(-elapsed / decay)`; timestamps from the future count as just closed.
pub fn recency_boost(entry: Option<&HistoryEntry>, now: i64, decay_ms: f64) -> f64 {
    match entry {
        Some(h) => {
            let elapsed = now.saturating_sub(h.last_closed_at).max(0);
            (-(elapsed as f64) / decay_ms).exp()
        }
        None => COLD_START_BOOST,
    }
}

pub fn score(open_count: usize, freq: u64, recency_boost: f64) -> f64 {
    open_count as f64 * (1.0 + freq as f64 * 0.5) * (0.5 + recency_boost)
}

/// Rank suggestions from a tab listing and the closed-tab history.
pub fn rank(tabs: &[TabInfo], history: &[HistoryEntry], settings: &Settings, now: i64) -> Vec<SuggestionItem> {
    if !settings.enable_suggestions {
        return Vec::new();
    }

    let open_by_domain = count_domains(tabs.iter().filter(|t| !t.incognito).map(|t| t.url.as_str()));

    let mut suggestions = Vec::new();

    if settings.enable_inactive_suggestion {
        let threshold_ms = settings.inactive_threshold_ms();
        let inactive_count = tabs
            .iter()
            .filter(|t| tab_looks_inactive(t, threshold_ms, now))
            .count();
        if inactive_count > 0 {
            suggestions.push(SuggestionItem::Inactive { inactive_count });
        }
    }

    let by_domain: HashMap<&str, &HistoryEntry> = history.iter().map(|h| (h.domain.as_str(), h)).collect();
    let decay_ms = settings.decay_ms();
    let min_open = settings.min_open_tabs();

    let mut scored: Vec<(f64, SuggestionItem)> = open_by_domain
        .into_iter()
        .filter(|(_, open_count)| *open_count >= min_open)
        .map(|(domain, open_count)| {
            let entry = by_domain.get(domain.as_str()).copied();
            let freq = entry.map_or(1, |h| h.count);
            let boost = recency_boost(entry, now, decay_ms);
            let item = SuggestionItem::Domain {
                last_closed_at: entry.map_or(0, |h| h.last_closed_at),
                domain,
                open_count,
                freq,
            };
            (score(open_count, freq, boost), item)
        })
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    suggestions.extend(scored.into_iter().take(MAX_DOMAIN_SUGGESTIONS).map(|(_, item)| item));
    suggestions
}

/// Suggestions for the current browser state.
pub async fn get_suggestions<H: TabHost + ?Sized>(host: &H, settings: &Settings) -> Result<Vec<SuggestionItem>> {
    if !settings.enable_suggestions {
        return Ok(Vec::new());
    }

    let history = history::read(host, settings).await?;
    let tabs = host.query_tabs(TabQuery::all()).await?;
    Ok(rank(&tabs, &history, settings, host.now_ms()))
}
