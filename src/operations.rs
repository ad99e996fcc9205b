/// Tab operations: closing by keyword, inactivity or duplication, and sorting.
use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::domain::{dedupe_key, domain_from_url, normalize_domain};
use crate::error::Result;
use crate::history;
use crate::host::{TabHost, TabQuery};
use crate::settings::Settings;
use crate::stats;
use crate::suggestions::tab_looks_inactive;
use crate::tab_data::{TabInfo, TabSnapshot};

/// What a close operation removed, with snapshots for undo.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseOutcome {
    pub closed_count: usize,
    pub closed_domains: Vec<String>,
    pub closed_tabs: Vec<TabSnapshot>,
}

impl CloseOutcome {
    fn from_tabs(tabs: &[&TabInfo]) -> CloseOutcome {
        let mut closed_domains: Vec<String> = Vec::new();
        for domain in tabs.iter().filter_map(|t| domain_from_url(&t.url)) {
            if !closed_domains.contains(&domain) {
                closed_domains.push(domain);
            }
        }

        CloseOutcome {
            closed_count: tabs.len(),
            closed_domains,
            closed_tabs: tabs.iter().filter_map(|t| TabSnapshot::from_tab(t)).collect(),
        }
    }
}

/// How a close-by-keyword query selects tabs.
#[derive(Debug, Clone)]
pub enum KeywordMatcher {
    /// Query containing a `.`: exact canonical domain.
    Domain(String),
    /// Anything else: case-insensitive literal match on title or URL.
    Text(Regex),
}

impl KeywordMatcher {
    pub fn parse(query: &str) -> Option<KeywordMatcher> {
        let keyword = query.trim();
        if keyword.is_empty() {
            return None;
        }

        if keyword.contains('.') {
            return Some(KeywordMatcher::Domain(normalize_domain(keyword)));
        }

        match RegexBuilder::new(&regex::escape(keyword))
            .case_insensitive(true)
            .build()
        {
            Ok(rx) => Some(KeywordMatcher::Text(rx)),
            Err(e) => {
                warn!("Unusable keyword {:?}: {}", keyword, e);
                None
            }
        }
    }

    pub fn matches(&self, tab: &TabInfo) -> bool {
        match self {
            KeywordMatcher::Domain(wanted) => domain_from_url(&tab.url).as_deref() == Some(wanted.as_str()),
            KeywordMatcher::Text(rx) => {
                (!tab.title.is_empty() && rx.is_match(&tab.title)) || (!tab.url.is_empty() && rx.is_match(&tab.url))
            }
        }
    }
}

pub fn select_by_keyword<'a>(tabs: &'a [TabInfo], matcher: &KeywordMatcher) -> Vec<&'a TabInfo> {
    tabs.iter().filter(|t| !t.incognito && matcher.matches(t)).collect()
}

pub fn select_inactive<'a>(tabs: &'a [TabInfo], settings: &Settings, now: i64) -> Vec<&'a TabInfo> {
    let threshold_ms = settings.inactive_threshold_ms();
    tabs.iter().filter(|t| tab_looks_inactive(t, threshold_ms, now)).collect()
}

/// Every tab whose URL (ignoring the fragment) was already seen earlier in
/// `tabs`. Private and pinned tabs are never selected.
pub fn select_duplicates(tabs: &[TabInfo]) -> Vec<&TabInfo> {
    let mut seen_urls = HashSet::new();
    let mut duplicates = Vec::new();

    for tab in tabs.iter().filter(|t| !t.incognito && !t.pinned) {
        let Some(key) = tab.resolved_url().and_then(dedupe_key) else {
            continue;
        };
        if seen_urls.contains(&key) {
            duplicates.push(tab);
        } else {
            seen_urls.insert(key);
        }
    }

    duplicates
}

/// Remove the selected tabs and record the close in history and stats.
async fn close_tabs<H: TabHost + ?Sized>(host: &H, settings: &Settings, selected: &[&TabInfo]) -> Result<CloseOutcome> {
    let outcome = CloseOutcome::from_tabs(selected);
    if selected.is_empty() {
        return Ok(outcome);
    }

    let tab_ids: Vec<i32> = selected.iter().map(|t| t.id).collect();
    host.remove_tabs(&tab_ids).await?;
    debug!("Closed {} tabs across {:?}", outcome.closed_count, outcome.closed_domains);

    history::record(host, settings, &outcome.closed_domains).await;
    stats::record_close(host, settings, outcome.closed_count as u64, &outcome.closed_domains).await;

    Ok(outcome)
}

pub async fn close_by_keyword<H: TabHost + ?Sized>(host: &H, settings: &Settings, query: &str) -> Result<CloseOutcome> {
    let Some(matcher) = KeywordMatcher::parse(query) else {
        return Ok(CloseOutcome::default());
    };

    let tabs = host.query_tabs(TabQuery::all()).await?;
    close_tabs(host, settings, &select_by_keyword(&tabs, &matcher)).await
}

pub async fn close_inactive<H: TabHost + ?Sized>(host: &H, settings: &Settings) -> Result<CloseOutcome> {
    let tabs = host.query_tabs(TabQuery::all()).await?;
    close_tabs(host, settings, &select_inactive(&tabs, settings, host.now_ms())).await
}

pub async fn close_duplicates<H: TabHost + ?Sized>(host: &H, settings: &Settings) -> Result<CloseOutcome> {
    let tabs = host.query_tabs(TabQuery::all()).await?;
    close_tabs(host, settings, &select_duplicates(&tabs)).await
}

/// Planned reordering of one window.
#[derive(Debug, Clone, PartialEq)]
pub struct SortPlan {
    pub pinned_count: usize,
    /// Movable tab ids in their target order.
    pub order: Vec<i32>,
}

/// Order unpinned tabs by how many tabs their domain has open in the window.
///
/// Ties go to tabs with a resolvable domain, then alphabetical domain, then
/// the original position. Pinned tabs count towards domain totals but stay put.
pub fn plan_sort(tabs: &[TabInfo]) -> SortPlan {
    let mut ordered: Vec<&TabInfo> = tabs.iter().collect();
    ordered.sort_by_key(|t| t.index.unwrap_or(0));

    let mut domain_counts: HashMap<String, usize> = HashMap::new();
    let mut movable: Vec<(i32, String, i64)> = Vec::new();
    let mut pinned_count = 0;

    for tab in ordered {
        let domain = domain_from_url(&tab.url).unwrap_or_default();
        *domain_counts.entry(domain.clone()).or_insert(0) += 1;
        if tab.pinned {
            pinned_count += 1;
            continue;
        }
        let original_index = tab.index.map_or(i64::MAX, i64::from);
        movable.push((tab.id, domain, original_index));
    }

    movable.sort_by(|a, b| {
        let count_a = domain_counts.get(&a.1).copied().unwrap_or(0);
        let count_b = domain_counts.get(&b.1).copied().unwrap_or(0);
        count_b
            .cmp(&count_a)
            .then_with(|| a.1.is_empty().cmp(&b.1.is_empty()))
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    SortPlan {
        pinned_count,
        order: movable.into_iter().map(|(id, _, _)| id).collect(),
    }
}

/// Sort the current window by domain popularity. Returns how many tabs moved.
pub async fn sort_tabs_by_open_count<H: TabHost + ?Sized>(host: &H) -> Result<usize> {
    let tabs = host.query_tabs(TabQuery::current_window()).await?;
    if tabs.len() <= 1 {
        return Ok(0);
    }

    let plan = plan_sort(&tabs);
    if plan.order.len() <= 1 {
        return Ok(0);
    }

    let mut moved = 0;
    for (position, tab_id) in plan.order.iter().enumerate() {
        let target = plan.pinned_count + position;
        match host.move_tab(*tab_id, target).await {
            Ok(()) => moved += 1,
            Err(e) => warn!("Failed to move tab {} to {}: {}", tab_id, target, e),
        }
    }

    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{HISTORY_KEY, STATS_KEY};
    use crate::test_support::{FakeHost, NOW};
    use futures::executor::block_on;

    fn create_test_tab(id: i32, url: &str, title: &str) -> TabInfo {
        TabInfo {
            title: title.to_string(),
            ..TabInfo::new(id, 1, id, url)
        }
    }

    fn ids(tabs: &[&TabInfo]) -> Vec<i32> {
        tabs.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_keyword_with_dot_matches_exact_domain() {
        let tabs = vec![
            create_test_tab(1, "https://www.a.com/x", ""),
            create_test_tab(2, "https://sub.a.com", ""),
            create_test_tab(3, "https://b.com/?ref=a.com", ""),
        ];
        let matcher = KeywordMatcher::parse("WWW.A.com").unwrap();

        assert_eq!(ids(&select_by_keyword(&tabs, &matcher)), vec![1]);
    }

    #[test]
    fn test_keyword_text_match_is_literal_and_case_insensitive() {
        let tabs = vec![
            create_test_tab(1, "https://a.com", "Rust (programming language)"),
            create_test_tab(2, "https://b.com/RUST", ""),
            create_test_tab(3, "https://c.com", "Rustacean"),
            create_test_tab(4, "https://d.com", "Go"),
        ];

        let rust = KeywordMatcher::parse("rust").unwrap();
        assert_eq!(ids(&select_by_keyword(&tabs, &rust)), vec![1, 2, 3]);

        let parens = KeywordMatcher::parse("(programming").unwrap();
        assert_eq!(ids(&select_by_keyword(&tabs, &parens)), vec![1]);
    }

    #[test]
    fn test_keyword_never_matches_private_tabs() {
        let tabs = vec![TabInfo {
            incognito: true,
            ..create_test_tab(1, "https://a.com", "")
        }];
        let matcher = KeywordMatcher::parse("a.com").unwrap();

        assert!(select_by_keyword(&tabs, &matcher).is_empty());
    }

    #[test]
    fn test_empty_keyword() {
        assert!(KeywordMatcher::parse("   ").is_none());

        let host = FakeHost::with_tabs(vec![create_test_tab(1, "https://a.com", "")]);
        let outcome = block_on(close_by_keyword(&host, &Settings::default(), "")).unwrap();

        assert_eq!(outcome, CloseOutcome::default());
        assert!(host.removed().is_empty());
    }

    #[test]
    fn test_close_by_domain_end_to_end() {
        let host = FakeHost::with_tabs(vec![
            create_test_tab(1, "https://a.com", ""),
            create_test_tab(2, "https://a.com", ""),
            TabInfo {
                pinned: true,
                ..create_test_tab(3, "https://b.com", "")
            },
        ]);

        let outcome = block_on(close_by_keyword(&host, &Settings::default(), "a.com")).unwrap();

        assert_eq!(outcome.closed_count, 2);
        assert_eq!(outcome.closed_domains, vec!["a.com".to_string()]);
        assert_eq!(outcome.closed_tabs.len(), 2);
        assert_eq!(host.removed(), vec![1, 2]);
        assert_eq!(host.tabs().len(), 1);
        assert_eq!(host.tabs()[0].id, 3);
    }

    #[test]
    fn test_close_records_history_and_stats() {
        let host = FakeHost::with_tabs(vec![
            create_test_tab(1, "https://a.com/1", "Rust"),
            create_test_tab(2, "https://b.com/2", "rust book"),
        ]);

        block_on(close_by_keyword(&host, &Settings::default(), "rust")).unwrap();

        let history = host.stored(HISTORY_KEY).unwrap();
        assert_eq!(history.as_array().unwrap().len(), 2);
        let stats = host.stored(STATS_KEY).unwrap();
        assert_eq!(stats["totalTabsEaten"], 2);
        assert_eq!(stats["byDomain"][0]["count"], 2);
        assert_eq!(stats["byDomain"][1]["count"], 2);
    }

    #[test]
    fn test_close_succeeds_when_recording_fails() {
        let host = FakeHost::with_tabs(vec![create_test_tab(1, "https://a.com", "")]);
        host.fail_storage_writes();

        let outcome = block_on(close_by_keyword(&host, &Settings::default(), "a.com")).unwrap();

        assert_eq!(outcome.closed_count, 1);
    }

    #[test]
    fn test_select_inactive() {
        let settings = Settings::default();
        let tabs = vec![
            TabInfo {
                last_accessed: Some((NOW - 3 * 3_600_000) as f64),
                ..create_test_tab(1, "https://a.com", "")
            },
            TabInfo {
                last_accessed: Some((NOW - 60_000) as f64),
                ..create_test_tab(2, "https://b.com", "")
            },
            TabInfo {
                discarded: true,
                ..create_test_tab(3, "https://c.com", "")
            },
        ];

        assert_eq!(ids(&select_inactive(&tabs, &settings, NOW)), vec![1, 3]);
    }

    #[test]
    fn test_close_inactive_end_to_end() {
        let host = FakeHost::with_tabs(vec![
            TabInfo {
                discarded: true,
                ..create_test_tab(1, "https://a.com", "")
            },
            create_test_tab(2, "https://b.com", ""),
        ]);

        let outcome = block_on(close_inactive(&host, &Settings::default())).unwrap();

        assert_eq!(outcome.closed_count, 1);
        assert_eq!(host.removed(), vec![1]);
    }

    #[test]
    fn test_select_duplicates() {
        let tabs = vec![
            create_test_tab(1, "https://google.com", "Google 1"),
            create_test_tab(2, "https://github.com", "GitHub"),
            create_test_tab(3, "https://google.com", "Google 2"),
            TabInfo {
                pinned: true,
                ..create_test_tab(4, "https://github.com", "GitHub pinned")
            },
            create_test_tab(5, "https://github.com#readme", "GitHub 2"),
            create_test_tab(6, "not a url", ""),
            create_test_tab(7, "not a url", ""),
        ];

        assert_eq!(ids(&select_duplicates(&tabs)), vec![3, 5]);
    }

    #[test]
    fn test_close_duplicates_fragment_only_difference() {
        let host = FakeHost::with_tabs(vec![
            create_test_tab(1, "https://x.com/#a", ""),
            create_test_tab(2, "https://x.com/#b", ""),
            create_test_tab(3, "https://y.com", ""),
        ]);

        let outcome = block_on(close_duplicates(&host, &Settings::default())).unwrap();

        assert_eq!(outcome.closed_count, 1);
        assert_eq!(host.removed(), vec![2]);
        assert_eq!(outcome.closed_tabs[0].url, "https://x.com/#b");
    }

    #[test]
    fn test_plan_sort_orders_by_domain_popularity() {
        let tabs = vec![
            create_test_tab(0, "https://b.com/1", ""),
            create_test_tab(1, "https://a.com/1", ""),
            create_test_tab(2, "about:blank", ""),
            create_test_tab(3, "https://c.com/1", ""),
            create_test_tab(4, "https://c.com/2", ""),
            create_test_tab(5, "https://a.com/2", ""),
            create_test_tab(6, "data:text/plain,hello", ""),
        ];

        let plan = plan_sort(&tabs);

        // a.com and c.com have 2; the two unresolvable tabs share the empty
        // domain and also have 2, but sort after the real domains.
        assert_eq!(plan.pinned_count, 0);
        assert_eq!(plan.order, vec![1, 5, 3, 4, 2, 6, 0]);
    }

    #[test]
    fn test_plan_sort_counts_pinned_but_leaves_them() {
        let tabs = vec![
            TabInfo {
                pinned: true,
                ..create_test_tab(0, "https://b.com/pinned", "")
            },
            create_test_tab(1, "https://a.com/1", ""),
            create_test_tab(2, "https://b.com/1", ""),
        ];

        let plan = plan_sort(&tabs);

        assert_eq!(plan.pinned_count, 1);
        assert_eq!(plan.order, vec![2, 1]);
    }

    #[test]
    fn test_sort_keeps_pinned_prefix() {
        let host = FakeHost::with_tabs(vec![
            TabInfo {
                pinned: true,
                ..TabInfo::new(10, 1, 0, "https://z.com")
            },
            TabInfo {
                pinned: true,
                ..TabInfo::new(11, 1, 1, "https://y.com")
            },
            TabInfo::new(12, 1, 2, "https://a.com/1"),
            TabInfo::new(13, 1, 3, "https://b.com/1"),
            TabInfo::new(14, 1, 4, "https://b.com/2"),
            TabInfo::new(15, 2, 0, "https://other-window.com"),
        ]);
        let moved = block_on(sort_tabs_by_open_count(&host)).unwrap();

        assert_eq!(moved, 3);
        let window: Vec<i32> = host.window_tabs(1).iter().map(|t| t.id).collect();
        assert_eq!(window, vec![10, 11, 13, 14, 12]);
        assert_eq!(host.window_tabs(2).len(), 1);
    }

    #[test]
    fn test_sort_continues_after_move_failure() {
        let host = FakeHost::with_tabs(vec![
            TabInfo::new(1, 1, 0, "https://a.com"),
            TabInfo::new(2, 1, 1, "https://b.com/1"),
            TabInfo::new(3, 1, 2, "https://b.com/2"),
        ]);
        host.fail_move(2);

        let moved = block_on(sort_tabs_by_open_count(&host)).unwrap();

        assert_eq!(moved, 2);
        assert_eq!(host.moves(), vec![(3, 1), (1, 2)]);
    }

    #[test]
    fn test_sort_single_tab_is_noop() {
        let host = FakeHost::with_tabs(vec![TabInfo::new(1, 1, 0, "https://a.com")]);

        assert_eq!(block_on(sort_tabs_by_open_count(&host)).unwrap(), 0);
        assert!(host.moves().is_empty());
    }
}
