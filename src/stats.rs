/// Lifetime "tabs eaten" counters.
use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::top_domains;
use crate::error::Result;
use crate::host::TabHost;
use crate::settings::Settings;
use crate::storage::{self, STATS_KEY, count_field, millis_field};

/// Number of per-domain counters kept.
pub const MAX_DOMAINS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainCount {
    pub domain: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRecord {
    pub total_tabs_eaten: u64,
    #[serde(default)]
    pub by_domain: Vec<DomainCount>,
    pub started_at: i64,
}

impl StatsRecord {
    pub fn fresh(now: i64) -> StatsRecord {
        StatsRecord {
            total_tabs_eaten: 0,
            by_domain: Vec::new(),
            started_at: now,
        }
    }

    /// Rebuild a stored record. Missing or unreadable fields fall back to a
    /// fresh record started at `now`; unreadable domain counters are dropped.
    pub fn from_stored(raw: &Value, now: i64) -> StatsRecord {
        let Some(record) = raw.as_object() else {
            warn!("Ignoring malformed stats record: {}", raw);
            return StatsRecord::fresh(now);
        };

        let by_domain: Vec<DomainCount> = record
            .get("byDomain")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(domain_count).collect())
            .unwrap_or_default();

        StatsRecord {
            total_tabs_eaten: record.get("totalTabsEaten").and_then(count_field).unwrap_or(0),
            by_domain,
            started_at: record.get("startedAt").and_then(millis_field).unwrap_or(now),
        }
    }

    /// Add a batch close. Every domain in the batch is credited with the whole
    /// batch count, not its own share.
    pub fn add_close(&mut self, count: u64, domains: &[String]) {
        self.total_tabs_eaten = self.total_tabs_eaten.saturating_add(count);

        let mut counts: HashMap<String, u64> = self.by_domain.drain(..).map(|d| (d.domain, d.count)).collect();
        for domain in domains {
            let key = domain.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            let total = counts.entry(key).or_insert(0);
            *total = total.saturating_add(count);
        }

        self.by_domain = top_domains(&counts, MAX_DOMAINS)
            .into_iter()
            .map(|(domain, count)| DomainCount { domain, count })
            .collect();
    }

    fn sort_by_count(&mut self) {
        self.by_domain.sort_by(|a, b| b.count.cmp(&a.count));
    }
}

fn domain_count(value: &Value) -> Option<DomainCount> {
    let domain = value.get("domain").and_then(Value::as_str)?;
    let count = value.get("count").and_then(count_field);
    match count {
        Some(count) if !domain.is_empty() => Some(DomainCount {
            domain: domain.to_string(),
            count,
        }),
        _ => {
            warn!("Dropping unreadable stats entry: {}", value);
            None
        }
    }
}

/// Current record with `by_domain` sorted by count, or a fresh one.
pub async fn read<H: TabHost + ?Sized>(host: &H) -> Result<StatsRecord> {
    let now = host.now_ms();
    let mut record = match storage::load_raw(host, STATS_KEY).await? {
        Some(raw) => StatsRecord::from_stored(&raw, now),
        None => StatsRecord::fresh(now),
    };
    record.sort_by_count();
    Ok(record)
}

pub async fn reset<H: TabHost + ?Sized>(host: &H) -> Result<StatsRecord> {
    let record = StatsRecord::fresh(host.now_ms());
    storage::save(host, STATS_KEY, &record).await?;
    Ok(record)
}

pub async fn try_record_close<H: TabHost + ?Sized>(
    host: &H,
    settings: &Settings,
    count: u64,
    domains: &[String],
) -> Result<()> {
    if count == 0 || !settings.track_stats {
        return Ok(());
    }

    let mut record = read(host).await?;
    record.add_close(count, domains);
    storage::save(host, STATS_KEY, &record).await
}

/// Count a completed close. Failures are logged; the tabs are already gone.
pub async fn record_close<H: TabHost + ?Sized>(host: &H, settings: &Settings, count: u64, domains: &[String]) {
    if let Err(e) = try_record_close(host, settings, count, domains).await {
        warn!("Failed to update stats: {}", e);
    }
}
