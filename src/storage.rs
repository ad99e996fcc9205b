/// Storage serialization utilities for `chrome.storage.local`
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::host::TabHost;

pub const SETTINGS_KEY: &str = "settings";
pub const HISTORY_KEY: &str = "history";
pub const STATS_KEY: &str = "stats";

/// Raw JSON stored under `key`, or `None` if it was never written.
pub async fn load_raw<H: TabHost + ?Sized>(host: &H, key: &str) -> Result<Option<Value>> {
    let value = host.storage_get(key).await?;
    Ok(value.filter(|v| !v.is_null()))
}

/// Non-negative count from a stored number. Fractions are truncated.
pub fn count_field(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n as u64)
    })
}

/// Epoch milliseconds from a stored number, which older records may hold as a float.
pub fn millis_field(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|n| n.is_finite()).map(|n| n as i64))
}

pub async fn save<H, T>(host: &H, key: &str, record: &T) -> Result<()>
where
    H: TabHost + ?Sized,
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(record)?;
    host.storage_set(key, value).await?;
    Ok(())
}
