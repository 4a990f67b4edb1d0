//! Forecast cache keyed by request URL.
//!
//! An entry is served while it is younger than the provider's TTL and was
//! generated on the same local calendar day as the lookup. Crossing local
//! midnight invalidates an entry even when it is still inside its TTL,
//! because day-relative naming ("Today", "Tonight") goes stale the moment
//! the date rolls over. Alerts are deliberately never cached.

use std::collections::HashMap;

use chrono::{Local, NaiveDateTime, TimeDelta};
use tokio::sync::Mutex;

use crate::wx::CanonicalForecast;

/// Whether a cached entry may be served.
///
/// Both timestamps are local wall-clock times. The same-day check wins over
/// the TTL: a fresh entry from yesterday evening is still unusable.
fn is_usable(generated: NaiveDateTime, now: NaiveDateTime, ttl_secs: u64) -> bool {
    let ttl = TimeDelta::try_seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX))
        .unwrap_or(TimeDelta::MAX);
    let age = now.signed_duration_since(generated);
    age < ttl && generated.date() == now.date()
}

/// URL-keyed store of normalized forecasts.
#[derive(Debug, Default)]
pub struct ForecastCache {
    entries: Mutex<HashMap<String, CanonicalForecast>>,
}

impl ForecastCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached forecast for a URL when it is still usable.
    pub async fn lookup(&self, url: &str) -> Option<CanonicalForecast> {
        let entries = self.entries.lock().await;
        let entry = entries.get(url)?;
        let generated = entry
            .metadata
            .generated_at
            .with_timezone(&Local)
            .naive_local();
        let ttl = entry
            .metadata
            .valid_until
            .signed_duration_since(entry.metadata.generated_at)
            .num_seconds();
        let ttl_secs = u64::try_from(ttl).unwrap_or(0);
        is_usable(generated, Local::now().naive_local(), ttl_secs).then(|| entry.clone())
    }

    /// Replace the entry for a forecast's URL in one step.
    pub async fn store(&self, forecast: CanonicalForecast) {
        let mut entries = self.entries.lock().await;
        entries.insert(forecast.metadata.source_url.clone(), forecast);
    }

    /// Drop the entry for a URL, if present.
    pub async fn evict(&self, url: &str) {
        let mut entries = self.entries.lock().await;
        entries.remove(url);
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// True when nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn fresh_same_day_entry_is_usable() {
        assert!(is_usable(at(1, 12, 0), at(1, 12, 30), 3600));
    }

    #[test]
    fn entry_older_than_ttl_is_not_usable() {
        assert!(!is_usable(at(1, 12, 0), at(1, 13, 0), 3600));
        assert!(!is_usable(at(1, 12, 0), at(1, 18, 0), 3600));
    }

    #[test]
    fn crossing_midnight_invalidates_even_inside_ttl() {
        // Generated 23:30 with a one hour TTL: usable at 23:59, but at
        // 00:10 the date rolled over and the entry must not be served even
        // though it is only 40 minutes old.
        assert!(is_usable(at(1, 23, 30), at(1, 23, 59), 3600));
        assert!(!is_usable(at(1, 23, 30), at(2, 0, 10), 3600));
        // The late-evening scenario: generated 23:00, queried 00:30.
        assert!(!is_usable(at(1, 23, 0), at(2, 0, 30), 3600));
    }

    #[test]
    fn midnight_rule_wins_at_the_boundary() {
        // 23:59 -> 00:00 is one minute of age but a new day.
        assert!(!is_usable(at(1, 23, 59), at(2, 0, 0), 3600));
    }
}
