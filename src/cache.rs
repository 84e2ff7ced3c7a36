//! Time-bounded cached values and the clock that drives them.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

/// Source of "now" for staleness decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A value together with the instant after which it must be fetched again.
#[derive(Clone, Debug, PartialEq)]
pub struct CachedValue<T> {
    value: Option<T>,
    expiry: Option<DateTime<Utc>>,
}

impl<T> Default for CachedValue<T> {
    fn default() -> Self {
        Self {
            value: None,
            expiry: None,
        }
    }
}

impl<T> CachedValue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing is cached yet or the cached value has expired.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.value, self.expiry) {
            (Some(_), Some(expiry)) => now >= expiry,
            _ => true,
        }
    }

    /// Replace the cached value; it stays fresh for `ttl` from `now`.
    pub fn store(&mut self, value: T, now: DateTime<Utc>, ttl: Duration) {
        self.value = Some(value);
        self.expiry = Some(now + ttl);
    }

    /// Keep the value but force the next `needs_refresh` to say yes.
    pub fn invalidate(&mut self) {
        self.expiry = None;
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn empty_cache_needs_refresh() {
        let cache: CachedValue<f64> = CachedValue::new();
        assert!(cache.needs_refresh(t0()));
        assert!(cache.get().is_none());
    }

    #[test]
    fn fresh_until_expiry() {
        let mut cache = CachedValue::new();
        cache.store(100.0, t0(), Duration::seconds(5));

        assert!(!cache.needs_refresh(t0()));
        assert!(!cache.needs_refresh(t0() + Duration::milliseconds(4_999)));
        assert!(cache.needs_refresh(t0() + Duration::seconds(5)));
        assert_eq!(cache.get(), Some(&100.0));
    }

    #[test]
    fn store_replaces_value_and_expiry() {
        let mut cache = CachedValue::new();
        cache.store(1, t0(), Duration::seconds(5));
        cache.store(2, t0() + Duration::seconds(10), Duration::seconds(5));
        assert_eq!(cache.get(), Some(&2));
        assert_eq!(cache.expiry(), Some(t0() + Duration::seconds(15)));
    }

    #[test]
    fn invalidate_forces_refresh_but_keeps_value() {
        let mut cache = CachedValue::new();
        cache.store("x", t0(), Duration::seconds(5));
        cache.invalidate();
        assert!(cache.needs_refresh(t0()));
        assert_eq!(cache.get(), Some(&"x"));
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(t0());
        let other = clock.clone();
        clock.advance(Duration::seconds(3));
        assert_eq!(other.now(), t0() + Duration::seconds(3));
    }
}
