//! Counter storage for the tiered rate limiter.

use std::collections::HashMap;
use std::fmt::Debug;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::key::ClientKey;
use super::tier::{Tier, TierName};

/// Counter state for one client in one tier's current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRecord {
    /// When the current window opened.
    pub window_start: Instant,
    /// Requests admitted in the current window.
    pub count: u32,
}

impl WindowRecord {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            count: 0,
        }
    }

    fn is_expired(&self, window: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }

    fn reset_after(&self, window: Duration, now: Instant) -> Duration {
        window.saturating_sub(now.saturating_duration_since(self.window_start))
    }
}

/// Usage of one tier after a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierUsage {
    /// The tier this usage is for.
    pub tier: Tier,
    /// Requests counted in the current window.
    pub count: u32,
    /// Time until the window resets.
    pub reset_after: Duration,
}

impl TierUsage {
    /// Requests still allowed in the current window.
    pub fn remaining(&self) -> u32 {
        self.tier.limit.saturating_sub(self.count)
    }

    /// Whether the tier admits no more requests this window.
    pub fn is_exhausted(&self) -> bool {
        self.count >= self.tier.limit
    }
}

/// Outcome of a store hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Every tier had room; all counters were incremented.
    Allowed(Vec<TierUsage>),
    /// At least one tier was exhausted; no counter changed.
    Rejected(Vec<TierUsage>),
}

impl Decision {
    /// Check if the request was admitted.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed(_))
    }

    /// Per-tier usage, in tier order.
    pub fn usage(&self) -> &[TierUsage] {
        match self {
            Decision::Allowed(usage) | Decision::Rejected(usage) => usage,
        }
    }
}

/// Storage for per-client, per-tier window counters.
///
/// `hit` must be atomic per client: concurrent hits for the same key are
/// serialized so that no tier admits more than its limit.
pub trait CounterStore: Send + Sync + Debug {
    /// Check every tier for `key` and, if all have room, count the request.
    fn hit(&self, key: &ClientKey, tiers: &[Tier], now: Instant) -> Decision;

    /// Drop windows that have elapsed. Returns the number of clients removed.
    fn purge_expired(&self, tiers: &[Tier], now: Instant) -> usize;

    /// Number of clients with live records.
    fn tracked_clients(&self) -> usize;
}

/// In-process counter store.
///
/// Suitable for a single instance. Each client's records live under one
/// map entry, so the entry lock serializes a client's check-and-increment.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    clients: DashMap<ClientKey, HashMap<TierName, WindowRecord>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one client's record for a tier.
    pub fn record(&self, key: &ClientKey, tier: TierName) -> Option<WindowRecord> {
        self.clients
            .get(key)
            .and_then(|records| records.get(&tier).copied())
    }
}

impl CounterStore for InMemoryStore {
    fn hit(&self, key: &ClientKey, tiers: &[Tier], now: Instant) -> Decision {
        let mut entry = self.clients.entry(key.clone()).or_default();
        let records = entry.value_mut();

        // Roll over elapsed windows before looking at counts
        for tier in tiers {
            let record = records
                .entry(tier.name)
                .or_insert_with(|| WindowRecord::new(now));
            if record.is_expired(tier.window, now) {
                *record = WindowRecord::new(now);
            }
        }

        let exhausted = tiers.iter().any(|tier| {
            records
                .get(&tier.name)
                .is_some_and(|record| record.count >= tier.limit)
        });

        if !exhausted {
            for tier in tiers {
                if let Some(record) = records.get_mut(&tier.name) {
                    record.count += 1;
                }
            }
        }

        let usage = tiers
            .iter()
            .map(|tier| {
                let record = records
                    .get(&tier.name)
                    .copied()
                    .unwrap_or_else(|| WindowRecord::new(now));
                TierUsage {
                    tier: *tier,
                    count: record.count,
                    reset_after: record.reset_after(tier.window, now),
                }
            })
            .collect();

        if exhausted {
            Decision::Rejected(usage)
        } else {
            Decision::Allowed(usage)
        }
    }

    fn purge_expired(&self, tiers: &[Tier], now: Instant) -> usize {
        let windows: HashMap<TierName, Duration> =
            tiers.iter().map(|tier| (tier.name, tier.window)).collect();

        let before = self.clients.len();
        self.clients.retain(|_, records| {
            records.retain(|name, record| {
                windows
                    .get(name)
                    .is_some_and(|window| !record.is_expired(*window, now))
            });
            !records.is_empty()
        });
        before.saturating_sub(self.clients.len())
    }

    fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::tier::Tier;

    fn client(n: u8) -> ClientKey {
        ClientKey::Ip(format!("192.0.2.{}", n).parse().unwrap())
    }

    fn small_tiers() -> Vec<Tier> {
        vec![
            Tier::new(TierName::Short, Duration::from_secs(10), 2),
            Tier::new(TierName::Long, Duration::from_secs(100), 3),
        ]
    }

    #[test]
    fn admits_until_limit_then_rejects() {
        let store = InMemoryStore::new();
        let tiers = small_tiers();
        let now = Instant::now();

        assert!(store.hit(&client(1), &tiers, now).is_allowed());
        assert!(store.hit(&client(1), &tiers, now).is_allowed());

        let decision = store.hit(&client(1), &tiers, now);
        assert!(!decision.is_allowed());
        assert!(decision.usage()[0].is_exhausted());
        assert!(!decision.usage()[1].is_exhausted());
    }

    #[test]
    fn rejection_leaves_counters_untouched() {
        let store = InMemoryStore::new();
        let tiers = small_tiers();
        let now = Instant::now();

        store.hit(&client(1), &tiers, now);
        store.hit(&client(1), &tiers, now);
        store.hit(&client(1), &tiers, now);
        store.hit(&client(1), &tiers, now);

        let long = store.record(&client(1), TierName::Long).unwrap();
        assert_eq!(long.count, 2);
    }

    #[test]
    fn tiers_reset_on_their_own_boundaries() {
        let store = InMemoryStore::new();
        let tiers = small_tiers();
        let start = Instant::now();

        store.hit(&client(1), &tiers, start);
        store.hit(&client(1), &tiers, start);

        // Short window rolled over, long window still counting
        let later = start + Duration::from_secs(11);
        let decision = store.hit(&client(1), &tiers, later);
        assert!(decision.is_allowed());
        assert_eq!(decision.usage()[0].count, 1);
        assert_eq!(decision.usage()[1].count, 3);

        // Long tier now exhausted even though short has room
        let decision = store.hit(&client(1), &tiers, later);
        assert!(!decision.is_allowed());
        assert!(decision.usage()[1].is_exhausted());
        assert_eq!(
            store.record(&client(1), TierName::Long).unwrap().window_start,
            start
        );
    }

    #[test]
    fn reset_after_counts_down() {
        let store = InMemoryStore::new();
        let tiers = small_tiers();
        let start = Instant::now();

        store.hit(&client(1), &tiers, start);
        let decision = store.hit(&client(1), &tiers, start + Duration::from_secs(4));

        assert_eq!(decision.usage()[0].reset_after, Duration::from_secs(6));
        assert_eq!(decision.usage()[1].reset_after, Duration::from_secs(96));
    }

    #[test]
    fn clients_are_independent() {
        let store = InMemoryStore::new();
        let tiers = small_tiers();
        let now = Instant::now();

        store.hit(&client(1), &tiers, now);
        store.hit(&client(1), &tiers, now);
        assert!(!store.hit(&client(1), &tiers, now).is_allowed());

        assert!(store.hit(&client(2), &tiers, now).is_allowed());
        assert!(store.hit(&ClientKey::Anonymous, &tiers, now).is_allowed());
        assert_eq!(store.tracked_clients(), 3);
    }

    #[test]
    fn purge_drops_only_fully_expired_clients() {
        let store = InMemoryStore::new();
        let tiers = small_tiers();
        let start = Instant::now();

        store.hit(&client(1), &tiers, start);
        store.hit(&client(2), &tiers, start + Duration::from_secs(50));

        let removed = store.purge_expired(&tiers, start + Duration::from_secs(120));
        assert_eq!(removed, 1);
        assert_eq!(store.tracked_clients(), 1);
        assert!(store.record(&client(1), TierName::Short).is_none());

        // Client 2 keeps its long window but loses the elapsed short one
        assert!(store.record(&client(2), TierName::Short).is_none());
        assert_eq!(store.record(&client(2), TierName::Long).unwrap().count, 1);
    }
}
