//! Rate-limit tier definitions.

use std::time::Duration;

use serde::Serialize;
use strum::{Display, EnumString};

/// Name of a rate-limit tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TierName {
    /// One-minute window.
    Short,
    /// Five-minute window.
    Medium,
    /// One-hour window.
    Long,
}

/// One rate-limiting rule: at most `limit` requests per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tier {
    /// Tier identifier, used in headers and errors.
    pub name: TierName,
    /// Fixed window length.
    pub window: Duration,
    /// Max requests per window.
    pub limit: u32,
}

impl Tier {
    /// Create a tier.
    pub const fn new(name: TierName, window: Duration, limit: u32) -> Self {
        Self { name, window, limit }
    }

    /// The process-wide tier table.
    pub fn defaults() -> Vec<Tier> {
        vec![
            Tier::new(TierName::Short, Duration::from_secs(60), 10),
            Tier::new(TierName::Medium, Duration::from_secs(300), 50),
            Tier::new(TierName::Long, Duration::from_secs(3600), 100),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn default_table_matches_policy() {
        let tiers = Tier::defaults();
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0], Tier::new(TierName::Short, Duration::from_secs(60), 10));
        assert_eq!(tiers[1], Tier::new(TierName::Medium, Duration::from_secs(300), 50));
        assert_eq!(tiers[2], Tier::new(TierName::Long, Duration::from_secs(3600), 100));
    }

    #[test]
    fn tier_names_render_lowercase() {
        assert_eq!(TierName::Medium.to_string(), "medium");
        assert_eq!(TierName::from_str("long").unwrap(), TierName::Long);
        assert_eq!(serde_json::to_string(&TierName::Short).unwrap(), "\"short\"");
    }
}
