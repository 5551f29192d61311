//! Tier catalog: entitlement tiers, their features and their usage limits.
//!
//! The catalog is static. `pro` and `max` are only ever granted by the
//! platform itself; `tier_for` never assigns them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::identity::Identity;

const MB: u64 = 1024 * 1024;

/// Entitlement tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Basic,
    Pro,
    Max,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Free, Tier::Basic, Tier::Pro, Tier::Max];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Pro => "pro",
            Self::Max => "max",
        }
    }

    /// Total parse: anything unrecognized is `Free`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "basic" => Self::Basic,
            "pro" => Self::Pro,
            "max" => Self::Max,
            _ => Self::Free,
        }
    }

    pub fn features(&self) -> FeatureSet {
        let names: &[&str] = match self {
            Self::Free => &[
                "basic_rtl_context",
                "basic_testbench_context",
                "limited_synthesis_context",
            ],
            Self::Basic => &[
                "full_rtl_context",
                "full_testbench_context",
                "synthesis_context",
                "dft_jtag_context",
            ],
            Self::Pro => &[
                "all_basic_features",
                "advanced_synthesis_context",
                "formal_verification_context",
            ],
            Self::Max => &[
                "all_pro_features",
                "security_context",
                "catalog_integration",
                "custom_context_generation",
            ],
        };
        FeatureSet(names.iter().map(|n| n.to_string()).collect())
    }

    pub fn limits(&self) -> LimitSet {
        match self {
            Self::Free => LimitSet {
                max_projects: Limit::Bounded(3),
                max_context_bytes: MB,
                max_daily_requests: Limit::Bounded(100),
            },
            Self::Basic => LimitSet {
                max_projects: Limit::Bounded(10),
                max_context_bytes: 5 * MB,
                max_daily_requests: Limit::Bounded(1000),
            },
            Self::Pro => LimitSet {
                max_projects: Limit::Bounded(50),
                max_context_bytes: 20 * MB,
                max_daily_requests: Limit::Bounded(5000),
            },
            Self::Max => LimitSet {
                max_projects: Limit::Unbounded,
                max_context_bytes: 100 * MB,
                max_daily_requests: Limit::Unbounded,
            },
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the default tier from identity attributes. First match wins.
pub fn tier_for(identity: &Identity) -> Tier {
    let plan = identity.plan_name.trim().to_lowercase();
    if plan == "pro" || plan == "enterprise" {
        return Tier::Basic;
    }
    if identity.public_repo_count > 50 || identity.follower_count > 100 {
        return Tier::Basic;
    }
    Tier::Free
}

/// Feature lookup by tier name; unknown names get the `free` row.
pub fn features_for(tier_name: &str) -> FeatureSet {
    Tier::parse(tier_name).features()
}

/// Limit lookup by tier name; unknown names get the `free` row.
pub fn limits_for(tier_name: &str) -> LimitSet {
    Tier::parse(tier_name).limits()
}

/// Ordered list of capability names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(Vec<String>);

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, capability: &str) -> bool {
        self.0.iter().any(|c| c == capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// A count limit that may be unbounded. Serialized as `-1` when unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Bounded(u64),
    Unbounded,
}

impl Limit {
    /// Whether `used` more units still fit under the limit.
    pub fn allows(&self, used: u64) -> bool {
        match self {
            Limit::Bounded(max) => used < *max,
            Limit::Unbounded => true,
        }
    }
}

impl std::fmt::Display for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Limit::Bounded(n) => write!(f, "{n}"),
            Limit::Unbounded => f.write_str("unlimited"),
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Limit::Bounded(n) => serializer.serialize_i64(*n as i64),
            Limit::Unbounded => serializer.serialize_i64(-1),
        }
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Ok(if raw < 0 {
            Limit::Unbounded
        } else {
            Limit::Bounded(raw as u64)
        })
    }
}

/// Usage limits for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitSet {
    pub max_projects: Limit,
    pub max_context_bytes: u64,
    pub max_daily_requests: Limit,
}
