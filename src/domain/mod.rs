//! Domain types for the chart cache.
//!
//! A cached artifact always belongs to exactly one [`CacheFamily`] and is
//! about a [`Subject`]: one birth profile, or a pair of them for chart
//! comparisons.

pub mod cache_key;
pub mod error;
pub mod record;

pub use error::CacheError;
pub use record::{CacheRecord, NewCacheRecord, format_timestamp, parse_timestamp};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three cached artifact kinds. Each family lives in its own table.
///
/// # Examples
///
/// ```rust
/// use jyotish::domain::CacheFamily;
///
/// let family: CacheFamily = "varshaphal".parse().unwrap();
/// assert_eq!(family, CacheFamily::Varshaphal);
/// assert_eq!(family.table_name(), "varshaphal_predictions");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheFamily {
    LifeSnapshot,
    Varshaphal,
    Comparison,
}

impl CacheFamily {
    pub const ALL: [Self; 3] = [Self::LifeSnapshot, Self::Varshaphal, Self::Comparison];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LifeSnapshot => "life_snapshot",
            Self::Varshaphal => "varshaphal",
            Self::Comparison => "comparison",
        }
    }

    #[must_use]
    pub const fn table_name(&self) -> &'static str {
        match self {
            Self::LifeSnapshot => "life_snapshots",
            Self::Varshaphal => "varshaphal_predictions",
            Self::Comparison => "chart_comparisons",
        }
    }

    /// Comparison records reference two profiles instead of one.
    #[must_use]
    pub const fn is_paired(&self) -> bool {
        matches!(self, Self::Comparison)
    }
}

impl fmt::Display for CacheFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheFamily {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "life_snapshot" | "life-snapshot" | "snapshot" => Ok(Self::LifeSnapshot),
            "varshaphal" => Ok(Self::Varshaphal),
            "comparison" | "chart_comparison" => Ok(Self::Comparison),
            other => Err(CacheError::InvalidSubject(format!(
                "unknown cache family '{other}'"
            ))),
        }
    }
}

/// The profile (or profiles) a cached artifact is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Subject {
    Profile { profile_id: String },
    Pair {
        profile_id: String,
        counterpart_profile_id: String,
    },
}

impl Subject {
    #[must_use]
    pub fn profile(profile_id: impl Into<String>) -> Self {
        Self::Profile {
            profile_id: profile_id.into(),
        }
    }

    /// Builds a comparison subject. A profile can't be compared with itself.
    pub fn pair(
        profile_id: impl Into<String>,
        counterpart_profile_id: impl Into<String>,
    ) -> Result<Self, CacheError> {
        let profile_id = profile_id.into();
        let counterpart_profile_id = counterpart_profile_id.into();

        if profile_id == counterpart_profile_id {
            return Err(CacheError::SelfComparison(profile_id));
        }

        Ok(Self::Pair {
            profile_id,
            counterpart_profile_id,
        })
    }

    #[must_use]
    pub fn primary(&self) -> &str {
        match self {
            Self::Profile { profile_id } | Self::Pair { profile_id, .. } => profile_id,
        }
    }

    #[must_use]
    pub fn counterpart(&self) -> Option<&str> {
        match self {
            Self::Profile { .. } => None,
            Self::Pair {
                counterpart_profile_id,
                ..
            } => Some(counterpart_profile_id),
        }
    }

    /// All referenced profile ids, primary first.
    #[must_use]
    pub fn profile_ids(&self) -> Vec<&str> {
        let mut ids = vec![self.primary()];
        ids.extend(self.counterpart());
        ids
    }

    /// Checks that the subject shape matches what `family` stores.
    pub fn ensure_fits(&self, family: CacheFamily) -> Result<(), CacheError> {
        match (family.is_paired(), self) {
            (true, Self::Pair { .. }) | (false, Self::Profile { .. }) => Ok(()),
            (true, Self::Profile { .. }) => Err(CacheError::InvalidSubject(format!(
                "{family} records need two profiles"
            ))),
            (false, Self::Pair { .. }) => Err(CacheError::InvalidSubject(format!(
                "{family} records take a single profile"
            ))),
        }
    }
}

/// An authenticated identity. Owner ids on cache records are always taken
/// from here, never from client input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Caller(String);

impl Caller {
    #[must_use]
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self(user_id.into())
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn owns(&self, owner_id: &str) -> bool {
        self.0 == owner_id
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_round_trips_through_str() {
        for family in CacheFamily::ALL {
            assert_eq!(family.as_str().parse::<CacheFamily>().unwrap(), family);
        }
        assert!("horoscope".parse::<CacheFamily>().is_err());
    }

    #[test]
    fn pair_rejects_self_comparison() {
        let err = Subject::pair("p1", "p1").unwrap_err();
        assert!(matches!(err, CacheError::SelfComparison(id) if id == "p1"));
    }

    #[test]
    fn subject_shape_must_match_family() {
        let single = Subject::profile("p1");
        let pair = Subject::pair("p1", "p2").unwrap();

        assert!(single.ensure_fits(CacheFamily::LifeSnapshot).is_ok());
        assert!(single.ensure_fits(CacheFamily::Comparison).is_err());
        assert!(pair.ensure_fits(CacheFamily::Comparison).is_ok());
        assert!(pair.ensure_fits(CacheFamily::Varshaphal).is_err());
    }

    #[test]
    fn profile_ids_lists_primary_first() {
        let pair = Subject::pair("a", "b").unwrap();
        assert_eq!(pair.profile_ids(), vec!["a", "b"]);
        assert_eq!(Subject::profile("a").profile_ids(), vec!["a"]);
    }

    #[test]
    fn caller_ownership() {
        let caller = Caller::authenticated("u1");
        assert!(caller.owns("u1"));
        assert!(!caller.owns("u2"));
    }
}
