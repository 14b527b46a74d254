//! Join configuration.
//!
//! The engine never parses command lines; a driver builds a [`JoinConfig`]
//! (usually from a TOML file plus flag overrides) and hands it in.

use bandjoin_error::{BandJoinError, Result};
use serde::{Deserialize, Serialize};

/// Default band tolerance, in days.
pub const DEFAULT_MAX_DAYS_DIFF: u32 = 10;

/// How an emitted (left, right) pair is identified for duplicate
/// suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairIdentity {
    /// Pair of row ordinals. Distinct rows with identical content are
    /// distinct pairs.
    #[default]
    Ordinal,
    /// Pair of full row contents. Rows with identical content collapse.
    Content,
}

impl PairIdentity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ordinal => "ordinal",
            Self::Content => "content",
        }
    }

    /// Parse the `as_str` form.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "ordinal" => Some(Self::Ordinal),
            "content" => Some(Self::Content),
            _ => None,
        }
    }
}

/// Parameters for one join invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JoinConfig {
    /// Inclusive band tolerance between the two timestamps, in days.
    pub max_days_diff: u32,
    /// Put relation 2 on the left instead of relation 1.
    pub invert_join: bool,
    /// Dedup identity for the symmetric join.
    pub pair_identity: PairIdentity,
    /// Optional dedup for the semi-join. `None` keeps every match.
    pub semi_join_dedup: Option<PairIdentity>,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            max_days_diff: DEFAULT_MAX_DAYS_DIFF,
            invert_join: false,
            pair_identity: PairIdentity::Ordinal,
            semi_join_dedup: None,
        }
    }
}

impl JoinConfig {
    #[must_use]
    pub fn with_max_days_diff(mut self, max_days_diff: u32) -> Self {
        self.max_days_diff = max_days_diff;
        self
    }

    #[must_use]
    pub fn inverted(mut self, invert_join: bool) -> Self {
        self.invert_join = invert_join;
        self
    }

    #[must_use]
    pub fn with_pair_identity(mut self, identity: PairIdentity) -> Self {
        self.pair_identity = identity;
        self
    }

    #[must_use]
    pub fn with_semi_join_dedup(mut self, dedup: Option<PairIdentity>) -> Self {
        self.semi_join_dedup = dedup;
        self
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| BandJoinError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_ten_days_relation_one_left() {
        let config = JoinConfig::default();
        assert_eq!(config.max_days_diff, 10);
        assert!(!config.invert_join);
        assert_eq!(config.pair_identity, PairIdentity::Ordinal);
        assert!(config.semi_join_dedup.is_none());
    }

    #[test]
    fn toml_overrides_selected_fields() {
        let config = JoinConfig::from_toml_str(
            "max_days_diff = 3\ninvert_join = true\nsemi_join_dedup = \"content\"\n",
        )
        .unwrap();
        assert_eq!(config.max_days_diff, 3);
        assert!(config.invert_join);
        assert_eq!(config.pair_identity, PairIdentity::Ordinal);
        assert_eq!(config.semi_join_dedup, Some(PairIdentity::Content));
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(
            JoinConfig::from_toml_str("").unwrap(),
            JoinConfig::default()
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = JoinConfig::from_toml_str("max_day_diff = 3").unwrap_err();
        assert!(matches!(err, BandJoinError::Config(_)));
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        assert!(JoinConfig::from_toml_str("max_days_diff = -1").is_err());
        assert!(JoinConfig::from_toml_str("max_days_diff = 4294967296").is_err());
    }

    #[test]
    fn full_u32_tolerance_is_accepted() {
        let config = JoinConfig::from_toml_str("max_days_diff = 4294967295").unwrap();
        assert_eq!(config.max_days_diff, u32::MAX);
    }

    #[test]
    fn identity_labels_round_trip() {
        for id in [PairIdentity::Ordinal, PairIdentity::Content] {
            assert_eq!(PairIdentity::parse(id.as_str()), Some(id));
        }
        assert_eq!(PairIdentity::parse("bogus"), None);
    }
}
