//! Scorer configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no
//! file at all) gives a working configuration:
//!
//! ```toml
//! team_codes = ["cmu", "ibm", "isi", "jhu", "resin", "sbu"]
//! participant_prefix = "VP"
//! inferred_marker = "scorer:inferred"
//! inferred_comment = "inferred by transitive closure"
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default sentinel for scorer-inferred order ids and attribution references.
pub const DEFAULT_INFERRED_MARKER: &str = "scorer:inferred";

/// Settings shared by extraction and both order matchers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Performer-team prefixes accepted in `ta1ref` (case-insensitive).
    pub team_codes: Vec<String>,
    /// Two-character prefix of precedence-relevant reference event ids.
    pub participant_prefix: String,
    /// Sentinel written as order id and `ta1ref` on inferred edges.
    pub inferred_marker: String,
    /// Comment written on inferred edges.
    pub inferred_comment: String,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            team_codes: ["cmu", "ibm", "isi", "jhu", "resin", "sbu"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            participant_prefix: "VP".to_string(),
            inferred_marker: DEFAULT_INFERRED_MARKER.to_string(),
            inferred_comment: "inferred by transitive closure".to_string(),
        }
    }
}

impl ScorerConfig {
    /// Parse and validate a TOML configuration string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ScorerConfig =
            toml::from_str(content).map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::missing_input(format!(
                "config file {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.participant_prefix.chars().count() != 2 {
            return Err(Error::config(format!(
                "participant_prefix must be exactly 2 characters, got {:?}",
                self.participant_prefix
            )));
        }
        if self.inferred_marker.is_empty() {
            return Err(Error::config("inferred_marker must not be empty"));
        }
        if let Some(code) = self
            .team_codes
            .iter()
            .find(|c| c.is_empty() || c.contains(':'))
        {
            return Err(Error::config(format!("invalid team code {:?}", code)));
        }
        Ok(())
    }

    /// Whether `code` names a known performer team.
    pub fn is_team_code(&self, code: &str) -> bool {
        self.team_codes.iter().any(|c| c.eq_ignore_ascii_case(code))
    }

    /// Whether a reference event id is a precedence-relevant participant.
    pub fn is_participant(&self, reference_id: &str) -> bool {
        reference_id.starts_with(self.participant_prefix.as_str())
    }

    /// Serialize to a TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = ScorerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ScorerConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = ScorerConfig::from_toml_str("team_codes = [\"ACME\"]\n").unwrap();
        assert!(config.is_team_code("acme"));
        assert!(!config.is_team_code("cmu"));
        assert_eq!(config.participant_prefix, "VP");
    }

    #[test]
    fn test_bad_prefix_rejected() {
        let err = ScorerConfig::from_toml_str("participant_prefix = \"V\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = ScorerConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(ScorerConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let err = ScorerConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(err.is_skippable());
    }
}
