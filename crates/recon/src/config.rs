use serde::Deserialize;

use crate::engine::ReconOptions;
use crate::error::ReconError;
use crate::matcher::{PartialPolicy, DEFAULT_MINOR_THRESHOLD, DEFAULT_PARTIAL_BUDGET};
use crate::model::{ColumnMapping, ColumnPair};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    pub name: String,
    pub gst: SourceConfig,
    pub tally: SourceConfig,
    pub mapping: Vec<ColumnPair>,
    #[serde(default)]
    pub partial: PartialConfig,
    #[serde(default)]
    pub dates: DateConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// One exported dataset. `file` is resolved relative to the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub file: String,
}

// ---------------------------------------------------------------------------
// Matching policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    #[serde(default = "default_budget")]
    pub budget: usize,
    #[serde(default = "default_minor_threshold")]
    pub minor_threshold: f64,
    /// Extra monetary column name fragments, added to the built-in tax list.
    #[serde(default)]
    pub monetary_columns: Vec<String>,
}

fn default_budget() -> usize {
    DEFAULT_PARTIAL_BUDGET
}

fn default_minor_threshold() -> f64 {
    DEFAULT_MINOR_THRESHOLD
}

impl Default for PartialConfig {
    fn default() -> Self {
        Self {
            budget: DEFAULT_PARTIAL_BUDGET,
            minor_threshold: DEFAULT_MINOR_THRESHOLD,
            monetary_columns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateConfig {
    #[serde(default = "default_detect")]
    pub detect: bool,
}

fn default_detect() -> bool {
    true
}

impl Default for DateConfig {
    fn default() -> Self {
        Self { detect: true }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub csv_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.gst.file.trim().is_empty() {
            return Err(ReconError::ConfigValidation("gst.file must not be empty".into()));
        }
        if self.tally.file.trim().is_empty() {
            return Err(ReconError::ConfigValidation("tally.file must not be empty".into()));
        }

        if !self.mapping.iter().any(ColumnPair::is_valid) {
            return Err(ReconError::ConfigValidation(
                "at least one [[mapping]] entry with both gst and tally columns is required".into(),
            ));
        }

        if self.partial.budget == 0 {
            return Err(ReconError::ConfigValidation(
                "partial.budget must be at least 1".into(),
            ));
        }
        if !self.partial.minor_threshold.is_finite() || self.partial.minor_threshold <= 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "partial.minor_threshold must be a positive number, got {}",
                self.partial.minor_threshold
            )));
        }

        Ok(())
    }

    pub fn column_mapping(&self) -> ColumnMapping {
        ColumnMapping::new(self.mapping.clone())
    }

    pub fn options(&self) -> ReconOptions {
        let partial = PartialPolicy {
            budget: self.partial.budget,
            minor_threshold: self.partial.minor_threshold,
            ..PartialPolicy::default()
        }
        .with_monetary_columns(self.partial.monetary_columns.iter().cloned());

        ReconOptions {
            name: self.name.clone(),
            partial,
            detect_dates: self.dates.detect,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "FY25 Q1"

[gst]
file = "gst.csv"

[tally]
file = "tally.csv"

[[mapping]]
gst = "Invoice No"
tally = "Inv"

[[mapping]]
gst = "Taxable Value"
tally = "Taxable"
"#;

    #[test]
    fn parse_valid_with_defaults() {
        let config = ReconConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "FY25 Q1");
        assert_eq!(config.gst.file, "gst.csv");
        assert_eq!(config.mapping.len(), 2);
        assert_eq!(config.partial.budget, 3);
        assert_eq!(config.partial.minor_threshold, 1.0);
        assert!(config.dates.detect);
        assert!(config.output.json.is_none());

        let opts = config.options();
        assert_eq!(opts.name, "FY25 Q1");
        assert_eq!(opts.partial, PartialPolicy::default());
        assert!(opts.detect_dates);
    }

    #[test]
    fn parse_partial_and_dates_sections() {
        let input = format!(
            r#"{VALID}
[partial]
budget = 2
minor_threshold = 0.5
monetary_columns = ["Amount"]

[dates]
detect = false

[output]
json = "result.json"
csv_dir = "out"
"#
        );
        let config = ReconConfig::from_toml(&input).unwrap();
        let opts = config.options();
        assert_eq!(opts.partial.budget, 2);
        assert_eq!(opts.partial.minor_threshold, 0.5);
        assert!(opts.partial.monetary_fragments.iter().any(|f| f == "amount"));
        assert!(!opts.detect_dates);
        assert_eq!(config.output.csv_dir.as_deref(), Some("out"));
    }

    #[test]
    fn reject_mapping_without_usable_pairs() {
        let input = r#"
name = "Bad"
[gst]
file = "gst.csv"
[tally]
file = "tally.csv"
[[mapping]]
gst = ""
tally = "Inv"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("[[mapping]]"));
    }

    #[test]
    fn reject_zero_budget() {
        let input = format!("{VALID}\n[partial]\nbudget = 0\n");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("budget"));
    }

    #[test]
    fn reject_negative_threshold() {
        let input = format!("{VALID}\n[partial]\nminor_threshold = -1.0\n");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("minor_threshold"));
    }

    #[test]
    fn reject_unknown_key() {
        let input = format!("{VALID}\n[partial]\nbugdet = 2\n");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn reject_missing_tally_section() {
        let input = r#"
name = "Bad"
[gst]
file = "gst.csv"
[[mapping]]
gst = "Invoice No"
tally = "Inv"
"#;
        assert!(ReconConfig::from_toml(input).is_err());
    }
}
