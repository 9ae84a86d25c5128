//! Simulation configuration with documented defaults
//!
//! The defaults reproduce the Korean Ministry of Environment land-cover
//! scenario the consolidation model was built for. Every section can be
//! overridden from a TOML file; missing sections keep their defaults.
//!
//! The configuration is an immutable value. It is validated once before any
//! phase runs and then passed by reference into every operation.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::core::types::{EvolvedCategory, LandCode};

/// Weights are compared against 1.0 with this tolerance
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Complete configuration for one simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Source units of a category needed to yield one evolved unit
    pub compression_factors: BTreeMap<EvolvedCategory, u32>,

    /// Land-cover code that stands in for each evolved category
    ///
    /// Used by the grazing pass to decide whether a replaced unit is
    /// grazing land, forest, or neither.
    pub representative_codes: BTreeMap<EvolvedCategory, LandCode>,

    /// How each source land-cover code becomes an evolved category
    pub source_rules: BTreeMap<LandCode, SourceRule>,

    /// Land-cover code groupings
    pub codes: CodeSets,

    /// Code recorded for demolished parcels (they revert to grassland)
    pub demolished_code: LandCode,

    /// Descriptive type label for each original land-cover code
    pub type_labels: BTreeMap<LandCode, String>,

    /// Evolved categories that count as grazing land once placed
    pub grazing_categories: Vec<EvolvedCategory>,

    /// Site suitability index weights
    pub weights: SuitabilityWeights,

    /// Cumulative (migration, demolition) ratios, one entry per phase
    pub phases: Vec<PhaseSpec>,

    /// Distance reported when nothing can be measured
    pub distance_sentinel: f64,

    /// Seed for the run's random generator; system entropy when absent
    pub seed: Option<u64>,
}

/// Classification rule for a source land-cover code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRule {
    /// Always becomes the given category
    Fixed { category: EvolvedCategory },
    /// Dual-use land: `primary` with probability `primary_share`, else `secondary`
    Split {
        primary: EvolvedCategory,
        secondary: EvolvedCategory,
        primary_share: f64,
    },
}

/// Land-cover code groupings used by the classifiers and grazing pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeSets {
    pub source_eligible: BTreeSet<LandCode>,
    pub low_priority_urban: BTreeSet<LandCode>,
    pub high_priority_urban: BTreeSet<LandCode>,
    pub industrial: BTreeSet<LandCode>,
    pub transport: BTreeSet<LandCode>,
    pub forest: BTreeSet<LandCode>,
    pub base_grazing: BTreeSet<LandCode>,
}

/// Weights of the three suitability factors; must sum to 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuitabilityWeights {
    pub status: f64,
    pub centroid: f64,
    pub industrial: f64,
}

impl Default for SuitabilityWeights {
    fn default() -> Self {
        Self {
            status: 0.5,
            centroid: 0.3,
            industrial: 0.2,
        }
    }
}

impl SuitabilityWeights {
    pub fn sum(&self) -> f64 {
        self.status + self.centroid + self.industrial
    }
}

/// One simulation phase and its cumulative targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub label: String,
    /// Fraction of all source units processed by the end of this phase
    pub migration: f64,
    /// Fraction of replaceable units demolished by the end of this phase
    pub demolition: f64,
}

impl PhaseSpec {
    pub fn new(label: impl Into<String>, migration: f64, demolition: f64) -> Self {
        Self {
            label: label.into(),
            migration,
            demolition,
        }
    }
}

fn code_set(codes: &[&str]) -> BTreeSet<LandCode> {
    codes.iter().map(|c| LandCode::from(*c)).collect()
}

impl Default for CodeSets {
    fn default() -> Self {
        Self {
            source_eligible: code_set(&[
                "211", "212", "221", "222", "231", "241", "251", "311", "321", "331", "411", "423",
                "623",
            ]),
            low_priority_urban: code_set(&["111", "112", "141", "161", "162", "163"]),
            high_priority_urban: code_set(&["121", "131", "132"]),
            industrial: code_set(&["121"]),
            transport: code_set(&["151", "152", "153", "154", "155"]),
            forest: code_set(&["311", "321", "331"]),
            base_grazing: code_set(&["251", "411", "423", "623"]),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        use EvolvedCategory::*;

        let compression_factors = BTreeMap::from([
            (FoodCrop, 50),
            (LivestockFeed, 100),
            (FruitVegetable, 100),
            (Livestock, 2),
            (Forest, 30),
            (NaturalGrazing, 1),
        ]);

        let representative_codes = BTreeMap::from([
            (FoodCrop, LandCode::from("211")),
            (LivestockFeed, LandCode::from("221")),
            (FruitVegetable, LandCode::from("241")),
            (Livestock, LandCode::from("251")),
            (Forest, LandCode::from("331")),
            (NaturalGrazing, LandCode::from("411")),
        ]);

        let fixed = |category| SourceRule::Fixed { category };
        let source_rules = BTreeMap::from([
            (LandCode::from("211"), fixed(FoodCrop)),
            (LandCode::from("212"), fixed(FoodCrop)),
            (
                LandCode::from("221"),
                SourceRule::Split {
                    primary: LivestockFeed,
                    secondary: FruitVegetable,
                    primary_share: 0.7,
                },
            ),
            (LandCode::from("222"), fixed(LivestockFeed)),
            (LandCode::from("231"), fixed(FruitVegetable)),
            (LandCode::from("241"), fixed(FruitVegetable)),
            (LandCode::from("251"), fixed(Livestock)),
            (LandCode::from("311"), fixed(Forest)),
            (LandCode::from("321"), fixed(Forest)),
            (LandCode::from("331"), fixed(Forest)),
            (LandCode::from("411"), fixed(NaturalGrazing)),
            (LandCode::from("423"), fixed(NaturalGrazing)),
            (LandCode::from("623"), fixed(NaturalGrazing)),
        ]);

        let type_labels = [
            ("111", "URB-Res_Single"),
            ("112", "URB-Res_Multi"),
            ("121", "URB-Industrial"),
            ("131", "URB-Commercial"),
            ("132", "URB-Mixed"),
            ("141", "URB-Culture"),
            ("151", "INFRA-Airport"),
            ("152", "INFRA-Harbor"),
            ("153", "INFRA-Rail"),
            ("154", "INFRA-Road"),
            ("155", "INFRA-Other_Trans"),
            ("161", "URB-Infra_Env"),
            ("162", "URB-Public_EduAdmin"),
            ("163", "URB-Public_Other"),
            ("211", "AGR-Paddy_Managed"),
            ("212", "AGR-Paddy_Unmanaged"),
            ("221", "AGR-Field_Managed"),
            ("222", "AGR-Field_Unmanaged"),
            ("231", "AGR-Facility_Cult"),
            ("241", "AGR-Orchard"),
            ("251", "AGR-Pasture_Aqua"),
            ("311", "FOR-Deciduous"),
            ("321", "FOR-Coniferous"),
            ("331", "FOR-Mixed"),
            ("411", "NGRASS-Natural"),
            ("423", "NGRASS-Other"),
            ("623", "LAND-Bare_Other"),
        ]
        .into_iter()
        .map(|(code, label)| (LandCode::from(code), label.to_string()))
        .collect();

        Self {
            compression_factors,
            representative_codes,
            source_rules,
            codes: CodeSets::default(),
            demolished_code: LandCode::from("411"),
            type_labels,
            grazing_categories: vec![Livestock, NaturalGrazing],
            weights: SuitabilityWeights::default(),
            phases: vec![
                PhaseSpec::new("phase-1", 0.5, 0.5),
                PhaseSpec::new("phase-2", 0.8, 0.8),
                PhaseSpec::new("phase-3", 1.0, 1.0),
            ],
            distance_sentinel: 999_999.0,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn compression_factor(&self, category: EvolvedCategory) -> Option<u32> {
        self.compression_factors.get(&category).copied()
    }

    pub fn representative_code(&self, category: EvolvedCategory) -> Option<&LandCode> {
        self.representative_codes.get(&category)
    }

    pub fn type_label(&self, code: &LandCode) -> Option<&str> {
        self.type_labels.get(code).map(String::as_str)
    }

    pub fn is_replaceable_urban(&self, code: &LandCode) -> bool {
        self.codes.low_priority_urban.contains(code) || self.codes.high_priority_urban.contains(code)
    }

    /// Codes whose land counts as grazing once it exists on an island
    ///
    /// The base grazing set, plus the representative codes of the grazing
    /// categories, plus the demolished code.
    pub fn grazing_codes(&self) -> BTreeSet<LandCode> {
        let mut codes = self.codes.base_grazing.clone();
        for category in &self.grazing_categories {
            if let Some(code) = self.representative_code(*category) {
                codes.insert(code.clone());
            }
        }
        codes.insert(self.demolished_code.clone());
        codes
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_weights()?;
        self.validate_phases()?;
        self.validate_tables()?;

        if !(self.distance_sentinel.is_finite() && self.distance_sentinel > 0.0) {
            return Err(ConfigError::MalformedTable(format!(
                "distance sentinel must be a positive finite number, got {}",
                self.distance_sentinel
            )));
        }

        Ok(())
    }

    fn validate_weights(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        for (name, value) in [
            ("status", w.status),
            ("centroid", w.centroid),
            ("industrial", w.industrial),
        ] {
            if value < 0.0 || !value.is_finite() {
                return Err(ConfigError::NegativeWeight { name, value });
            }
        }

        let sum = w.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum { sum });
        }
        Ok(())
    }

    fn validate_phases(&self) -> Result<(), ConfigError> {
        if self.phases.is_empty() {
            return Err(ConfigError::NoPhases);
        }

        let mut previous = (0.0, 0.0);
        for phase in &self.phases {
            for (field, value, prev) in [
                ("migration", phase.migration, previous.0),
                ("demolition", phase.demolition, previous.1),
            ] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::RatioOutOfRange {
                        phase: phase.label.clone(),
                        field,
                        value,
                    });
                }
                if value < prev {
                    return Err(ConfigError::RatioDecreasing {
                        phase: phase.label.clone(),
                        field,
                        value,
                        previous: prev,
                    });
                }
            }
            previous = (phase.migration, phase.demolition);
        }
        Ok(())
    }

    fn validate_tables(&self) -> Result<(), ConfigError> {
        if self.compression_factors.is_empty() {
            return Err(ConfigError::MalformedTable(
                "compression factor table is empty".into(),
            ));
        }

        for category in self.compression_factors.keys() {
            if !self.representative_codes.contains_key(category) {
                return Err(ConfigError::MissingRepresentativeCode(*category));
            }
        }

        for (code, rule) in &self.source_rules {
            let categories = match rule {
                SourceRule::Fixed { category } => vec![*category],
                SourceRule::Split {
                    primary,
                    secondary,
                    primary_share,
                } => {
                    if !(0.0..=1.0).contains(primary_share) {
                        return Err(ConfigError::MalformedTable(format!(
                            "split share {} for code {} is outside [0, 1]",
                            primary_share, code
                        )));
                    }
                    vec![*primary, *secondary]
                }
            };
            for category in categories {
                if !self.compression_factors.contains_key(&category) {
                    return Err(ConfigError::UnknownCategory {
                        code: code.clone(),
                        category,
                    });
                }
            }
        }

        if let Some(code) = self
            .codes
            .low_priority_urban
            .intersection(&self.codes.high_priority_urban)
            .next()
        {
            return Err(ConfigError::MalformedTable(format!(
                "code {} is both low- and high-priority urban",
                code
            )));
        }

        for category in &self.grazing_categories {
            if !self.compression_factors.contains_key(category) {
                return Err(ConfigError::MalformedTable(format!(
                    "grazing category {} is not a configured evolved category",
                    category
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut config = SimulationConfig::default();
        config.weights.industrial = 0.3;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WeightSum { .. })
        ));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = SimulationConfig::default();
        config.weights = SuitabilityWeights {
            status: 1.2,
            centroid: -0.2,
            industrial: 0.0,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeWeight { name: "centroid", .. })
        ));
    }

    #[test]
    fn test_empty_phases_rejected() {
        let mut config = SimulationConfig::default();
        config.phases.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoPhases)));
    }

    #[test]
    fn test_decreasing_ratio_rejected() {
        let mut config = SimulationConfig::default();
        config.phases = vec![
            PhaseSpec::new("a", 0.6, 0.2),
            PhaseSpec::new("b", 0.5, 0.4),
        ];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RatioDecreasing { field: "migration", .. })
        ));
    }

    #[test]
    fn test_ratio_out_of_range_rejected() {
        let mut config = SimulationConfig::default();
        config.phases = vec![PhaseSpec::new("a", 0.5, 1.5)];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RatioOutOfRange { field: "demolition", .. })
        ));
    }

    #[test]
    fn test_rule_with_unknown_category_rejected() {
        let mut config = SimulationConfig::default();
        config.compression_factors.remove(&EvolvedCategory::Forest);
        config.representative_codes.remove(&EvolvedCategory::Forest);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_overlapping_urban_sets_rejected() {
        let mut config = SimulationConfig::default();
        config.codes.low_priority_urban.insert(LandCode::from("121"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MalformedTable(_))
        ));
    }

    #[test]
    fn test_grazing_codes_include_evolved_and_demolished() {
        let config = SimulationConfig::default();
        let codes = config.grazing_codes();
        for code in ["251", "411", "423", "623"] {
            assert!(codes.contains(&LandCode::from(code)));
        }
        assert!(!codes.contains(&LandCode::from("331")));
        assert!(!codes.contains(&LandCode::from("211")));
    }

    #[test]
    fn test_toml_overrides_keep_defaults() {
        let toml = r#"
            seed = 7

            [weights]
            status = 0.6
            centroid = 0.2
            industrial = 0.2

            [compression_factors]
            AG-FC = 25
            AG-LV = 100
            AG-FV = 100
            LS = 2
            FR = 30
            NGRASS_Grazing = 1

            [[phases]]
            label = "2035"
            migration = 0.4
            demolition = 0.3

            [[phases]]
            label = "2050"
            migration = 1.0
            demolition = 1.0
        "#;
        let config = SimulationConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.weights.status, 0.6);
        assert_eq!(config.phases.len(), 2);
        assert_eq!(config.phases[0].label, "2035");
        assert_eq!(config.compression_factor(EvolvedCategory::FoodCrop), Some(25));
        assert_eq!(config.codes.industrial.len(), 1);
    }

    #[test]
    fn test_toml_split_rule() {
        let toml = r#"
            [source_rules]
            221 = { kind = "split", primary = "AG-LV", secondary = "AG-FV", primary_share = 0.6 }
            211 = { kind = "fixed", category = "AG-FC" }
        "#;
        let config = SimulationConfig::from_toml_str(toml).unwrap();
        assert_eq!(
            config.source_rules.get(&LandCode::from("221")),
            Some(&SourceRule::Split {
                primary: EvolvedCategory::LivestockFeed,
                secondary: EvolvedCategory::FruitVegetable,
                primary_share: 0.6,
            })
        );
        assert_eq!(config.source_rules.len(), 2);
    }

    #[test]
    fn test_invalid_toml_weights_fail() {
        let toml = r#"
            [weights]
            status = 0.9
        "#;
        assert!(matches!(
            SimulationConfig::from_toml_str(toml),
            Err(ConfigError::WeightSum { .. })
        ));
    }
}
