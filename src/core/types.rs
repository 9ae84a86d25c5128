//! Core type definitions used throughout the codebase

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Unique identifier for a land unit, stable for the whole run
///
/// Source and target units live in separate id spaces; the id is the
/// originating parcel's feature id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
pub struct UnitId(pub u32);

/// Identifier of a zone (island) that scopes suitability normalization
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
pub struct ZoneId(pub u32);

/// Land-cover classification code of a parcel (e.g. "211")
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct LandCode(pub String);

impl LandCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for LandCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

/// New high-density land-use classes produced by consolidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EvolvedCategory {
    /// Consolidated food crops
    #[serde(rename = "AG-FC")]
    FoodCrop,
    /// Consolidated field crops for livestock feed
    #[serde(rename = "AG-LV")]
    LivestockFeed,
    /// Consolidated fruit and vegetables
    #[serde(rename = "AG-FV")]
    FruitVegetable,
    /// Livestock
    #[serde(rename = "LS")]
    Livestock,
    /// Forest
    #[serde(rename = "FR")]
    Forest,
    /// Natural grassland used for grazing
    #[serde(rename = "NGRASS_Grazing")]
    NaturalGrazing,
}

impl EvolvedCategory {
    pub const ALL: [EvolvedCategory; 6] = [
        EvolvedCategory::FoodCrop,
        EvolvedCategory::LivestockFeed,
        EvolvedCategory::FruitVegetable,
        EvolvedCategory::Livestock,
        EvolvedCategory::Forest,
        EvolvedCategory::NaturalGrazing,
    ];

    /// The category code written into a replaced unit's type label
    pub fn code(&self) -> &'static str {
        match self {
            EvolvedCategory::FoodCrop => "AG-FC",
            EvolvedCategory::LivestockFeed => "AG-LV",
            EvolvedCategory::FruitVegetable => "AG-FV",
            EvolvedCategory::Livestock => "LS",
            EvolvedCategory::Forest => "FR",
            EvolvedCategory::NaturalGrazing => "NGRASS_Grazing",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl std::fmt::Display for EvolvedCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_code_roundtrip() {
        for category in EvolvedCategory::ALL {
            assert_eq!(EvolvedCategory::from_code(category.code()), Some(category));
        }
        assert_eq!(EvolvedCategory::from_code("URB-Mixed"), None);
    }

    #[test]
    fn test_category_serde_uses_codes() {
        let json = serde_json::to_string(&EvolvedCategory::NaturalGrazing).unwrap();
        assert_eq!(json, "\"NGRASS_Grazing\"");
        let parsed: EvolvedCategory = serde_json::from_str("\"AG-FC\"").unwrap();
        assert_eq!(parsed, EvolvedCategory::FoodCrop);
    }

    #[test]
    fn test_ids_order_and_display() {
        assert!(UnitId(3) < UnitId(10));
        assert_eq!(UnitId(7).to_string(), "7");
        assert_eq!(LandCode::from("121").to_string(), "121");
        assert!(LandCode::new("  ").is_blank());
    }
}
