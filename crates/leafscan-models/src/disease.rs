//! Disease classes and treatment guidance.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Banana-leaf diseases the detector knows how to advise on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Disease {
    /// Fungal leaf-spot disease (Mycosphaerella fijiensis)
    BlackSigatoka,
    /// Soil-borne Panama disease (Fusarium oxysporum f. sp. cubense)
    FusariumWilt,
}

/// Treatment advice shown for a detected disease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreatmentGuidance {
    pub title: &'static str,
    pub treatments: &'static [&'static str],
}

const BLACK_SIGATOKA: TreatmentGuidance = TreatmentGuidance {
    title: "Black Sigatoka Solution",
    treatments: &[
        "Apply fungicides containing triazoles or strobilurins",
        "Remove and destroy infected leaves",
        "Improve air circulation by proper spacing",
        "Avoid overhead irrigation",
        "Use resistant banana varieties if available",
    ],
};

const FUSARIUM_WILT: TreatmentGuidance = TreatmentGuidance {
    title: "Fusarium Wilt Solution",
    treatments: &[
        "Use disease-free planting material",
        "Practice crop rotation with non-host crops",
        "Solarize soil to reduce pathogen levels",
        "Apply biological control agents like Trichoderma",
        "Remove and destroy infected plants immediately",
        "Avoid moving soil from infected to healthy areas",
    ],
};

impl Disease {
    /// All diseases, in guidance precedence order.
    pub const ALL: &'static [Disease] = &[Disease::BlackSigatoka, Disease::FusariumWilt];

    pub fn as_str(&self) -> &'static str {
        match self {
            Disease::BlackSigatoka => "black sigatoka",
            Disease::FusariumWilt => "fusarium wilt",
        }
    }

    /// Match a free-form model class label (case-insensitive substring).
    pub fn from_label(label: &str) -> Option<Disease> {
        let label = label.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|disease| label.contains(disease.as_str()))
    }

    pub fn guidance(&self) -> &'static TreatmentGuidance {
        match self {
            Disease::BlackSigatoka => &BLACK_SIGATOKA,
            Disease::FusariumWilt => &FUSARIUM_WILT,
        }
    }
}

impl fmt::Display for Disease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Disease {
    type Err = DiseaseParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', " ").as_str() {
            "black sigatoka" => Ok(Disease::BlackSigatoka),
            "fusarium wilt" => Ok(Disease::FusariumWilt),
            _ => Err(DiseaseParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown disease: {0}")]
pub struct DiseaseParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label() {
        assert_eq!(
            Disease::from_label("Black Sigatoka Disease"),
            Some(Disease::BlackSigatoka)
        );
        assert_eq!(Disease::from_label("fusarium wilt"), Some(Disease::FusariumWilt));
        assert_eq!(Disease::from_label("healthy leaf"), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("black_sigatoka".parse::<Disease>().unwrap(), Disease::BlackSigatoka);
        assert_eq!("Fusarium Wilt".parse::<Disease>().unwrap(), Disease::FusariumWilt);
        assert!("rust".parse::<Disease>().is_err());
    }

    #[test]
    fn test_guidance_lists() {
        assert_eq!(Disease::BlackSigatoka.guidance().treatments.len(), 5);
        assert_eq!(Disease::FusariumWilt.guidance().treatments.len(), 6);
    }
}
