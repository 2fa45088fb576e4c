//! Categories of sanctioned image edits

use crate::ParseEnumError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of adjustment an operator approved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditType {
    BrightnessAdjustment,
    ContrastAdjustment,
    GammaCorrection,
    BrightnessContrastCombo,
    Cropping,
    Other,
}

impl EditType {
    /// Every category, in menu order
    pub const ALL: [Self; 6] = [
        Self::BrightnessAdjustment,
        Self::ContrastAdjustment,
        Self::GammaCorrection,
        Self::BrightnessContrastCombo,
        Self::Cropping,
        Self::Other,
    ];

    /// Stable name used in the database and on the command line
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BrightnessAdjustment => "brightness_adjustment",
            Self::ContrastAdjustment => "contrast_adjustment",
            Self::GammaCorrection => "gamma_correction",
            Self::BrightnessContrastCombo => "brightness_contrast_combo",
            Self::Cropping => "cropping",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for EditType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("edit type", s))
    }
}

impl clap::ValueEnum for EditType {
    fn value_variants<'a>() -> &'a [Self] {
        &Self::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        let value = clap::builder::PossibleValue::new(self.as_str());
        Some(match self {
            Self::BrightnessAdjustment => value.alias("brightness"),
            Self::ContrastAdjustment => value.alias("contrast"),
            Self::GammaCorrection => value.alias("gamma"),
            Self::BrightnessContrastCombo => value.alias("combo"),
            Self::Cropping => value.alias("crop"),
            Self::Other => value,
        })
    }
}
