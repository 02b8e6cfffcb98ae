//! Climate Tier Classification
//!
//! 6-tier Köppen climate grouping. Every plant carries one membership flag per
//! tier (a plant may belong to several); guilds are scored and calibrated
//! against a single target tier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Climate tier groupings (one boolean column per tier in the plant table)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClimateTier {
    /// Tier 1: Tropical (Af, Am, As, Aw)
    #[serde(rename = "tier_1_tropical")]
    Tropical,

    /// Tier 2: Mediterranean (Csa, Csb, Csc)
    #[serde(rename = "tier_2_mediterranean")]
    Mediterranean,

    /// Tier 3: Humid Temperate (Cfa, Cfb, Cfc, Cwa, Cwb, Cwc)
    #[serde(rename = "tier_3_humid_temperate")]
    HumidTemperate,

    /// Tier 4: Continental (Dfa, Dfb, Dsa, Dsb, Dwa, Dwb)
    #[serde(rename = "tier_4_continental")]
    Continental,

    /// Tier 5: Boreal/Polar (Dfc, Dfd, Dwc, Dwd, ET, EF)
    #[serde(rename = "tier_5_boreal_polar")]
    BorealPolar,

    /// Tier 6: Arid (BWh, BWk, BSh, BSk)
    #[serde(rename = "tier_6_arid")]
    Arid,
}

impl ClimateTier {
    pub const ALL: [ClimateTier; 6] = [
        ClimateTier::Tropical,
        ClimateTier::Mediterranean,
        ClimateTier::HumidTemperate,
        ClimateTier::Continental,
        ClimateTier::BorealPolar,
        ClimateTier::Arid,
    ];

    /// Convert Köppen zone code to climate tier
    pub fn from_koppen(zone: &str) -> Option<Self> {
        let zone = zone.trim();
        let mut chars = zone.chars();

        match chars.next()? {
            'A' => Some(ClimateTier::Tropical),
            'B' => Some(ClimateTier::Arid),
            'C' => {
                // Mediterranean (Cs*) vs Humid Temperate (Cf*, Cw*)
                if chars.next() == Some('s') {
                    Some(ClimateTier::Mediterranean)
                } else {
                    Some(ClimateTier::HumidTemperate)
                }
            }
            'D' => {
                // Dfc, Dfd, Dwc, Dwd = Boreal; remaining D zones = Continental
                match zone.chars().nth(2) {
                    Some('c') | Some('d') => Some(ClimateTier::BorealPolar),
                    _ => Some(ClimateTier::Continental),
                }
            }
            'E' => Some(ClimateTier::BorealPolar),
            _ => None,
        }
    }

    /// Tier column name used in the plant trait table
    pub fn column(&self) -> &'static str {
        match self {
            ClimateTier::Tropical => "tier_1_tropical",
            ClimateTier::Mediterranean => "tier_2_mediterranean",
            ClimateTier::HumidTemperate => "tier_3_humid_temperate",
            ClimateTier::Continental => "tier_4_continental",
            ClimateTier::BorealPolar => "tier_5_boreal_polar",
            ClimateTier::Arid => "tier_6_arid",
        }
    }

    /// Friendly name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            ClimateTier::Tropical => "Tropical",
            ClimateTier::Mediterranean => "Mediterranean",
            ClimateTier::HumidTemperate => "Humid Temperate",
            ClimateTier::Continental => "Continental",
            ClimateTier::BorealPolar => "Boreal/Polar",
            ClimateTier::Arid => "Arid",
        }
    }

    /// Position of this tier in [`ClimateTier::ALL`]
    pub fn index(&self) -> usize {
        match self {
            ClimateTier::Tropical => 0,
            ClimateTier::Mediterranean => 1,
            ClimateTier::HumidTemperate => 2,
            ClimateTier::Continental => 3,
            ClimateTier::BorealPolar => 4,
            ClimateTier::Arid => 5,
        }
    }
}

impl fmt::Display for ClimateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for ClimateTier {
    type Err = String;

    /// Accepts tier column names (`tier_3_humid_temperate`), short forms
    /// (`humid_temperate`, `3`) or a Köppen zone code (`Cfb`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();

        for tier in ClimateTier::ALL {
            let column = tier.column();
            // "tier_3_humid_temperate" -> "humid_temperate"
            let short = column.splitn(3, '_').nth(2).unwrap_or(column);
            let number = (tier.index() + 1).to_string();
            if lower == column || lower == short || lower == number {
                return Ok(tier);
            }
        }

        ClimateTier::from_koppen(trimmed).ok_or_else(|| format!("unknown climate tier '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_koppen_mapping() {
        assert_eq!(ClimateTier::from_koppen("Af"), Some(ClimateTier::Tropical));
        assert_eq!(ClimateTier::from_koppen("Csb"), Some(ClimateTier::Mediterranean));
        assert_eq!(ClimateTier::from_koppen("Cfb"), Some(ClimateTier::HumidTemperate));
        assert_eq!(ClimateTier::from_koppen("Dfb"), Some(ClimateTier::Continental));
        assert_eq!(ClimateTier::from_koppen("Dfc"), Some(ClimateTier::BorealPolar));
        assert_eq!(ClimateTier::from_koppen("ET"), Some(ClimateTier::BorealPolar));
        assert_eq!(ClimateTier::from_koppen("BSk"), Some(ClimateTier::Arid));
        assert_eq!(ClimateTier::from_koppen("X"), None);
    }

    #[test]
    fn test_parse_tier_names() {
        assert_eq!("tier_3_humid_temperate".parse(), Ok(ClimateTier::HumidTemperate));
        assert_eq!("boreal_polar".parse(), Ok(ClimateTier::BorealPolar));
        assert_eq!("6".parse(), Ok(ClimateTier::Arid));
        assert_eq!("Csa".parse(), Ok(ClimateTier::Mediterranean));
        assert!("nowhere".parse::<ClimateTier>().is_err());
    }

    #[test]
    fn test_serde_uses_column_names() {
        let json = serde_json::to_string(&ClimateTier::Continental).unwrap();
        assert_eq!(json, "\"tier_4_continental\"");
        let back: ClimateTier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ClimateTier::Continental);
    }
}
