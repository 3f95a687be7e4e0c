//! Analyzer model codes
//!
//! The `#C2-M:` record reports the mainboard and expansion module as numeric
//! model codes. This module maps those codes to named models.

use std::fmt;

/// Known RF Explorer analyzer modules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnalyzerModel {
    /// 433 MHz band module
    M433,
    /// 868 MHz band module
    M868,
    /// 915 MHz band module
    M915,
    /// Wideband sub-1 GHz module
    Wsub1g,
    /// 2.4 GHz band module
    M2400,
    /// Wideband sub-3 GHz module
    Wsub3g,
    /// 6 GHz module
    M6g,
    /// Wideband sub-1 GHz Plus module
    Wsub1gPlus,
    /// Audio Pro module
    AudioPro,
    /// 2.4 GHz Plus module
    M2400Plus,
    /// 4 GHz Plus module
    M4gPlus,
    /// 6 GHz Plus module
    M6gPlus,
    /// Signal generator mainboard
    RfGen,
    /// Signal generator expansion
    RfGenExpansion,
    /// No module fitted
    None,
    /// Code not in the table
    Unknown(i64),
}

impl AnalyzerModel {
    /// Map a wire model code to a model
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => AnalyzerModel::M433,
            1 => AnalyzerModel::M868,
            2 => AnalyzerModel::M915,
            3 => AnalyzerModel::Wsub1g,
            4 => AnalyzerModel::M2400,
            5 => AnalyzerModel::Wsub3g,
            6 => AnalyzerModel::M6g,
            10 => AnalyzerModel::Wsub1gPlus,
            11 => AnalyzerModel::AudioPro,
            12 => AnalyzerModel::M2400Plus,
            13 => AnalyzerModel::M4gPlus,
            14 => AnalyzerModel::M6gPlus,
            60 => AnalyzerModel::RfGen,
            61 => AnalyzerModel::RfGenExpansion,
            255 => AnalyzerModel::None,
            other => AnalyzerModel::Unknown(other),
        }
    }

    /// Returns a human-readable name for the model
    pub fn name(&self) -> &'static str {
        match self {
            AnalyzerModel::M433 => "433M",
            AnalyzerModel::M868 => "868M",
            AnalyzerModel::M915 => "915M",
            AnalyzerModel::Wsub1g => "WSUB1G",
            AnalyzerModel::M2400 => "2.4G",
            AnalyzerModel::Wsub3g => "WSUB3G",
            AnalyzerModel::M6g => "6G",
            AnalyzerModel::Wsub1gPlus => "WSUB1G+",
            AnalyzerModel::AudioPro => "AudioPro",
            AnalyzerModel::M2400Plus => "2.4G+",
            AnalyzerModel::M4gPlus => "4G+",
            AnalyzerModel::M6gPlus => "6G+",
            AnalyzerModel::RfGen => "RFEGen",
            AnalyzerModel::RfGenExpansion => "RFEGen Expansion",
            AnalyzerModel::None => "none",
            AnalyzerModel::Unknown(_) => "unknown",
        }
    }

    /// True for the Plus line of modules
    pub fn is_plus(&self) -> bool {
        matches!(
            self,
            AnalyzerModel::Wsub1gPlus
                | AnalyzerModel::M2400Plus
                | AnalyzerModel::M4gPlus
                | AnalyzerModel::M6gPlus
        )
    }
}

impl fmt::Display for AnalyzerModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzerModel::Unknown(code) => write!(f, "unknown ({code})"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(AnalyzerModel::from_code(5), AnalyzerModel::Wsub3g);
        assert_eq!(AnalyzerModel::from_code(255), AnalyzerModel::None);
        assert_eq!(AnalyzerModel::from_code(42), AnalyzerModel::Unknown(42));
    }

    #[test]
    fn test_display() {
        assert_eq!(AnalyzerModel::M6g.to_string(), "6G");
        assert_eq!(AnalyzerModel::Unknown(7).to_string(), "unknown (7)");
    }

    #[test]
    fn test_is_plus() {
        assert!(AnalyzerModel::M6gPlus.is_plus());
        assert!(!AnalyzerModel::M6g.is_plus());
    }
}
