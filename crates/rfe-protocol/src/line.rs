//! Line classification
//!
//! Each line emitted by the analyzer is tagged by its first byte. Only
//! metadata (`#`) and greeting (`R`) lines carry configuration; the rest are
//! acknowledged and skipped during the configuration read.

/// Record category of one device line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineCategory {
    /// Free-text greeting: `R...`
    Greeting,
    /// Binary DSP marker: `D...`
    DspMarker,
    /// Metadata record: `#...`
    Metadata,
    /// Live sweep data: `$...`
    SweepData,
    /// Anything else, including empty lines
    Unknown,
}

impl LineCategory {
    /// Returns a human-readable name for the category
    pub fn name(&self) -> &'static str {
        match self {
            LineCategory::Greeting => "greeting",
            LineCategory::DspMarker => "DSP marker",
            LineCategory::Metadata => "metadata",
            LineCategory::SweepData => "sweep data",
            LineCategory::Unknown => "unknown",
        }
    }
}

/// Classify a line by its first byte
pub fn classify(line: &[u8]) -> LineCategory {
    match line.first() {
        Some(b'R') => LineCategory::Greeting,
        Some(b'D') => LineCategory::DspMarker,
        Some(b'#') => LineCategory::Metadata,
        Some(b'$') => LineCategory::SweepData,
        _ => LineCategory::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_prefixes() {
        assert_eq!(classify(b"RF Explorer 3.1\r\n"), LineCategory::Greeting);
        assert_eq!(classify(b"DSP:1\r\n"), LineCategory::DspMarker);
        assert_eq!(classify(b"#Sn1234"), LineCategory::Metadata);
        assert_eq!(classify(b"$S\x70\x01\x02"), LineCategory::SweepData);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify(b""), LineCategory::Unknown);
        assert_eq!(classify(b"\xFF\xFE"), LineCategory::Unknown);
        assert_eq!(classify(b"r lowercase"), LineCategory::Unknown);
        assert_eq!(classify(b"\r\n"), LineCategory::Unknown);
    }
}
