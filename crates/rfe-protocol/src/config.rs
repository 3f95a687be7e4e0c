//! Device configuration snapshot
//!
//! [`DeviceConfig`] accumulates the records of one configuration dump.
//! Every attribute starts unset and is only filled once the matching record
//! arrives, so an absent reading is never confused with a zero.

use std::fmt;

use crate::metadata::{MetadataRecord, SWEEP_FIELDS};
use crate::models::AnalyzerModel;

/// Sweep and display settings from a `#C2-F:` record
///
/// Field order matches the wire order of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SweepSettings {
    /// Sweep start frequency (kHz)
    pub start_frequency: i64,
    /// Step between sweep points (Hz)
    pub frequency_step: i64,
    /// Top of the amplitude display (dBm)
    pub display_max: i64,
    /// Bottom of the amplitude display (dBm)
    pub display_min: i64,
    /// Number of points per sweep
    pub number_points: i64,
    /// Whether the expansion module is the active input
    pub is_expansion_active: bool,
    /// Current operating mode code
    pub current_mode: i64,
    /// Lowest frequency supported by the active module (kHz)
    pub min_frequency: i64,
    /// Highest frequency supported by the active module (kHz)
    pub max_frequency: i64,
    /// Widest span supported by the active module (kHz)
    pub max_span: i64,
    /// Resolution bandwidth (kHz)
    pub resolution_bandwidth: i64,
    /// Manual amplitude offset (dB)
    pub manual_offset: i64,
    /// Calculator mode code
    pub calculator_mode: i64,
}

impl SweepSettings {
    /// Build from the record's integer fields in wire order
    pub fn from_fields(f: [i64; SWEEP_FIELDS]) -> Self {
        Self {
            start_frequency: f[0],
            frequency_step: f[1],
            display_max: f[2],
            display_min: f[3],
            number_points: f[4],
            is_expansion_active: f[5] != 0,
            current_mode: f[6],
            min_frequency: f[7],
            max_frequency: f[8],
            max_span: f[9],
            resolution_bandwidth: f[10],
            manual_offset: f[11],
            calculator_mode: f[12],
        }
    }

    /// Sweep end frequency in kHz, derived from start, step and point count
    ///
    /// `None` when the device-reported values overflow.
    pub fn end_frequency(&self) -> Option<i64> {
        let steps = self.number_points.checked_sub(1)?.max(0);
        let span_hz = self.frequency_step.checked_mul(steps)?;
        self.start_frequency.checked_add(span_hz / 1000)
    }
}

/// Accumulated device configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceConfig {
    /// Greeting line, trimmed
    pub greeting: Option<String>,
    /// Mainboard serial number
    pub mainboard_sn: Option<String>,
    /// Expansion module serial number
    pub expansion_sn: Option<String>,
    /// Active input stage
    pub input_stage: Option<i64>,
    /// Mainboard calibration data available
    pub is_mainboard_calibration_available: Option<bool>,
    /// Expansion module calibration data available
    pub is_expansion_calibration_available: Option<bool>,
    /// Mainboard model code
    pub main_model: Option<i64>,
    /// Expansion module model code
    pub expansion_model: Option<i64>,
    /// Firmware version string
    pub firmware: Option<String>,
    /// Sweep and display settings
    pub sweep: Option<SweepSettings>,
}

impl DeviceConfig {
    /// Create an empty configuration with every attribute unset
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the greeting line
    pub fn set_greeting(&mut self, line: &[u8]) {
        self.greeting = Some(String::from_utf8_lossy(line).trim().to_string());
    }

    /// Fold a decoded record into the configuration
    ///
    /// A repeated record replaces the earlier value. Opaque and
    /// unrecognized records leave the configuration untouched.
    pub fn apply(&mut self, record: &MetadataRecord) {
        match record {
            MetadataRecord::InputStage(stage) => self.input_stage = Some(*stage),
            MetadataRecord::MainboardSerial(sn) => self.mainboard_sn = Some(sn.clone()),
            MetadataRecord::ExpansionSerial(sn) => self.expansion_sn = Some(sn.clone()),
            MetadataRecord::Calibration {
                mainboard,
                expansion,
            } => {
                self.is_mainboard_calibration_available = Some(*mainboard);
                self.is_expansion_calibration_available = Some(*expansion);
            }
            MetadataRecord::Models {
                main,
                expansion,
                firmware,
            } => {
                self.main_model = Some(*main);
                self.expansion_model = Some(*expansion);
                self.firmware = Some(firmware.clone());
            }
            MetadataRecord::Sweep(sweep) => self.sweep = Some(*sweep),
            MetadataRecord::QaReport
            | MetadataRecord::Battery
            | MetadataRecord::Lflo5
            | MetadataRecord::Unrecognized { .. } => {}
        }
    }

    /// Named mainboard model, if the model record has been seen
    pub fn main_model_kind(&self) -> Option<AnalyzerModel> {
        self.main_model.map(AnalyzerModel::from_code)
    }

    /// Named expansion model, if the model record has been seen
    pub fn expansion_model_kind(&self) -> Option<AnalyzerModel> {
        self.expansion_model.map(AnalyzerModel::from_code)
    }

    /// True if an expansion module is fitted
    pub fn has_expansion(&self) -> bool {
        matches!(
            self.expansion_model_kind(),
            Some(kind) if kind != AnalyzerModel::None
        )
    }
}

impl fmt::Display for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_unset(value: &Option<String>) -> &str {
            value.as_deref().unwrap_or("(unknown)")
        }

        writeln!(f, "{}", or_unset(&self.greeting))?;
        writeln!(f, "Mainboard S/N: {}", or_unset(&self.mainboard_sn))?;
        write!(f, "Expansion S/N: {}", or_unset(&self.expansion_sn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sweep() -> SweepSettings {
        SweepSettings::from_fields([100, 25, 0, -120, 112, 0, 1, 50, 6000, 600, 3, 0, 0])
    }

    #[test]
    fn test_new_config_is_unset() {
        let config = DeviceConfig::new();
        assert_eq!(config.mainboard_sn, None);
        assert_eq!(config.input_stage, None);
        assert_eq!(config.sweep, None);
        assert!(!config.has_expansion());
    }

    #[test]
    fn test_apply_serials_and_stage() {
        let mut config = DeviceConfig::new();
        config.apply(&MetadataRecord::MainboardSerial("1234".into()));
        config.apply(&MetadataRecord::ExpansionSerial("5678".into()));
        config.apply(&MetadataRecord::InputStage(0));

        assert_eq!(config.mainboard_sn.as_deref(), Some("1234"));
        assert_eq!(config.expansion_sn.as_deref(), Some("5678"));
        assert_eq!(config.input_stage, Some(0));
    }

    #[test]
    fn test_apply_repeat_overwrites() {
        let mut config = DeviceConfig::new();
        config.apply(&MetadataRecord::MainboardSerial("1111".into()));
        config.apply(&MetadataRecord::MainboardSerial("2222".into()));
        assert_eq!(config.mainboard_sn.as_deref(), Some("2222"));
    }

    #[test]
    fn test_apply_opaque_records_do_nothing() {
        let mut config = DeviceConfig::new();
        config.apply(&MetadataRecord::QaReport);
        config.apply(&MetadataRecord::Battery);
        config.apply(&MetadataRecord::Lflo5);
        config.apply(&MetadataRecord::Unrecognized {
            raw: b"#ZZtest".to_vec(),
            invalid_text: false,
        });
        assert_eq!(config, DeviceConfig::new());
    }

    #[test]
    fn test_apply_models_and_sweep() {
        let mut config = DeviceConfig::new();
        config.apply(&MetadataRecord::Models {
            main: 3,
            expansion: 5,
            firmware: "01.12".into(),
        });
        config.apply(&MetadataRecord::Sweep(sample_sweep()));

        assert_eq!(config.main_model_kind(), Some(AnalyzerModel::Wsub1g));
        assert_eq!(config.expansion_model_kind(), Some(AnalyzerModel::Wsub3g));
        assert!(config.has_expansion());
        assert_eq!(config.firmware.as_deref(), Some("01.12"));
        assert_eq!(config.sweep.map(|s| s.number_points), Some(112));
    }

    #[test]
    fn test_no_expansion_fitted() {
        let mut config = DeviceConfig::new();
        config.apply(&MetadataRecord::Models {
            main: 4,
            expansion: 255,
            firmware: "01.12".into(),
        });
        assert!(!config.has_expansion());
    }

    #[test]
    fn test_greeting_trimmed() {
        let mut config = DeviceConfig::new();
        config.set_greeting(b"RF Explorer 1.12\r\n");
        assert_eq!(config.greeting.as_deref(), Some("RF Explorer 1.12"));
    }

    #[test]
    fn test_display() {
        let mut config = DeviceConfig::new();
        config.set_greeting(b"RF Explorer\r\n");
        config.apply(&MetadataRecord::MainboardSerial("1234".into()));

        assert_eq!(
            config.to_string(),
            "RF Explorer\nMainboard S/N: 1234\nExpansion S/N: (unknown)"
        );
    }

    #[test]
    fn test_sweep_end_frequency() {
        let sweep = SweepSettings::from_fields([
            5000, 196428, -10, -120, 112, 1, 0, 50, 6000, 5950, 110, 0, 0,
        ]);
        // 5000 kHz + 111 * 196.428 kHz
        assert_eq!(sweep.end_frequency(), Some(26803));
        assert_eq!(sample_sweep().end_frequency(), Some(102));
    }

    #[test]
    fn test_sweep_end_frequency_overflow() {
        let sweep = SweepSettings::from_fields([
            1,
            9_999_999_999_999,
            0,
            0,
            9_999_999,
            0,
            0,
            0,
            0,
            0,
            0,
            0,
            0,
        ]);
        assert_eq!(sweep.end_frequency(), None);

        let sweep = SweepSettings::from_fields([i64::MAX, 1000, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(sweep.end_frequency(), None);

        let sweep = SweepSettings::from_fields([0, 1, 0, 0, i64::MIN, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(sweep.end_frequency(), None);
    }
}
