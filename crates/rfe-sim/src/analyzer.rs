//! Virtual analyzer simulation
//!
//! Provides a simulated RF Explorer that answers framed commands with a
//! protocol-accurate configuration dump.

use std::collections::VecDeque;

use rfe_protocol::frame::{CONFIG_REQUEST, CORRUPTION_MARKER, STOP_STREAMING};
use rfe_protocol::SweepSettings;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Device identity and settings reported in the configuration dump
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerProfile {
    /// Greeting line, without the line ending
    pub greeting: String,
    /// Mainboard serial number
    pub mainboard_sn: String,
    /// Expansion serial number, `None` when no module is fitted
    pub expansion_sn: Option<String>,
    /// Mainboard model code
    pub main_model: i64,
    /// Expansion model code (255 for none)
    pub expansion_model: i64,
    /// Firmware version string
    pub firmware: String,
    /// Raw bytes sent after `#CAL:`
    pub calibration: [u8; 2],
    /// Sweep and display settings
    pub sweep: SweepSettings,
    /// Active input stage
    pub input_stage: i64,
}

impl Default for AnalyzerProfile {
    fn default() -> Self {
        Self {
            greeting: "RF Explorer 01.12B26".to_string(),
            mainboard_sn: "B3AKB8AFCBBAAAE6".to_string(),
            expansion_sn: Some("C5AKB8AFCBBAAAE7".to_string()),
            main_model: 3,
            expansion_model: 5,
            firmware: "01.12B26".to_string(),
            calibration: [1, 1],
            sweep: SweepSettings::from_fields([
                5000, 196428, -10, -120, 112, 1, 0, 50, 6000, 5950, 110, 0, 0,
            ]),
            input_stage: 0,
        }
    }
}

/// A simulated analyzer that produces protocol-accurate output
#[derive(Debug)]
pub struct VirtualAnalyzer {
    profile: AnalyzerProfile,
    /// Lines inserted just before the terminal `#a` record
    extra_lines: Vec<Vec<u8>>,
    /// Garbage prepended, with a corruption marker, to the first metadata line
    torn_prefix: Option<Vec<u8>>,
    /// Whether the terminal `#a` record is sent
    send_terminal: bool,
    streaming: bool,
    commands: Vec<String>,
    pending_output: VecDeque<Vec<u8>>,
}

impl VirtualAnalyzer {
    /// Create a virtual analyzer with the default profile
    pub fn new() -> Self {
        Self::from_profile(AnalyzerProfile::default())
    }

    /// Create a virtual analyzer from a profile
    pub fn from_profile(profile: AnalyzerProfile) -> Self {
        Self {
            profile,
            extra_lines: Vec::new(),
            torn_prefix: None,
            send_terminal: true,
            streaming: false,
            commands: Vec::new(),
            pending_output: VecDeque::new(),
        }
    }

    /// Get the device profile
    pub fn profile(&self) -> &AnalyzerProfile {
        &self.profile
    }

    /// Insert an arbitrary line before the terminal record
    pub fn inject_line(&mut self, line: impl Into<Vec<u8>>) {
        self.extra_lines.push(line.into());
    }

    /// Simulate a torn earlier transmission in front of the first metadata line
    pub fn tear_first_record(&mut self, garbage: impl Into<Vec<u8>>) {
        self.torn_prefix = Some(garbage.into());
    }

    /// Control whether the terminal `#a` record is ever sent
    pub fn set_send_terminal(&mut self, send: bool) {
        self.send_terminal = send;
    }

    /// True between a config request and a stop command
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// All commands received, in order
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Number of times a given command was received
    pub fn command_count(&self, command: &str) -> usize {
        self.commands.iter().filter(|c| *c == command).count()
    }

    /// Handle one decoded command
    pub fn process_command(&mut self, command: &str) {
        debug!("Virtual analyzer received {:?}", command);
        self.commands.push(command.to_string());

        match command {
            CONFIG_REQUEST => {
                self.streaming = true;
                for line in self.config_dump() {
                    self.pending_output.push_back(line);
                }
            }
            STOP_STREAMING => self.streaming = false,
            other => debug!("Virtual analyzer ignoring {:?}", other),
        }
    }

    /// The configuration dump lines for the current profile
    pub fn config_dump(&self) -> Vec<Vec<u8>> {
        let p = &self.profile;
        let s = &p.sweep;

        let mut lines = vec![format!("{}\r\n", p.greeting).into_bytes()];

        let mut models =
            format!("#C2-M:{:03},{:03},{}\r\n", p.main_model, p.expansion_model, p.firmware)
                .into_bytes();
        if let Some(garbage) = &self.torn_prefix {
            let mut torn = garbage.clone();
            torn.extend_from_slice(&CORRUPTION_MARKER);
            torn.append(&mut models);
            models = torn;
        }
        lines.push(models);

        lines.push(
            format!(
                "#C2-F:{:07},{:07},{:04},{:04},{:04},{},{:03},{:07},{:07},{:07},{:05},{:04},{:03}\r\n",
                s.start_frequency,
                s.frequency_step,
                s.display_max,
                s.display_min,
                s.number_points,
                u8::from(s.is_expansion_active),
                s.current_mode,
                s.min_frequency,
                s.max_frequency,
                s.max_span,
                s.resolution_bandwidth,
                s.manual_offset,
                s.calculator_mode,
            )
            .into_bytes(),
        );

        let mut cal = b"#CAL:".to_vec();
        cal.extend_from_slice(&p.calibration);
        cal.extend_from_slice(b"\r\n");
        lines.push(cal);

        lines.push(format!("#Sn{}\r\n", p.mainboard_sn).into_bytes());
        if let Some(sn) = &p.expansion_sn {
            lines.push(format!("#Se{}\r\n", sn).into_bytes());
        }

        lines.extend(self.extra_lines.iter().cloned());

        if self.send_terminal {
            lines.push(format!("#a{}\r\n", p.input_stage).into_bytes());
        }
        lines
    }

    /// Take the next pending output line
    pub fn take_output(&mut self) -> Option<Vec<u8>> {
        self.pending_output.pop_front()
    }

    /// Check if there is pending output
    pub fn has_output(&self) -> bool {
        !self.pending_output.is_empty()
    }
}

impl Default for VirtualAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfe_protocol::{classify, metadata, LineCategory, MetadataRecord};

    #[test]
    fn test_config_request_queues_dump() {
        let mut analyzer = VirtualAnalyzer::new();
        assert!(!analyzer.has_output());

        analyzer.process_command("C0");
        assert!(analyzer.is_streaming());

        let first = analyzer.take_output().unwrap();
        assert_eq!(classify(&first), LineCategory::Greeting);

        let mut last = Vec::new();
        while let Some(line) = analyzer.take_output() {
            last = line;
        }
        assert_eq!(last, b"#a0\r\n");
    }

    #[test]
    fn test_stop_command() {
        let mut analyzer = VirtualAnalyzer::new();
        analyzer.process_command("C0");
        analyzer.process_command("CH");

        assert!(!analyzer.is_streaming());
        assert_eq!(analyzer.command_count("CH"), 1);
        assert_eq!(analyzer.commands(), &["C0".to_string(), "CH".to_string()]);
    }

    #[test]
    fn test_dump_records_decode() {
        let analyzer = VirtualAnalyzer::new();
        let dump = analyzer.config_dump();

        let sweep = dump
            .iter()
            .find(|l| l.starts_with(b"#C2-F:"))
            .map(|l| metadata::decode(l).unwrap())
            .unwrap();
        assert_eq!(sweep, MetadataRecord::Sweep(analyzer.profile().sweep));

        let models = dump
            .iter()
            .find(|l| l.starts_with(b"#C2-M:"))
            .map(|l| metadata::decode(l).unwrap())
            .unwrap();
        assert_eq!(
            models,
            MetadataRecord::Models {
                main: 3,
                expansion: 5,
                firmware: "01.12B26".into()
            }
        );
    }

    #[test]
    fn test_no_expansion_omits_serial() {
        let profile = AnalyzerProfile {
            expansion_sn: None,
            expansion_model: 255,
            ..Default::default()
        };
        let analyzer = VirtualAnalyzer::from_profile(profile);
        assert!(!analyzer
            .config_dump()
            .iter()
            .any(|l| l.starts_with(b"#Se")));
    }

    #[test]
    fn test_torn_record_carries_marker() {
        let mut analyzer = VirtualAnalyzer::new();
        analyzer.tear_first_record(b"$\x01\x02".to_vec());

        let dump = analyzer.config_dump();
        assert!(dump[1]
            .windows(CORRUPTION_MARKER.len())
            .any(|w| w == CORRUPTION_MARKER));
    }

    #[test]
    fn test_terminal_suppressed() {
        let mut analyzer = VirtualAnalyzer::new();
        analyzer.set_send_terminal(false);
        assert!(!analyzer
            .config_dump()
            .iter()
            .any(|l| l.starts_with(b"#a")));
    }
}
