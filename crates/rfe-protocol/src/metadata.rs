//! Metadata record decoding
//!
//! Metadata lines start with `#` followed by a record prefix. Prefixes share
//! leading characters (`#Sn` / `#Se`, `#C2-M:` / `#C2-F:`), so they are
//! tested in a fixed order and the first match wins:
//!
//! | Prefix   | Record                                   |
//! |----------|------------------------------------------|
//! | `#a`     | input stage, ends the configuration dump |
//! | `#Sn`    | mainboard serial number                  |
//! | `#Se`    | expansion module serial number           |
//! | `#QA:`   | opaque                                   |
//! | `#CAL:`  | calibration availability flags           |
//! | `#BAT:`  | opaque                                   |
//! | `#C2-M:` | model codes and firmware version         |
//! | `#C2-F:` | sweep and display settings               |
//! | `#LFLO5` | opaque                                   |

use crate::config::SweepSettings;
use crate::error::ParseError;

/// Prefix of the input-stage record that terminates the config dump
pub const INPUT_STAGE_PREFIX: &[u8] = b"#a";

/// Number of comma-separated fields in a `#C2-M:` record
pub const MODEL_FIELDS: usize = 3;

/// Number of comma-separated fields in a `#C2-F:` record
pub const SWEEP_FIELDS: usize = 13;

/// Byte offsets of the calibration flags within a `#CAL:` line
///
/// These are offsets into the whole line, not into the payload after the
/// prefix, so the mainboard flag reads the `:` of the prefix itself. Kept
/// as observed on the wire until device documentation says otherwise.
const CAL_MAINBOARD_OFFSET: usize = 4;
const CAL_EXPANSION_OFFSET: usize = 5;

/// A decoded metadata record
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MetadataRecord {
    /// `#a<n>`: active input stage
    InputStage(i64),
    /// `#Sn<text>`: mainboard serial number
    MainboardSerial(String),
    /// `#Se<text>`: expansion module serial number
    ExpansionSerial(String),
    /// `#QA:...`: recognized, payload not interpreted
    QaReport,
    /// `#CAL:..`: calibration data availability
    Calibration { mainboard: bool, expansion: bool },
    /// `#BAT:...`: recognized, payload not interpreted
    Battery,
    /// `#C2-M:<main>,<expansion>,<firmware>`
    Models {
        main: i64,
        expansion: i64,
        firmware: String,
    },
    /// `#C2-F:<13 integers>`
    Sweep(SweepSettings),
    /// `#LFLO5...`: recognized, payload not interpreted
    Lflo5,
    /// Not decodable as a known record; carries the raw line
    ///
    /// `invalid_text` is set when the line could not be read as text, either
    /// with no known prefix or under a prefix whose payload is text.
    Unrecognized { raw: Vec<u8>, invalid_text: bool },
}

impl MetadataRecord {
    /// The wire prefix this record was decoded from
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            MetadataRecord::InputStage(_) => Some("#a"),
            MetadataRecord::MainboardSerial(_) => Some("#Sn"),
            MetadataRecord::ExpansionSerial(_) => Some("#Se"),
            MetadataRecord::QaReport => Some("#QA:"),
            MetadataRecord::Calibration { .. } => Some("#CAL:"),
            MetadataRecord::Battery => Some("#BAT:"),
            MetadataRecord::Models { .. } => Some("#C2-M:"),
            MetadataRecord::Sweep(_) => Some("#C2-F:"),
            MetadataRecord::Lflo5 => Some("#LFLO5"),
            MetadataRecord::Unrecognized { .. } => None,
        }
    }
}

type Decoder = fn(&[u8]) -> Result<MetadataRecord, ParseError>;

/// Record prefixes and their decoders, in match order
///
/// Each decoder receives the whole line (prefix included).
const DECODERS: &[(&str, Decoder)] = &[
    ("#a", decode_input_stage),
    ("#Sn", decode_mainboard_serial),
    ("#Se", decode_expansion_serial),
    ("#QA:", decode_qa_report),
    ("#CAL:", decode_calibration),
    ("#BAT:", decode_battery),
    ("#C2-M:", decode_models),
    ("#C2-F:", decode_sweep),
    ("#LFLO5", decode_lflo5),
];

/// Decode a metadata line
///
/// Lines matching no known prefix, and text records whose bytes are not
/// valid UTF-8, decode to [`MetadataRecord::Unrecognized`]. An error means a
/// known prefix matched but its payload was malformed.
pub fn decode(line: &[u8]) -> Result<MetadataRecord, ParseError> {
    for (prefix, decoder) in DECODERS {
        if line.starts_with(prefix.as_bytes()) {
            return match decoder(line) {
                Err(ParseError::InvalidText { .. }) => Ok(MetadataRecord::Unrecognized {
                    raw: line.to_vec(),
                    invalid_text: true,
                }),
                other => other,
            };
        }
    }
    Ok(MetadataRecord::Unrecognized {
        raw: line.to_vec(),
        invalid_text: std::str::from_utf8(line).is_err(),
    })
}

/// True if the line is the input-stage record that ends the config dump
pub fn is_terminal(line: &[u8]) -> bool {
    line.starts_with(INPUT_STAGE_PREFIX)
}

fn decode_input_stage(line: &[u8]) -> Result<MetadataRecord, ParseError> {
    let text = payload_text("#a", line)?;
    parse_int("#a", 0, text).map(MetadataRecord::InputStage)
}

fn decode_mainboard_serial(line: &[u8]) -> Result<MetadataRecord, ParseError> {
    let text = payload_text("#Sn", line)?;
    Ok(MetadataRecord::MainboardSerial(text.to_string()))
}

fn decode_expansion_serial(line: &[u8]) -> Result<MetadataRecord, ParseError> {
    let text = payload_text("#Se", line)?;
    Ok(MetadataRecord::ExpansionSerial(text.to_string()))
}

fn decode_qa_report(_line: &[u8]) -> Result<MetadataRecord, ParseError> {
    Ok(MetadataRecord::QaReport)
}

fn decode_battery(_line: &[u8]) -> Result<MetadataRecord, ParseError> {
    Ok(MetadataRecord::Battery)
}

fn decode_lflo5(_line: &[u8]) -> Result<MetadataRecord, ParseError> {
    Ok(MetadataRecord::Lflo5)
}

fn decode_calibration(line: &[u8]) -> Result<MetadataRecord, ParseError> {
    let flag = |offset: usize| {
        line.get(offset)
            .map(|&b| b != 0)
            .ok_or_else(|| ParseError::Truncated {
                record: "#CAL:".into(),
                needed: CAL_EXPANSION_OFFSET + 1,
                actual: line.len(),
            })
    };

    Ok(MetadataRecord::Calibration {
        mainboard: flag(CAL_MAINBOARD_OFFSET)?,
        expansion: flag(CAL_EXPANSION_OFFSET)?,
    })
}

fn decode_models(line: &[u8]) -> Result<MetadataRecord, ParseError> {
    let fields = split_fields("#C2-M:", line, MODEL_FIELDS)?;

    Ok(MetadataRecord::Models {
        main: parse_int("#C2-M:", 0, fields[0])?,
        expansion: parse_int("#C2-M:", 1, fields[1])?,
        firmware: fields[2].to_string(),
    })
}

fn decode_sweep(line: &[u8]) -> Result<MetadataRecord, ParseError> {
    let fields = split_fields("#C2-F:", line, SWEEP_FIELDS)?;

    let mut values = [0i64; SWEEP_FIELDS];
    for (index, field) in fields.iter().enumerate() {
        values[index] = parse_int("#C2-F:", index, field)?;
    }

    Ok(MetadataRecord::Sweep(SweepSettings::from_fields(values)))
}

/// Decode the text after `prefix`, trimmed of surrounding whitespace
fn payload_text<'a>(prefix: &str, line: &'a [u8]) -> Result<&'a str, ParseError> {
    std::str::from_utf8(&line[prefix.len()..])
        .map(str::trim)
        .map_err(|_| ParseError::InvalidText {
            record: prefix.into(),
        })
}

fn split_fields<'a>(
    prefix: &str,
    line: &'a [u8],
    expected: usize,
) -> Result<Vec<&'a str>, ParseError> {
    let fields: Vec<&str> = payload_text(prefix, line)?.split(',').collect();
    if fields.len() != expected {
        return Err(ParseError::FieldCount {
            record: prefix.into(),
            expected,
            actual: fields.len(),
        });
    }
    Ok(fields)
}

fn parse_int(prefix: &str, index: usize, field: &str) -> Result<i64, ParseError> {
    field
        .trim()
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidInteger {
            record: prefix.into(),
            index,
            value: field.to_string(),
        })
}
