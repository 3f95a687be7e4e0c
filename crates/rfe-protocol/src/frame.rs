//! Command framing and corruption-marker recovery
//!
//! Commands sent to the analyzer are wrapped in a short frame:
//!
//! ```text
//! 0x23 ('#') | LEN | ASCII command
//! ```
//!
//! where `LEN` is a raw byte equal to the command length plus 2 (it is not
//! an ASCII digit, and is frequently non-printable).
//!
//! In the other direction the device may emit the marker `FF FE FF FE 00`
//! in the middle of a line when its previous transmission was cut short.
//! Everything before the marker is garbage from the torn transmission.

use crate::error::FrameError;

/// Frame start byte
pub const FRAME_START: u8 = b'#';

/// Bytes of framing added around the command (start byte + length byte)
pub const FRAME_OVERHEAD: usize = 2;

/// Longest command that still fits the single length byte
pub const MAX_COMMAND_LEN: usize = u8::MAX as usize - FRAME_OVERHEAD;

/// Marker emitted by the device when its last transmission ended early
pub const CORRUPTION_MARKER: [u8; 5] = [0xFF, 0xFE, 0xFF, 0xFE, 0x00];

/// Request the current configuration dump
pub const CONFIG_REQUEST: &str = "C0";

/// Stop streaming sweep data
pub const STOP_STREAMING: &str = "CH";

/// Encode an ASCII command into its wire frame
///
/// # Panics
///
/// Panics if the command is longer than [`MAX_COMMAND_LEN`] or is not
/// ASCII. Use [`try_encode_command`] for caller-supplied input.
pub fn encode_command(command: &str) -> Vec<u8> {
    match try_encode_command(command) {
        Ok(frame) => frame,
        Err(e) => panic!("cannot frame command: {e}"),
    }
}

/// Encode an ASCII command, rejecting commands that cannot be framed
pub fn try_encode_command(command: &str) -> Result<Vec<u8>, FrameError> {
    if !command.is_ascii() {
        return Err(FrameError::NonAsciiCommand(command.to_string()));
    }
    if command.len() > MAX_COMMAND_LEN {
        return Err(FrameError::CommandTooLong {
            len: command.len(),
            max: MAX_COMMAND_LEN,
        });
    }

    let mut frame = Vec::with_capacity(command.len() + FRAME_OVERHEAD);
    frame.push(FRAME_START);
    frame.push((command.len() + FRAME_OVERHEAD) as u8);
    frame.extend_from_slice(command.as_bytes());
    Ok(frame)
}

/// Decode one command frame from the start of `buf`
///
/// Returns `Ok(None)` if the buffer does not yet hold a complete frame,
/// otherwise the command text and the number of bytes consumed. This is the
/// device side of [`encode_command`].
pub fn decode_command(buf: &[u8]) -> Result<Option<(String, usize)>, FrameError> {
    let Some(&start) = buf.first() else {
        return Ok(None);
    };
    if start != FRAME_START {
        return Err(FrameError::InvalidStart(start));
    }
    let Some(&len) = buf.get(1) else {
        return Ok(None);
    };
    let total = len as usize;
    if total < FRAME_OVERHEAD {
        return Err(FrameError::InvalidLength(len));
    }
    if buf.len() < total {
        return Ok(None);
    }

    let command = &buf[FRAME_OVERHEAD..total];
    if !command.is_ascii() {
        return Err(FrameError::NonAsciiCommand(
            String::from_utf8_lossy(command).into_owned(),
        ));
    }
    Ok(Some((String::from_utf8_lossy(command).into_owned(), total)))
}

/// A received line after corruption-marker recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrippedLine<'a> {
    /// Bytes following the marker, or the whole line if no marker was found
    pub line: &'a [u8],
    /// Number of bytes dropped (torn prefix plus the marker itself)
    pub discarded: Option<usize>,
}

impl StrippedLine<'_> {
    /// True if a torn transmission was discarded from this line
    pub fn recovered(&self) -> bool {
        self.discarded.is_some()
    }
}

/// Find the corruption marker and drop everything up to and including it
pub fn strip_corruption_marker(line: &[u8]) -> StrippedLine<'_> {
    match find_marker(line) {
        Some(pos) => {
            let cut = pos + CORRUPTION_MARKER.len();
            tracing::warn!(
                "Last transmission was ended early, discarding {} bytes",
                cut
            );
            StrippedLine {
                line: &line[cut..],
                discarded: Some(cut),
            }
        }
        None => StrippedLine {
            line,
            discarded: None,
        },
    }
}

fn find_marker(line: &[u8]) -> Option<usize> {
    line.windows(CORRUPTION_MARKER.len())
        .position(|w| w == CORRUPTION_MARKER)
}
