//! Stdin payload framing.
//!
//! The payload is every line up to (excluding) the first empty line, or up to
//! end of stream. Lines are concatenated without separators; only the line
//! terminator (`\n` or `\r\n`) is removed from each line.

use std::io::BufRead;

use sha2::{Digest, Sha256};

use crate::error::HarnessError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEnd {
    BlankLine,
    EndOfStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    ReadLine,
    Done(FrameEnd),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInput {
    pub text: String,
    pub lines: usize,
    pub end: FrameEnd,
}

impl RawInput {
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

pub fn read_payload(mut reader: impl BufRead) -> Result<RawInput, HarnessError> {
    let mut state = FrameState::ReadLine;
    let mut payload = Vec::new();
    let mut line = Vec::new();
    let mut lines = 0usize;

    let end = loop {
        match state {
            FrameState::ReadLine => {
                line.clear();
                if reader.read_until(b'\n', &mut line)? == 0 {
                    state = FrameState::Done(FrameEnd::EndOfStream);
                    continue;
                }
                strip_terminator(&mut line);
                if line.is_empty() {
                    state = FrameState::Done(FrameEnd::BlankLine);
                } else {
                    payload.extend_from_slice(&line);
                    lines += 1;
                }
            }
            FrameState::Done(end) => break end,
        }
    };

    let text = String::from_utf8(payload)
        .map_err(|error| HarnessError::payload_decode(format!("payload is not valid UTF-8: {error}")))?;

    Ok(RawInput { text, lines, end })
}

fn strip_terminator(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}
