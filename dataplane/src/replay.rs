// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Frames and telemetry to feed the dispatcher with, as text.
//!
//! One record per line. A frame is the gateway id, the ingress port and the frame as hex. A
//! telemetry sample starts with `stats`, followed by the gateway id, the port and the total
//! byte count of the port. Blank lines and lines starting with `#` are skipped.
//!
//! ```text
//! # gateway          port  frame
//! of:0000000000000001 3    02000000aa01020000000005080045...
//! stats of:0000000000000001 1 1250000
//! ```

use crate::dispatcher::Ingress;
use gateway::GatewayId;
use net::interface::PortId;
use std::path::Path;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ReplayError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("Line {line}: malformed record")]
    Syntax { line: usize },
    #[error("Line {line}: invalid byte count '{count}'")]
    Count { line: usize, count: String },
    #[error("Line {line}: invalid port '{port}'")]
    Port { line: usize, port: String },
    #[error("Line {line}: invalid frame: {error}")]
    Hex { line: usize, error: hex::FromHexError },
}

/// What a line holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A frame and where it was received
    Frame { ingress: Ingress, frame: Vec<u8> },
    /// The byte counter of a port
    Counters {
        gateway: GatewayId,
        port: PortId,
        total_bytes: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub line: usize,
    pub event: Event,
}

fn parse_port(line: usize, port: &str) -> Result<PortId, ReplayError> {
    port.parse::<PortId>().map_err(|_| ReplayError::Port {
        line,
        port: port.to_string(),
    })
}

fn parse_line(line: usize, text: &str) -> Result<Option<Recorded>, ReplayError> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }
    let fields: Vec<&str> = text.split_whitespace().collect();
    let event = match fields.as_slice() {
        ["stats", gateway, port, count] => Event::Counters {
            gateway: GatewayId::from(*gateway),
            port: parse_port(line, port)?,
            total_bytes: count.parse().map_err(|_| ReplayError::Count {
                line,
                count: (*count).to_string(),
            })?,
        },
        [gateway, port, frame] => Event::Frame {
            ingress: Ingress {
                gateway: GatewayId::from(*gateway),
                port: parse_port(line, port)?,
            },
            frame: hex::decode(frame).map_err(|error| ReplayError::Hex { line, error })?,
        },
        _ => return Err(ReplayError::Syntax { line }),
    };
    Ok(Some(Recorded { line, event }))
}

/// Parse recorded frames. Lines are numbered from 1.
///
/// # Errors
///
/// Fails on the first line that is neither a comment nor a valid record.
pub fn parse(text: &str) -> Result<Vec<Recorded>, ReplayError> {
    text.lines()
        .enumerate()
        .filter_map(|(n, line)| parse_line(n + 1, line).transpose())
        .collect()
}

/// Read recorded frames from a file
///
/// # Errors
///
/// Fails if the file can't be read or if [`parse`] fails.
pub fn load(path: &Path) -> Result<Vec<Recorded>, ReplayError> {
    let text = std::fs::read_to_string(path).map_err(|e| ReplayError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn records_and_comments() {
        let text = "# captured on the LAN side\n\nof:1 3 0a0b0c\n  of:2   12 ff  \n\
                    stats of:1 1 5000\n";
        let records = parse(text).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].line, 3);
        assert_eq!(
            records[0].event,
            Event::Frame {
                ingress: Ingress {
                    gateway: GatewayId::from("of:1"),
                    port: PortId::new(3),
                },
                frame: vec![0x0a, 0x0b, 0x0c],
            }
        );
        let Event::Frame { ingress, frame } = &records[1].event else {
            unreachable!()
        };
        assert_eq!(ingress.port, PortId::new(12));
        assert_eq!(frame, &vec![0xff]);
        assert_eq!(
            records[2].event,
            Event::Counters {
                gateway: GatewayId::from("of:1"),
                port: PortId::new(1),
                total_bytes: 5000,
            }
        );
    }

    #[test]
    fn bad_lines() {
        assert_eq!(parse("of:1 3"), Err(ReplayError::Syntax { line: 1 }));
        assert_eq!(
            parse("of:1 3 00 extra"),
            Err(ReplayError::Syntax { line: 1 })
        );
        assert_eq!(
            parse("# ok\nof:1 x 00"),
            Err(ReplayError::Port {
                line: 2,
                port: "x".to_string()
            })
        );
        assert_eq!(
            parse("stats of:1 1 lots"),
            Err(ReplayError::Count {
                line: 1,
                count: "lots".to_string()
            })
        );
        assert!(matches!(
            parse("of:1 3 0g"),
            Err(ReplayError::Hex { line: 1, .. })
        ));
        assert!(matches!(
            load(Path::new("/nonexistent/frames.txt")),
            Err(ReplayError::Read { .. })
        ));
    }
}
