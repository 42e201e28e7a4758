//! Traffic capture for the relayed byte stream
//!
//! When capture is enabled the multiplexer runs with hex dumping turned on
//! (`socat -x`), which prints one block per transfer to its stderr: a header
//! line carrying the direction marker and byte count, followed by rows of
//! hex bytes. This module parses that stream back into frames and appends
//! timestamped records to a capture file.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Direction of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// First endpoint to second
    AToB,
    /// Second endpoint to first
    BToA,
}

impl Direction {
    /// Marker character used in capture records
    pub fn tag(self) -> char {
        match self {
            Direction::AToB => '>',
            Direction::BToA => '<',
        }
    }
}

/// Capture record format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    /// Timestamp, direction, hex bytes
    #[default]
    Hex,
    /// Timestamp, direction, lossy text
    Text,
}

impl CaptureFormat {
    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            CaptureFormat::Hex => "Hex",
            CaptureFormat::Text => "Text",
        }
    }
}

/// Capture configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Whether traffic capture is on
    pub enabled: bool,
    /// Record format
    pub format: CaptureFormat,
    /// Output file; a timestamped file in the scratch directory when unset
    pub path: Option<PathBuf>,
}

/// Capture statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureStats {
    /// Payload bytes written to the capture file
    pub bytes_captured: u64,
    /// Transfer frames recorded
    pub frames_captured: u64,
}

/// One parsed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Which way the bytes went
    pub direction: Direction,
    /// Payload
    pub data: Vec<u8>,
}

/// Incremental parser for the multiplexer's stderr hex dump
///
/// Transfer blocks look like:
///
/// ```text
/// > 2024/05/01 10:00:00.000000  length=5 from=0 to=4
///  48 65 6c 6c 6f
/// ```
///
/// Diagnostic lines interleave freely and terminate any open block.
#[derive(Debug, Default)]
pub struct DumpParser {
    direction: Option<Direction>,
    pending: Vec<u8>,
}

impl DumpParser {
    /// New empty parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one stderr line; returns a frame when the line closes one
    pub fn feed(&mut self, line: &str) -> Option<Frame> {
        if let Some(direction) = Self::header_direction(line) {
            let done = self.take_pending();
            self.direction = Some(direction);
            return done;
        }

        if self.direction.is_some() {
            if let Some(bytes) = Self::parse_hex_row(line) {
                self.pending.extend_from_slice(&bytes);
                return None;
            }
            // Anything else ends the block (socat log chatter, etc.)
            return self.take_pending();
        }

        None
    }

    /// Flush a trailing unterminated frame at end of stream
    pub fn finish(&mut self) -> Option<Frame> {
        self.take_pending()
    }

    fn take_pending(&mut self) -> Option<Frame> {
        let direction = self.direction.take()?;
        if self.pending.is_empty() {
            return None;
        }
        Some(Frame {
            direction,
            data: std::mem::take(&mut self.pending),
        })
    }

    fn header_direction(line: &str) -> Option<Direction> {
        if !line.contains("length=") {
            return None;
        }
        match line.as_bytes().first() {
            Some(b'>') => Some(Direction::AToB),
            Some(b'<') => Some(Direction::BToA),
            _ => None,
        }
    }

    fn parse_hex_row(line: &str) -> Option<Vec<u8>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let mut joined = String::with_capacity(trimmed.len());
        for token in trimmed.split_ascii_whitespace() {
            if token.len() != 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            joined.push_str(token);
        }
        hex::decode(&joined).ok()
    }
}

/// An open capture file plus the parser feeding it
pub struct CaptureSession {
    format: CaptureFormat,
    path: PathBuf,
    writer: BufWriter<File>,
    parser: DumpParser,
    stats: CaptureStats,
}

impl CaptureSession {
    /// Create the capture file and an empty parser
    pub fn open(config: &CaptureConfig) -> io::Result<Self> {
        let path = config
            .path
            .clone()
            .unwrap_or_else(default_capture_path);
        let writer = BufWriter::new(File::create(&path)?);
        Ok(Self {
            format: config.format,
            path,
            writer,
            parser: DumpParser::new(),
            stats: CaptureStats::default(),
        })
    }

    /// Capture file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Statistics so far
    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    /// Feed one stderr line from the multiplexer
    pub fn feed_line(&mut self, line: &str) {
        if let Some(frame) = self.parser.feed(line) {
            self.record(&frame);
        }
    }

    /// Flush any trailing frame and the file buffer
    pub fn finish(&mut self) {
        if let Some(frame) = self.parser.finish() {
            self.record(&frame);
        }
        let _ = self.writer.flush();
    }

    fn record(&mut self, frame: &Frame) {
        let timestamp = Local::now().format("%H:%M:%S");
        let rendered = match self.format {
            CaptureFormat::Hex => {
                let mut body = String::with_capacity(frame.data.len() * 3);
                for byte in &frame.data {
                    body.push_str(&format!("{byte:02X} "));
                }
                format!("{timestamp} {} {}\n", frame.direction.tag(), body.trim_end())
            }
            CaptureFormat::Text => format!(
                "{timestamp} {} {}\n",
                frame.direction.tag(),
                String::from_utf8_lossy(&frame.data)
            ),
        };
        if self.writer.write_all(rendered.as_bytes()).is_ok() {
            self.stats.bytes_captured += frame.data.len() as u64;
            self.stats.frames_captured += 1;
        }
        let _ = self.writer.flush();
    }
}

fn default_capture_path() -> PathBuf {
    std::env::temp_dir().join(format!(
        "vcomm_capture_{}.log",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const HEADER_A: &str = "> 2024/05/01 10:00:00.000000  length=5 from=0 to=4";
    const HEADER_B: &str = "< 2024/05/01 10:00:00.100000  length=2 from=0 to=1";

    #[test]
    fn test_parser_single_frame() {
        let mut parser = DumpParser::new();
        assert_eq!(parser.feed(HEADER_A), None);
        assert_eq!(parser.feed(" 48 65 6c 6c 6f"), None);
        let frame = parser.finish().unwrap();
        assert_eq!(frame.direction, Direction::AToB);
        assert_eq!(frame.data, b"Hello");
    }

    #[test]
    fn test_parser_back_to_back_frames() {
        let mut parser = DumpParser::new();
        parser.feed(HEADER_A);
        parser.feed(" 48 65 6c 6c 6f");
        let first = parser.feed(HEADER_B).unwrap();
        assert_eq!(first.data, b"Hello");

        parser.feed(" 4f 4b");
        let second = parser.finish().unwrap();
        assert_eq!(second.direction, Direction::BToA);
        assert_eq!(second.data, b"OK");
    }

    #[test]
    fn test_parser_multi_row_frame() {
        let mut parser = DumpParser::new();
        parser.feed("> 2024/05/01 10:00:00.000000  length=20 from=0 to=19");
        parser.feed(" 00 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f");
        parser.feed(" 10 11 12 13");
        let frame = parser.finish().unwrap();
        assert_eq!(frame.data.len(), 20);
        assert_eq!(frame.data[16], 0x10);
    }

    #[test]
    fn test_parser_ignores_log_chatter() {
        let mut parser = DumpParser::new();
        assert_eq!(
            parser.feed("2024/05/01 10:00:00 socat[123] N PTY is /dev/pts/4"),
            None
        );
        parser.feed(HEADER_A);
        parser.feed(" 48 69");
        // A diagnostic line closes the open block.
        let frame = parser.feed("2024/05/01 socat[123] N exiting").unwrap();
        assert_eq!(frame.data, b"Hi");
        assert_eq!(parser.finish(), None);
    }

    #[test]
    fn test_session_writes_hex_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.log");
        let config = CaptureConfig {
            enabled: true,
            format: CaptureFormat::Hex,
            path: Some(path.clone()),
        };

        let mut session = CaptureSession::open(&config).unwrap();
        session.feed_line(HEADER_A);
        session.feed_line(" 48 65 6c 6c 6f");
        session.finish();

        let stats = session.stats();
        assert_eq!(stats.frames_captured, 1);
        assert_eq!(stats.bytes_captured, 5);

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("> 48 65 6C 6C 6F"));
    }

    #[test]
    fn test_session_writes_text_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.log");
        let config = CaptureConfig {
            enabled: true,
            format: CaptureFormat::Text,
            path: Some(path.clone()),
        };

        let mut session = CaptureSession::open(&config).unwrap();
        session.feed_line(HEADER_B);
        session.feed_line(" 4f 4b");
        session.finish();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("< OK"));
    }
}
