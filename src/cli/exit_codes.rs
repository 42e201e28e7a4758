//! CLI Exit Codes
//!
//! Standard exit codes for CLI operations and automation. Each start
//! failure class maps to its own code so scripts can tell them apart.

use crate::core::link::LinkError;
use std::process::ExitCode;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Invalid arguments
    pub const INVALID_ARGS: u8 = 2;

    /// Multiplexer binary missing
    pub const TOOL_MISSING: u8 = 3;

    /// Permission denied
    pub const PERMISSION_DENIED: u8 = 4;

    /// Multiplexer exited during startup
    pub const PROCESS_DIED: u8 = 5;

    /// Device nodes never appeared
    pub const DEVICE_TIMEOUT: u8 = 6;

    /// Loopback test failed
    pub const TEST_FAILED: u8 = 7;

    /// Link lost while running
    pub const LINK_LOST: u8 = 8;

    /// Internal error
    pub const INTERNAL_ERROR: u8 = 127;
}

/// CLI operation result
#[derive(Debug)]
pub enum CliResult {
    /// Success with optional message
    Success(Option<String>),

    /// Error with code and message
    Error(u8, String),
}

impl CliResult {
    /// Plain success
    pub fn success() -> Self {
        Self::Success(None)
    }

    /// Success with a final message
    pub fn success_with_message(msg: impl Into<String>) -> Self {
        Self::Success(Some(msg.into()))
    }

    /// Error with an explicit code
    pub fn error(code: u8, msg: impl Into<String>) -> Self {
        Self::Error(code, msg.into())
    }

    /// Get exit code
    pub fn code(&self) -> u8 {
        match self {
            Self::Success(_) => ExitCodes::SUCCESS,
            Self::Error(code, _) => *code,
        }
    }

    /// Get message
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(Some(msg)) => Some(msg),
            Self::Error(_, msg) => Some(msg),
            Self::Success(None) => None,
        }
    }

    /// Convert to ExitCode
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Is success?
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<&LinkError> for CliResult {
    fn from(err: &LinkError) -> Self {
        let code = match err {
            LinkError::ToolMissing(_) => ExitCodes::TOOL_MISSING,
            LinkError::RemovalDenied(_) => ExitCodes::PERMISSION_DENIED,
            LinkError::ProcessExitedEarly(_) => ExitCodes::PROCESS_DIED,
            LinkError::DeviceTimeout(_) => ExitCodes::DEVICE_TIMEOUT,
            LinkError::InvalidEndpoints(_) => ExitCodes::INVALID_ARGS,
            LinkError::TestMismatch { .. } => ExitCodes::TEST_FAILED,
            LinkError::NotIdle(_) | LinkError::NotActive => ExitCodes::ERROR,
            LinkError::Serial(_) | LinkError::Io(_) => ExitCodes::ERROR,
        };
        Self::Error(code, err.to_string())
    }
}

/// Exit code description
pub fn exit_code_description(code: u8) -> &'static str {
    match code {
        0 => "Success",
        1 => "General error",
        2 => "Invalid arguments",
        3 => "Multiplexer binary missing",
        4 => "Permission denied",
        5 => "Multiplexer exited during startup",
        6 => "Device creation timeout",
        7 => "Loopback test failed",
        8 => "Link lost",
        127 => "Internal error",
        _ => "Unknown error",
    }
}

/// Print exit code table
pub fn print_exit_codes() {
    println!("Exit Codes:");
    for code in [0, 1, 2, 3, 4, 5, 6, 7, 8, 127] {
        println!("  {:>3}  {}", code, exit_code_description(code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cli_result() {
        let success = CliResult::success();
        assert!(success.is_success());
        assert_eq!(success.code(), 0);

        let error = CliResult::error(3, "socat missing");
        assert!(!error.is_success());
        assert_eq!(error.code(), 3);
        assert_eq!(error.message(), Some("socat missing"));
    }

    #[test]
    fn test_link_error_codes_are_distinct() {
        let errors = [
            LinkError::ToolMissing("socat".to_string()),
            LinkError::RemovalDenied("/tmp/ttyV0".to_string()),
            LinkError::ProcessExitedEarly("boom".to_string()),
            LinkError::DeviceTimeout(Duration::from_secs(5)),
        ];

        let mut codes: Vec<u8> = errors.iter().map(|e| CliResult::from(e).code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(codes.iter().all(|&c| c != ExitCodes::SUCCESS));
    }
}
