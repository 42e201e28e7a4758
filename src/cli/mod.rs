//! CLI Module
//!
//! Provides command-line interface functionality including:
//! - Exit codes for automation
//! - Remediation hints for startup failures

pub mod exit_codes;

pub use exit_codes::{exit_code_description, print_exit_codes, CliResult, ExitCodes};

use crate::core::link::LinkError;

/// Remediation hints for a startup failure
///
/// One suggestion per line, printed under the error message by the console
/// front-end.
pub fn remediation_hints(err: &LinkError) -> &'static [&'static str] {
    match err {
        LinkError::ToolMissing(_) => &[
            "Install socat (e.g. `sudo apt-get install socat`)",
            "If it is installed in a non-standard location, put it on PATH",
        ],
        LinkError::RemovalDenied(_) => &[
            "Remove the stale device node manually",
            "Run with elevated privileges if the node is owned by another user",
        ],
        LinkError::ProcessExitedEarly(_) | LinkError::DeviceTimeout(_) => &[
            "Check that the scratch directory is writable",
            "Run with elevated privileges if device creation is restricted",
        ],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_hints_for_missing_tool_mention_install() {
        let hints = remediation_hints(&LinkError::ToolMissing("socat".to_string()));
        assert!(hints.iter().any(|h| h.contains("Install socat")));
    }

    #[test]
    fn test_hints_for_timeout_mention_writability() {
        let hints = remediation_hints(&LinkError::DeviceTimeout(Duration::from_secs(5)));
        assert!(hints.iter().any(|h| h.contains("writable")));
    }

    #[test]
    fn test_no_hints_for_invalid_endpoints() {
        let hints = remediation_hints(&LinkError::InvalidEndpoints("same".to_string()));
        assert!(hints.is_empty());
    }
}
