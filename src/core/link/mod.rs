//! Virtual null modem link management
//!
//! Owns the lifecycle of one device-pair session: spawn the external
//! multiplexer (socat) that keeps two pseudo-terminal endpoints cross-wired,
//! wait for the device nodes to appear, verify liveness, run a loopback
//! smoke test, and tear everything down again.

use crate::core::capture::{CaptureConfig, CaptureSession, CaptureStats};
use crate::core::sink::{LogSink, TracingSink};
use parking_lot::Mutex;
use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Payload exchanged by the loopback smoke test
pub const TEST_PAYLOAD: &[u8] = b"Hello null modem!";

/// Upper bound on retained multiplexer diagnostics
const DIAGNOSTICS_LIMIT: usize = 8192;

/// Link session state
///
/// `Stopped` and `Failed` are terminal; a new session must be constructed
/// to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Constructed, not yet started
    Idle,
    /// Multiplexer spawned, waiting for device nodes
    Starting,
    /// Both endpoints exist and the multiplexer is running
    Active,
    /// Shut down by request
    Stopped,
    /// Startup failed or liveness was lost
    Failed,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Starting => write!(f, "Starting"),
            Self::Active => write!(f, "Active"),
            Self::Stopped => write!(f, "Stopped"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Link session configuration
///
/// Endpoint paths are fixed for the lifetime of a session; changing them
/// means constructing a new [`LinkManager`].
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// First endpoint path
    pub device_a: String,
    /// Second endpoint path
    pub device_b: String,
    /// External multiplexer binary
    pub multiplexer: String,
    /// Baud rate used by the loopback test
    pub baud_rate: u32,
    /// Octal mode applied best-effort to both endpoints
    pub permissions: u32,
    /// Ceiling on the wait for device nodes to appear
    pub device_wait: Duration,
    /// Interval between existence polls during startup
    pub poll_interval: Duration,
    /// Grace period before the multiplexer is force-killed on stop
    pub stop_grace: Duration,
    /// Traffic capture settings
    pub capture: CaptureConfig,
}

impl LinkConfig {
    /// Configuration for the given endpoint pair with default timing
    pub fn new(device_a: &str, device_b: &str) -> Self {
        Self {
            device_a: device_a.to_string(),
            device_b: device_b.to_string(),
            ..Self::default()
        }
    }

    /// Set the multiplexer binary
    #[must_use]
    pub fn multiplexer(mut self, binary: &str) -> Self {
        self.multiplexer = binary.to_string();
        self
    }

    /// Set the loopback test baud rate
    #[must_use]
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Set the endpoint permission mode
    #[must_use]
    pub fn permissions(mut self, mode: u32) -> Self {
        self.permissions = mode;
        self
    }

    /// Set the device-appearance wait ceiling
    #[must_use]
    pub fn device_wait(mut self, wait: Duration) -> Self {
        self.device_wait = wait;
        self
    }

    /// Set the traffic capture settings
    #[must_use]
    pub fn capture(mut self, capture: CaptureConfig) -> Self {
        self.capture = capture;
        self
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device_a: "/tmp/ttyV0".to_string(),
            device_b: "/tmp/ttyV1".to_string(),
            multiplexer: "socat".to_string(),
            baud_rate: 9600,
            permissions: 0o666,
            device_wait: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
            stop_grace: Duration::from_secs(5),
            capture: CaptureConfig::default(),
        }
    }
}

/// Link session statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkStats {
    /// Loopback tests attempted
    pub tests_run: u64,
    /// Loopback tests passed
    pub tests_passed: u64,
    /// Seconds since the link became active
    pub uptime_secs: u64,
}

/// Errors from link setup and teardown
#[derive(Error, Debug)]
pub enum LinkError {
    /// The multiplexer binary could not be found
    #[error("multiplexer `{0}` not found (install socat)")]
    ToolMissing(String),

    /// A stale endpoint exists and cannot be removed
    #[error("cannot remove existing device {0}: permission denied")]
    RemovalDenied(String),

    /// The multiplexer exited before the link came up
    #[error("multiplexer exited during startup: {0}")]
    ProcessExitedEarly(String),

    /// The device nodes never appeared
    #[error("devices not created within {0:.1?}")]
    DeviceTimeout(Duration),

    /// `start` called on a session that is not idle
    #[error("link is {0}, expected Idle")]
    NotIdle(LinkState),

    /// Endpoint paths are empty or identical
    #[error("invalid endpoints: {0}")]
    InvalidEndpoints(String),

    /// Operation requires an active link
    #[error("link is not active")]
    NotActive,

    /// Loopback test read back different bytes than were written
    #[error("test mismatch: sent {sent:?}, received {received:?}")]
    TestMismatch {
        /// Bytes written to the first endpoint
        sent: Vec<u8>,
        /// Bytes read from the second endpoint
        received: Vec<u8>,
    },

    /// Serial port error during the loopback test
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One virtual null modem session
///
/// Holds the spawned multiplexer exclusively; the process handle is live
/// only while the session is starting or active.
pub struct LinkManager {
    config: LinkConfig,
    state: LinkState,
    child: Option<Child>,
    sink: Arc<dyn LogSink>,
    diagnostics: Option<Arc<Mutex<String>>>,
    drainer: Option<thread::JoinHandle<()>>,
    capture: Option<Arc<Mutex<CaptureSession>>>,
    started_at: Option<Instant>,
    stats: LinkStats,
}

impl LinkManager {
    /// New idle session reporting through `tracing`
    pub fn new(config: LinkConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    /// New idle session reporting through the given sink
    pub fn with_sink(config: LinkConfig, sink: Arc<dyn LogSink>) -> Self {
        Self {
            config,
            state: LinkState::Idle,
            child: None,
            sink,
            diagnostics: None,
            drainer: None,
            capture: None,
            started_at: None,
            stats: LinkStats::default(),
        }
    }

    /// Session configuration
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Current state without re-validating liveness
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// The endpoint pair
    pub fn devices(&self) -> (&str, &str) {
        (&self.config.device_a, &self.config.device_b)
    }

    /// Session statistics
    pub fn stats(&self) -> LinkStats {
        let mut stats = self.stats;
        if let Some(started_at) = self.started_at {
            stats.uptime_secs = started_at.elapsed().as_secs();
        }
        stats
    }

    /// Capture statistics, when capture is enabled
    pub fn capture_stats(&self) -> Option<CaptureStats> {
        self.capture.as_ref().map(|c| c.lock().stats())
    }

    /// Whether the given multiplexer binary can be spawned
    pub fn multiplexer_available(binary: &str) -> bool {
        Command::new(binary)
            .arg("-V")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    /// Bring the link up
    ///
    /// Verifies the multiplexer is invocable, clears stale endpoint nodes,
    /// spawns the multiplexer, waits for both device nodes, and relaxes
    /// their permissions. On success the session is `Active`. Failures
    /// before the spawn leave it `Idle`; failures after the spawn tear the
    /// process down and leave it `Failed`.
    pub fn start(&mut self) -> Result<(), LinkError> {
        if self.state != LinkState::Idle {
            return Err(LinkError::NotIdle(self.state));
        }
        self.validate_endpoints()?;

        let device_a = self.config.device_a.clone();
        let device_b = self.config.device_b.clone();

        if let Err(e) = Command::new(&self.config.multiplexer)
            .arg("-V")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            let err = if e.kind() == std::io::ErrorKind::NotFound {
                LinkError::ToolMissing(self.config.multiplexer.clone())
            } else {
                LinkError::Io(e)
            };
            self.sink.error(&err.to_string());
            return Err(err);
        }

        // Never operate on stale pre-existing nodes.
        for device in [&device_a, &device_b] {
            if Path::new(device).exists() {
                match fs::remove_file(device) {
                    Ok(()) => self.sink.info(&format!("Removed existing device {device}")),
                    Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                        let err = LinkError::RemovalDenied(device.clone());
                        self.sink.error(&err.to_string());
                        return Err(err);
                    }
                    Err(e) => {
                        self.sink.error(&format!("Cannot remove {device}: {e}"));
                        return Err(LinkError::Io(e));
                    }
                }
            }
        }

        self.state = LinkState::Starting;

        let capture_on = self.config.capture.enabled;
        let mut command = Command::new(&self.config.multiplexer);
        command.arg("-d").arg("-d");
        if capture_on {
            command.arg("-x");
        }
        command
            .arg(format!("pty,raw,echo=0,link={device_a}"))
            .arg(format!("pty,raw,echo=0,link={device_b}"))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        self.sink.info(&format!(
            "Starting multiplexer: {} -d -d {}pty,raw,echo=0,link={} pty,raw,echo=0,link={}",
            self.config.multiplexer,
            if capture_on { "-x " } else { "" },
            device_a,
            device_b
        ));

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.state = LinkState::Failed;
                let err = if e.kind() == std::io::ErrorKind::NotFound {
                    LinkError::ToolMissing(self.config.multiplexer.clone())
                } else {
                    LinkError::Io(e)
                };
                self.sink.error(&format!("Failed to spawn multiplexer: {err}"));
                return Err(err);
            }
        };

        let capture = if capture_on {
            match CaptureSession::open(&self.config.capture) {
                Ok(session) => {
                    self.sink
                        .info(&format!("Capturing traffic to {}", session.path().display()));
                    Some(Arc::new(Mutex::new(session)))
                }
                Err(e) => {
                    self.sink.warn(&format!("Could not open capture file: {e}"));
                    None
                }
            }
        } else {
            None
        };

        let diagnostics = Arc::new(Mutex::new(String::new()));
        let drainer = child.stderr.take().map(|stderr| {
            let diagnostics = diagnostics.clone();
            let capture = capture.clone();
            thread::spawn(move || {
                let reader = BufReader::new(stderr);
                for line in reader.lines() {
                    let Ok(line) = line else { break };
                    {
                        let mut buffer = diagnostics.lock();
                        if buffer.len() < DIAGNOSTICS_LIMIT {
                            buffer.push_str(&line);
                            buffer.push('\n');
                        }
                    }
                    if let Some(capture) = &capture {
                        capture.lock().feed_line(&line);
                    }
                }
                if let Some(capture) = &capture {
                    capture.lock().finish();
                }
            })
        });

        // Bounded wait for both device nodes, bailing out as soon as the
        // multiplexer dies.
        let deadline = Instant::now() + self.config.device_wait;
        loop {
            if Path::new(&device_a).exists() && Path::new(&device_b).exists() {
                break;
            }

            if let Ok(Some(status)) = child.try_wait() {
                let detail = Self::collect_diagnostics(drainer, &diagnostics, status.code());
                self.remove_endpoints();
                self.state = LinkState::Failed;
                let err = LinkError::ProcessExitedEarly(detail);
                self.sink.error(&err.to_string());
                return Err(err);
            }

            if Instant::now() >= deadline {
                Self::terminate(&mut child, self.config.stop_grace);
                if let Some(handle) = drainer {
                    let _ = handle.join();
                }
                self.remove_endpoints();
                self.state = LinkState::Failed;
                let err = LinkError::DeviceTimeout(self.config.device_wait);
                self.sink.error(&err.to_string());
                return Err(err);
            }

            thread::sleep(self.config.poll_interval);
        }

        // Devices exist; make sure the process did not die right after
        // creating them.
        if let Ok(Some(status)) = child.try_wait() {
            let detail = Self::collect_diagnostics(drainer, &diagnostics, status.code());
            self.remove_endpoints();
            self.state = LinkState::Failed;
            let err = LinkError::ProcessExitedEarly(detail);
            self.sink.error(&err.to_string());
            return Err(err);
        }

        // The link already works for the invoking user; wider access is
        // best-effort.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            for device in [&device_a, &device_b] {
                if let Err(e) =
                    fs::set_permissions(device, fs::Permissions::from_mode(self.config.permissions))
                {
                    self.sink
                        .warn(&format!("Could not set permissions on {device}: {e}"));
                }
            }
        }

        self.child = Some(child);
        self.diagnostics = Some(diagnostics);
        self.drainer = drainer;
        self.capture = capture;
        self.started_at = Some(Instant::now());
        self.state = LinkState::Active;
        self.sink
            .info(&format!("Created null modem: {device_a} <-> {device_b}"));
        Ok(())
    }

    /// Tear the link down
    ///
    /// Idempotent; a no-op unless the session is starting or active. Asks
    /// the multiplexer to exit, force-kills it after the grace period, and
    /// removes any endpoint node still present.
    pub fn stop(&mut self) {
        if self.state != LinkState::Active && self.state != LinkState::Starting {
            return;
        }

        self.sink.info("Stopping null modem...");

        if let Some(mut child) = self.child.take() {
            Self::terminate(&mut child, self.config.stop_grace);
        }
        if let Some(handle) = self.drainer.take() {
            let _ = handle.join();
        }
        if let Some(capture) = &self.capture {
            capture.lock().finish();
        }

        // The multiplexer removes its links on a clean exit; this is the
        // safety net.
        self.remove_endpoints();

        self.started_at = None;
        self.state = LinkState::Stopped;
        self.sink.info("Null modem stopped");
    }

    /// Re-validate liveness
    ///
    /// A side-effecting probe, not a cached getter: a dead multiplexer or a
    /// vanished endpoint transitions the session to `Failed` and returns
    /// false, so polling callers self-correct within one interval.
    pub fn is_active(&mut self) -> bool {
        if self.state != LinkState::Active {
            return false;
        }

        if let Some(child) = self.child.as_mut() {
            match child.try_wait() {
                Ok(Some(status)) => {
                    self.sink
                        .warn(&format!("Multiplexer exited unexpectedly ({status})"));
                    self.child = None;
                    self.fail();
                    return false;
                }
                Ok(None) => {}
                Err(e) => {
                    self.sink.warn(&format!("Cannot poll multiplexer: {e}"));
                    self.fail();
                    return false;
                }
            }
        }

        if !Path::new(&self.config.device_a).exists() || !Path::new(&self.config.device_b).exists()
        {
            self.sink.warn("Devices disappeared");
            self.fail();
            return false;
        }

        true
    }

    /// Exchange a fixed payload across the pair
    ///
    /// Opens both endpoints as serial ports, writes the payload to the
    /// first, and reads it back from the second. Returns false on an
    /// inactive link without opening anything; all test failures are
    /// reported through the sink, never raised.
    pub fn test_link(&mut self) -> bool {
        if !self.is_active() {
            self.sink
                .warn(&format!("Cannot test: {}", LinkError::NotActive));
            return false;
        }

        self.stats.tests_run += 1;
        self.sink.info("Testing communication...");

        match self.run_loopback() {
            Ok(()) => {
                self.stats.tests_passed += 1;
                self.sink.info("Communication test passed");
                true
            }
            Err(e) => {
                self.sink.error(&format!("Communication test failed: {e}"));
                false
            }
        }
    }

    fn run_loopback(&self) -> Result<(), LinkError> {
        let timeout = Duration::from_secs(1);
        let mut tx = serialport::new(&self.config.device_a, self.config.baud_rate)
            .timeout(timeout)
            .open()?;
        let mut rx = serialport::new(&self.config.device_b, self.config.baud_rate)
            .timeout(timeout)
            .open()?;

        tx.write_all(TEST_PAYLOAD)?;
        tx.flush()?;

        // Propagation through the multiplexer is not instant.
        thread::sleep(Duration::from_millis(100));

        let mut received = vec![0u8; TEST_PAYLOAD.len()];
        rx.read_exact(&mut received)?;

        if received != TEST_PAYLOAD {
            return Err(LinkError::TestMismatch {
                sent: TEST_PAYLOAD.to_vec(),
                received,
            });
        }
        Ok(())
    }

    fn validate_endpoints(&self) -> Result<(), LinkError> {
        let a = self.config.device_a.trim();
        let b = self.config.device_b.trim();
        if a.is_empty() || b.is_empty() {
            return Err(LinkError::InvalidEndpoints(
                "endpoint paths must be non-empty".to_string(),
            ));
        }
        if a == b {
            return Err(LinkError::InvalidEndpoints(format!(
                "endpoint paths must differ (both are {a})"
            )));
        }
        Ok(())
    }

    /// Liveness was lost; the handle invariant still holds, so any child
    /// left running is torn down before the session is marked failed.
    fn fail(&mut self) {
        if let Some(mut child) = self.child.take() {
            Self::terminate(&mut child, Duration::from_secs(1));
        }
        if let Some(handle) = self.drainer.take() {
            let _ = handle.join();
        }
        self.started_at = None;
        self.state = LinkState::Failed;
    }

    fn remove_endpoints(&self) {
        for device in [&self.config.device_a, &self.config.device_b] {
            if Path::new(device).exists() {
                let _ = fs::remove_file(device);
            }
        }
    }

    fn collect_diagnostics(
        drainer: Option<thread::JoinHandle<()>>,
        diagnostics: &Arc<Mutex<String>>,
        exit_code: Option<i32>,
    ) -> String {
        if let Some(handle) = drainer {
            let _ = handle.join();
        }
        let detail = diagnostics.lock().trim().to_string();
        if detail.is_empty() {
            match exit_code {
                Some(code) => format!("exit code {code}, no diagnostics"),
                None => "terminated by signal, no diagnostics".to_string(),
            }
        } else {
            detail
        }
    }

    /// Graceful termination, then the hammer.
    fn terminate(child: &mut Child, grace: Duration) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;
            let _ = kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM);

            let deadline = Instant::now() + grace;
            while Instant::now() < deadline {
                if let Ok(Some(_)) = child.try_wait() {
                    return;
                }
                thread::sleep(Duration::from_millis(100));
            }
        }
        #[cfg(not(unix))]
        let _ = grace;

        let _ = child.kill();
        let _ = child.wait();
    }
}

impl Drop for LinkManager {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sink::NullSink;
    use std::path::PathBuf;

    fn manager(config: LinkConfig) -> LinkManager {
        LinkManager::with_sink(config, Arc::new(NullSink))
    }

    fn test_config(dir: &Path) -> LinkConfig {
        LinkConfig::new(
            dir.join("ttyVA").to_str().unwrap(),
            dir.join("ttyVB").to_str().unwrap(),
        )
    }

    /// Install a stand-in multiplexer so failure paths are deterministic.
    /// Like the real tool it answers `-V` immediately.
    #[cfg(unix)]
    fn fake_multiplexer(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-mux");
        fs::write(
            &path,
            format!("#!/bin/sh\nif [ \"$1\" = \"-V\" ]; then exit 0; fi\n{body}\n"),
        )
        .unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Stand-in that creates the requested link paths and stays alive.
    #[cfg(unix)]
    fn link_creating_multiplexer(dir: &Path) -> PathBuf {
        fake_multiplexer(
            dir,
            r#"for arg in "$@"; do
  case "$arg" in
    *link=*) : > "${arg#*link=}" ;;
  esac
done
exec sleep 30"#,
        )
    }

    #[test]
    fn test_rejects_identical_endpoints() {
        let mut link = manager(
            LinkConfig::new("/tmp/ttySame", "/tmp/ttySame").multiplexer("/nonexistent/mux"),
        );
        // Validation runs before any tool check or spawn.
        assert!(matches!(
            link.start(),
            Err(LinkError::InvalidEndpoints(_))
        ));
        assert_eq!(link.state(), LinkState::Idle);
    }

    #[test]
    fn test_rejects_empty_endpoints() {
        let mut link =
            manager(LinkConfig::new("", "/tmp/ttyV1").multiplexer("/nonexistent/mux"));
        assert!(matches!(
            link.start(),
            Err(LinkError::InvalidEndpoints(_))
        ));
    }

    #[test]
    fn test_tool_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut link = manager(test_config(dir.path()).multiplexer("/nonexistent/vcomm-mux"));
        match link.start() {
            Err(LinkError::ToolMissing(binary)) => {
                assert_eq!(binary, "/nonexistent/vcomm-mux");
            }
            other => panic!("expected ToolMissing, got {other:?}"),
        }
        // No process was spawned, so the session never left Idle.
        assert_eq!(link.state(), LinkState::Idle);
    }

    #[test]
    fn test_stop_is_idempotent_when_idle() {
        let dir = tempfile::tempdir().unwrap();
        let mut link = manager(test_config(dir.path()));
        link.stop();
        link.stop();
        assert_eq!(link.state(), LinkState::Idle);
    }

    #[test]
    fn test_test_link_on_inactive_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut link = manager(test_config(dir.path()));
        assert!(!link.test_link());
        assert_eq!(link.state(), LinkState::Idle);
        assert_eq!(link.stats().tests_run, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_process_exited_early() {
        let dir = tempfile::tempdir().unwrap();
        let mux = fake_multiplexer(dir.path(), "echo boom >&2\nexit 1");
        let mut link = manager(test_config(dir.path()).multiplexer(mux.to_str().unwrap()));

        match link.start() {
            Err(LinkError::ProcessExitedEarly(detail)) => {
                assert!(detail.contains("boom"), "diagnostics: {detail}");
            }
            other => panic!("expected ProcessExitedEarly, got {other:?}"),
        }
        assert_eq!(link.state(), LinkState::Failed);
    }

    #[cfg(unix)]
    #[test]
    fn test_device_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let mux = fake_multiplexer(dir.path(), "exec sleep 30");
        let config = test_config(dir.path())
            .multiplexer(mux.to_str().unwrap())
            .device_wait(Duration::from_millis(300));
        let mut link = manager(config);

        let begun = Instant::now();
        assert!(matches!(link.start(), Err(LinkError::DeviceTimeout(_))));
        assert!(begun.elapsed() < Duration::from_secs(5));
        assert_eq!(link.state(), LinkState::Failed);
    }

    #[cfg(unix)]
    #[test]
    fn test_start_stop_lifecycle_with_stand_in() {
        let dir = tempfile::tempdir().unwrap();
        let mux = link_creating_multiplexer(dir.path());
        let config = test_config(dir.path()).multiplexer(mux.to_str().unwrap());
        let device_a = PathBuf::from(&config.device_a);
        let device_b = PathBuf::from(&config.device_b);
        let mut link = manager(config);

        link.start().unwrap();
        assert_eq!(link.state(), LinkState::Active);
        assert!(device_a.exists() && device_b.exists());
        assert!(link.is_active());

        // Starting an already-active session is rejected.
        assert!(matches!(link.start(), Err(LinkError::NotIdle(_))));
        assert_eq!(link.state(), LinkState::Active);

        link.stop();
        assert_eq!(link.state(), LinkState::Stopped);
        assert!(!device_a.exists() && !device_b.exists());
        assert!(!link.is_active());

        // Stopping again has no observable effect.
        link.stop();
        assert_eq!(link.state(), LinkState::Stopped);
    }

    #[cfg(unix)]
    #[test]
    fn test_liveness_lost_when_device_vanishes() {
        let dir = tempfile::tempdir().unwrap();
        let mux = link_creating_multiplexer(dir.path());
        let config = test_config(dir.path()).multiplexer(mux.to_str().unwrap());
        let device_b = PathBuf::from(&config.device_b);
        let mut link = manager(config);

        link.start().unwrap();
        assert!(link.is_active());

        fs::remove_file(&device_b).unwrap();
        assert!(!link.is_active());
        assert_eq!(link.state(), LinkState::Failed);
    }

    #[cfg(unix)]
    #[test]
    fn test_liveness_lost_when_process_dies() {
        let dir = tempfile::tempdir().unwrap();
        let mux = fake_multiplexer(
            dir.path(),
            r#"for arg in "$@"; do
  case "$arg" in
    *link=*) : > "${arg#*link=}" ;;
  esac
done
exec sleep 1"#,
        );
        let config = test_config(dir.path()).multiplexer(mux.to_str().unwrap());
        let mut link = manager(config);

        link.start().unwrap();
        assert!(link.is_active());

        // The stand-in exits on its own; the next probe after that must
        // observe the loss.
        let deadline = Instant::now() + Duration::from_secs(5);
        while link.is_active() {
            assert!(Instant::now() < deadline, "liveness loss never detected");
            thread::sleep(Duration::from_millis(200));
        }
        assert_eq!(link.state(), LinkState::Failed);
    }
}
