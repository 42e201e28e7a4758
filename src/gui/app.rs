//! Main GUI application for managing the virtual null modem
//!
//! Every button action runs the link manager call on a worker thread and
//! reports back over a channel drained in `update()`, so UI state is only
//! ever touched on the UI thread.

use eframe::egui::{self, Color32, RichText};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use vcomm_core::config::AppConfig;
use vcomm_core::core::link::{LinkManager, LinkState};
use vcomm_core::core::sink::{ChannelSink, LogEvent, LogLevel};

/// Link status shown in the status panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkStatus {
    Stopped,
    Starting,
    Running,
}

/// Messages from worker threads to the UI thread
#[derive(Debug, Clone)]
enum UiMessage {
    Started,
    StartFailed,
    Stopped,
    TestFinished(bool),
    LivenessLost,
}

/// Main application state
pub struct VcommApp {
    /// Persisted settings
    config: AppConfig,
    /// Current link session, shared with worker threads
    link: Arc<Mutex<LinkManager>>,
    /// First endpoint path (editable)
    device_a: String,
    /// Second endpoint path (editable)
    device_b: String,
    /// Capture relayed traffic
    capture_enabled: bool,
    /// Status indicator state
    status: LinkStatus,
    /// Devices of the running session
    active_devices: Option<(String, String)>,
    /// Log pane contents
    log_lines: VecDeque<LogEvent>,
    /// Sender cloned into each new session's sink
    log_tx: crossbeam_channel::Sender<LogEvent>,
    /// Log events from the link manager
    log_rx: crossbeam_channel::Receiver<LogEvent>,
    /// Sender cloned into worker threads
    ui_tx: Sender<UiMessage>,
    /// Worker thread results
    ui_rx: Receiver<UiMessage>,
    /// Modal error message
    error_dialog: Option<String>,
    /// Modal loopback test result
    test_dialog: Option<bool>,
    /// Keeps the background poller alive
    poller_running: Arc<AtomicBool>,
}

impl VcommApp {
    /// Create the application, wire up the poller, and honor auto-start
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let config = AppConfig::load().unwrap_or_default();

        if config.window.theme == "light" {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
        } else {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
        }

        let (log_tx, log_rx) = crossbeam_channel::unbounded();
        let sink = Arc::new(ChannelSink::new(log_tx.clone()));
        let link = Arc::new(Mutex::new(LinkManager::with_sink(
            config.link_config(),
            sink,
        )));

        let (ui_tx, ui_rx) = mpsc::channel();
        let poller_running = Arc::new(AtomicBool::new(true));

        // Background poller: keeps liveness fresh and reflects an
        // externally-induced failure back into the status indicator.
        {
            let link = link.clone();
            let ui_tx = ui_tx.clone();
            let running = poller_running.clone();
            thread::spawn(move || {
                let mut last_state = LinkState::Idle;
                while running.load(Ordering::Relaxed) {
                    let state = {
                        let mut link = link.lock();
                        link.is_active();
                        link.state()
                    };
                    if state == LinkState::Failed && last_state != LinkState::Failed {
                        let _ = ui_tx.send(UiMessage::LivenessLost);
                    }
                    last_state = state;
                    thread::sleep(Duration::from_secs(1));
                }
            });
        }

        let mut app = Self {
            device_a: config.device_a.clone(),
            device_b: config.device_b.clone(),
            capture_enabled: config.capture.enabled,
            config,
            link,
            status: LinkStatus::Stopped,
            active_devices: None,
            log_lines: VecDeque::new(),
            log_tx,
            log_rx,
            ui_tx,
            ui_rx,
            error_dialog: None,
            test_dialog: None,
            poller_running,
        };

        if app.config.auto_start {
            app.start_link();
        }

        app
    }

    /// Start a fresh session from the current field values
    fn start_link(&mut self) {
        let device_a = self.device_a.trim().to_string();
        let device_b = self.device_b.trim().to_string();

        if device_a.is_empty() || device_b.is_empty() {
            self.error_dialog = Some("Please enter valid device paths".to_string());
            return;
        }
        if device_a == device_b {
            self.error_dialog = Some("Device paths must be different".to_string());
            return;
        }

        // Paths are fixed for a session's lifetime, so each start gets a
        // new session built from the current fields.
        self.config.device_a = device_a.clone();
        self.config.device_b = device_b.clone();
        self.config.capture.enabled = self.capture_enabled;
        let sink = Arc::new(ChannelSink::new(self.log_tx.clone()));
        *self.link.lock() = LinkManager::with_sink(self.config.link_config(), sink);

        self.status = LinkStatus::Starting;
        self.active_devices = Some((device_a, device_b));

        let link = self.link.clone();
        let ui_tx = self.ui_tx.clone();
        thread::spawn(move || {
            let message = match link.lock().start() {
                Ok(()) => UiMessage::Started,
                Err(_) => UiMessage::StartFailed,
            };
            let _ = ui_tx.send(message);
        });
    }

    /// Stop the current session
    fn stop_link(&mut self) {
        let link = self.link.clone();
        let ui_tx = self.ui_tx.clone();
        thread::spawn(move || {
            link.lock().stop();
            let _ = ui_tx.send(UiMessage::Stopped);
        });
    }

    /// Run the loopback smoke test
    fn test_link(&mut self) {
        let link = self.link.clone();
        let ui_tx = self.ui_tx.clone();
        thread::spawn(move || {
            let passed = link.lock().test_link();
            let _ = ui_tx.send(UiMessage::TestFinished(passed));
        });
    }

    fn drain_channels(&mut self) {
        while let Ok(event) = self.log_rx.try_recv() {
            self.log_lines.push_back(event);
        }
        // Keep the pane bounded.
        while self.log_lines.len() > 500 {
            self.log_lines.pop_front();
        }

        while let Ok(message) = self.ui_rx.try_recv() {
            match message {
                UiMessage::Started => {
                    self.status = LinkStatus::Running;
                }
                UiMessage::StartFailed => {
                    self.status = LinkStatus::Stopped;
                    self.active_devices = None;
                    self.error_dialog = Some(
                        "Failed to start virtual null modem. Check the log for details."
                            .to_string(),
                    );
                }
                UiMessage::Stopped => {
                    self.status = LinkStatus::Stopped;
                    self.active_devices = None;
                }
                UiMessage::TestFinished(passed) => {
                    self.test_dialog = Some(passed);
                }
                UiMessage::LivenessLost => {
                    if self.status == LinkStatus::Running {
                        self.status = LinkStatus::Stopped;
                        self.active_devices = None;
                    }
                }
            }
        }
    }

    fn render_config(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.label(RichText::new("Virtual Device Configuration").strong());
            ui.add_space(5.0);

            let editable = self.status == LinkStatus::Stopped;
            egui::Grid::new("device_grid")
                .num_columns(4)
                .spacing([10.0, 8.0])
                .show(ui, |ui| {
                    ui.label("Device 1:");
                    ui.add_enabled(
                        editable,
                        egui::TextEdit::singleline(&mut self.device_a).desired_width(160.0),
                    );
                    ui.label("Device 2:");
                    ui.add_enabled(
                        editable,
                        egui::TextEdit::singleline(&mut self.device_b).desired_width(160.0),
                    );
                    ui.end_row();
                });

            ui.add_enabled(
                editable,
                egui::Checkbox::new(&mut self.capture_enabled, "Capture traffic to a file"),
            );

            ui.add_space(10.0);
            ui.horizontal(|ui| {
                let can_start = self.status == LinkStatus::Stopped;
                let can_stop = self.status != LinkStatus::Stopped;
                let can_test = self.status == LinkStatus::Running;

                if ui
                    .add_enabled(can_start, egui::Button::new("Start Virtual Null Modem"))
                    .clicked()
                {
                    self.start_link();
                }
                if ui
                    .add_enabled(can_stop, egui::Button::new("Stop Virtual Null Modem"))
                    .clicked()
                {
                    self.stop_link();
                }
                if ui
                    .add_enabled(can_test, egui::Button::new("Test Communication"))
                    .clicked()
                {
                    self.test_link();
                }
            });
        });
    }

    fn render_status(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.label(RichText::new("Status").strong());
            ui.add_space(5.0);

            egui::Grid::new("status_grid")
                .num_columns(2)
                .spacing([10.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Status:");
                    let (text, color) = match self.status {
                        LinkStatus::Stopped => ("Stopped", Color32::from_rgb(220, 80, 80)),
                        LinkStatus::Starting => ("Starting...", Color32::from_rgb(220, 180, 60)),
                        LinkStatus::Running => ("Running", Color32::from_rgb(80, 200, 100)),
                    };
                    ui.label(RichText::new(text).color(color).strong());
                    ui.end_row();

                    ui.label("Active Devices:");
                    match &self.active_devices {
                        Some((a, b)) if self.status != LinkStatus::Stopped => {
                            ui.label(format!("{a} <-> {b}"));
                        }
                        _ => {
                            ui.label("None");
                        }
                    }
                    ui.end_row();

                    // Skip stats rather than stall the frame while a worker
                    // holds the session.
                    if let Some(link) = self.link.try_lock() {
                        let stats = link.stats();
                        ui.label("Tests:");
                        ui.label(format!("{}/{} passed", stats.tests_passed, stats.tests_run));
                        ui.end_row();

                        if let Some(capture) = link.capture_stats() {
                            ui.label("Captured:");
                            ui.label(format!(
                                "{} bytes in {} frames",
                                capture.bytes_captured, capture.frames_captured
                            ));
                            ui.end_row();
                        }
                    }
                });

            egui::CollapsingHeader::new("Usage Instructions")
                .default_open(false)
                .show(ui, |ui| {
                    ui.label("1. Click 'Start Virtual Null Modem' to create the devices");
                    ui.label("2. Use the device paths shown above in your applications");
                    ui.label("3. Data sent to one device will appear on the other");
                    ui.label("4. Devices are created in /tmp/ (no root privileges required)");
                    ui.label("5. Compatible with any program that accepts custom port paths");
                });
        });
    }

    fn render_log(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("Log").strong());
                if ui.small_button("Clear Log").clicked() {
                    self.log_lines.clear();
                }
            });
            ui.add_space(5.0);

            egui::ScrollArea::vertical()
                .stick_to_bottom(true)
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for event in &self.log_lines {
                        let color = match event.level {
                            LogLevel::Info => ui.visuals().text_color(),
                            LogLevel::Warning => Color32::from_rgb(220, 180, 60),
                            LogLevel::Error => Color32::from_rgb(220, 80, 80),
                        };
                        ui.label(RichText::new(event.to_line()).color(color).monospace());
                    }
                });
        });
    }

    fn render_dialogs(&mut self, ctx: &egui::Context) {
        if let Some(message) = self.error_dialog.clone() {
            let mut open = true;
            let mut dismissed = false;
            egui::Window::new("Error")
                .open(&mut open)
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(message);
                    ui.add_space(10.0);
                    if ui.button("   OK   ").clicked() {
                        dismissed = true;
                    }
                });
            if !open || dismissed {
                self.error_dialog = None;
            }
        }

        if let Some(passed) = self.test_dialog {
            let mut open = true;
            let mut dismissed = false;
            egui::Window::new("Test Result")
                .open(&mut open)
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    if passed {
                        ui.label("Communication test passed!");
                    } else {
                        ui.label("Communication test failed! Check the log for details.");
                    }
                    ui.add_space(10.0);
                    if ui.button("   OK   ").clicked() {
                        dismissed = true;
                    }
                });
            if !open || dismissed {
                self.test_dialog = None;
            }
        }
    }
}

impl eframe::App for VcommApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_channels();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Vcomm - Virtual Null Modem");
            ui.add_space(10.0);

            self.render_config(ui);
            ui.add_space(10.0);
            self.render_status(ui);
            ui.add_space(10.0);
            self.render_log(ui);
        });

        self.render_dialogs(ctx);

        // Worker results and log events arrive without input events.
        ctx.request_repaint_after(Duration::from_millis(200));
    }
}

impl Drop for VcommApp {
    fn drop(&mut self) {
        self.poller_running.store(false, Ordering::Relaxed);
        self.link.lock().stop();

        self.config.device_a = self.device_a.trim().to_string();
        self.config.device_b = self.device_b.trim().to_string();
        self.config.capture.enabled = self.capture_enabled;
        if let Err(e) = self.config.save() {
            tracing::warn!("Failed to save config: {e}");
        }
    }
}
