//! Application settings

use crate::core::capture::CaptureConfig;
use crate::core::link::LinkConfig;
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// First endpoint path
    pub device_a: String,
    /// Second endpoint path
    pub device_b: String,
    /// Baud rate for the loopback test
    pub baud_rate: u32,
    /// Octal permission mode applied to both endpoints (e.g. "666")
    pub permissions: String,
    /// Start the link as soon as the GUI opens
    pub auto_start: bool,
    /// Traffic capture settings
    pub capture: CaptureConfig,
    /// Window state
    pub window: WindowConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device_a: "/tmp/ttyV0".to_string(),
            device_b: "/tmp/ttyV1".to_string(),
            baud_rate: 9600,
            permissions: "666".to_string(),
            auto_start: false,
            capture: CaptureConfig::default(),
            window: WindowConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config from file, falling back to defaults when absent
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = super::config_dir()
            .ok_or("Could not determine config directory")?
            .join("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        super::init_directories()?;
        let config_path = super::config_dir()
            .ok_or("Could not determine config directory")?
            .join("config.toml");

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Permission mode as an octal number, falling back to 0o666
    pub fn permission_mode(&self) -> u32 {
        u32::from_str_radix(self.permissions.trim(), 8).unwrap_or(0o666)
    }

    /// Link configuration derived from these settings
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig::new(&self.device_a, &self.device_b)
            .baud_rate(self.baud_rate)
            .permissions(self.permission_mode())
            .capture(self.capture.clone())
    }
}

/// Window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window width
    pub width: f32,
    /// Window height
    pub height: f32,
    /// Theme (light/dark)
    pub theme: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 560.0,
            theme: "dark".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::capture::CaptureFormat;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.device_a, "/tmp/ttyV0");
        assert_eq!(config.device_b, "/tmp/ttyV1");
        assert_eq!(config.baud_rate, 9600);
        assert!(!config.auto_start);
        assert!(!config.capture.enabled);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = AppConfig::default();
        config.device_a = "/tmp/ttyLeft".to_string();
        config.auto_start = true;
        config.capture.enabled = true;
        config.capture.format = CaptureFormat::Text;

        let serialized = toml::to_string_pretty(&config).unwrap();
        let restored: AppConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(restored.device_a, "/tmp/ttyLeft");
        assert!(restored.auto_start);
        assert!(restored.capture.enabled);
        assert_eq!(restored.capture.format, CaptureFormat::Text);
    }

    #[test]
    fn test_permission_mode_parsing() {
        let mut config = AppConfig::default();
        assert_eq!(config.permission_mode(), 0o666);

        config.permissions = "600".to_string();
        assert_eq!(config.permission_mode(), 0o600);

        config.permissions = "not-octal".to_string();
        assert_eq!(config.permission_mode(), 0o666);
    }

    #[test]
    fn test_link_config_mapping() {
        let mut config = AppConfig::default();
        config.permissions = "644".to_string();
        config.baud_rate = 115_200;

        let link = config.link_config();
        assert_eq!(link.device_a, "/tmp/ttyV0");
        assert_eq!(link.baud_rate, 115_200);
        assert_eq!(link.permissions, 0o644);
    }
}
