//! Display configuration
//!
//! ```yaml
//! max_fragment_len: 120
//! frames_per_second: 8
//! poll_interval_ms: 10
//! autostart: true
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::FrameRate;
use crate::{Result, TransferError};

/// Settings for an animated display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    /// Largest fragment carried by one QR frame, in bytes
    pub max_fragment_len: usize,

    /// Animation cadence
    pub frames_per_second: FrameRate,

    /// Granularity of the timer that checks for due frames
    pub poll_interval_ms: u64,

    /// Start cycling as soon as the display opens
    pub autostart: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_fragment_len: 200,
            frames_per_second: FrameRate::default(),
            poll_interval_ms: 10,
            autostart: false,
        }
    }
}

impl DisplayConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: DisplayConfig = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            TransferError::config_error(path.display().to_string(), e.to_string())
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_fragment_len == 0 {
            return Err(TransferError::config_error(
                "max_fragment_len",
                "must be greater than zero",
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(TransferError::config_error(
                "poll_interval_ms",
                "must be at least one millisecond",
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        let config = DisplayConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, DisplayConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
    }

    #[test]
    fn parses_all_fields() {
        let config = DisplayConfig::from_yaml_str(
            "max_fragment_len: 120\nframes_per_second: 8\npoll_interval_ms: 5\nautostart: true\n",
        )
        .unwrap();
        assert_eq!(config.max_fragment_len, 120);
        assert_eq!(config.frames_per_second.fps(), 8.0);
        assert_eq!(config.poll_interval_ms, 5);
        assert!(config.autostart);
    }

    #[test]
    fn rejects_invalid_values() {
        for yaml in [
            "max_fragment_len: 0",
            "poll_interval_ms: 0",
            "frames_per_second: -2",
            "frame_rate: 4",
        ] {
            let result = DisplayConfig::from_yaml_str(yaml);
            assert!(matches!(result, Err(TransferError::Config { .. })), "accepted {:?}", yaml);
        }
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "frames_per_second: 2.5").unwrap();
        let config = DisplayConfig::from_path(file.path()).unwrap();
        assert_eq!(config.frames_per_second.fps(), 2.5);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = DisplayConfig::from_path("/nonexistent/qrstream.yaml");
        assert!(matches!(result, Err(TransferError::Config { .. })));
    }
}
