//! Pipeline Configuration
//!
//! Settings are plain serde structs with defaults matching the reference
//! sensor (16384Hz sampling, 0.25Hz output grid). They can be loaded from a
//! JSON file; any missing field falls back to its default.
//!
//! # Storage Locations
//! - Linux: `~/.config/tremor/config.json`
//! - Windows: `%APPDATA%\tremor\tremor\config\config.json`
//! - macOS: `~/Library/Application Support/com.tremor.tremor/config.json`

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use tremor_dsp::{SpectrumConfig, DEFAULT_FREQUENCY_STEP_HZ, DEFAULT_SAMPLE_RATE_HZ};

use crate::error::{CoreError, CoreResult};

/// Spectral analysis parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumSettings {
    /// Sensor sampling rate in Hz
    pub sample_rate_hz: f64,

    /// Spacing of the output frequency grid in Hz
    pub frequency_step_hz: f64,
}

impl Default for SpectrumSettings {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            frequency_step_hz: DEFAULT_FREQUENCY_STEP_HZ,
        }
    }
}

impl SpectrumSettings {
    /// Validated analyzer configuration
    pub fn to_spectrum_config(&self) -> CoreResult<SpectrumConfig> {
        Ok(SpectrumConfig::new(
            self.sample_rate_hz,
            self.frequency_step_hz,
        )?)
    }
}

/// Overall pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub spectrum: SpectrumSettings,

    /// Per-subscriber queue depth; a subscriber this far behind misses events
    pub subscriber_capacity: usize,

    /// Messages buffered between the transport and the ingest thread
    pub ingest_queue_capacity: usize,

    /// Whether the first payload is written to disk
    pub capture_enabled: bool,

    /// Where the capture file goes (platform data dir when unset)
    pub capture_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            spectrum: SpectrumSettings::default(),
            subscriber_capacity: 16,
            ingest_queue_capacity: 64,
            capture_enabled: true,
            capture_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Validate configuration
    pub fn validate(&self) -> CoreResult<()> {
        self.spectrum.to_spectrum_config()?;
        if self.subscriber_capacity == 0 {
            return Err(CoreError::ConfigError(
                "subscriber_capacity must be at least 1".into(),
            ));
        }
        if self.ingest_queue_capacity == 0 {
            return Err(CoreError::ConfigError(
                "ingest_queue_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Read and validate a JSON config file
    pub fn load_from(path: &Path) -> CoreResult<Self> {
        let file = fs::File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the platform config path, or return default if missing/invalid
    pub fn load() -> Self {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                match Self::load_from(&path) {
                    Ok(config) => {
                        info!("Config loaded from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        error!("Failed to load config file {:?}: {}", path, e);
                    }
                }
            }
        }

        info!("Using default config");
        Self::default()
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;

        info!("Config saved to {:?}", path);
        Ok(())
    }

    /// Platform-specific configuration file path
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|proj| proj.config_dir().join("config.json"))
    }

    /// Capture directory, resolving the platform default when unset
    pub fn resolved_capture_dir(&self) -> CoreResult<PathBuf> {
        match &self.capture_dir {
            Some(dir) => Ok(dir.clone()),
            None => project_dirs()
                .map(|proj| proj.data_dir().join("captures"))
                .ok_or(CoreError::NoPlatformDirectory("captures")),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "tremor", "tremor")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.spectrum.sample_rate_hz, 16384.0);
        assert_eq!(config.spectrum.frequency_step_hz, 0.25);
        assert_eq!(config.subscriber_capacity, 16);
        assert!(config.capture_enabled);
        assert!(config.capture_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let invalid_rate = PipelineConfig {
            spectrum: SpectrumSettings {
                sample_rate_hz: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            invalid_rate.validate(),
            Err(CoreError::DspError(_))
        ));

        let invalid_capacity = PipelineConfig {
            subscriber_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            invalid_capacity.validate(),
            Err(CoreError::ConfigError(_))
        ));

        let invalid_queue = PipelineConfig {
            ingest_queue_capacity: 0,
            ..Default::default()
        };
        assert!(invalid_queue.validate().is_err());
    }

    #[test]
    fn test_spectrum_settings_conversion() {
        let settings = SpectrumSettings {
            sample_rate_hz: 100.0,
            frequency_step_hz: 1.0,
        };
        let config = settings.to_spectrum_config().unwrap();
        assert_eq!(config.nyquist_hz(), 50.0);
    }

    #[test]
    fn test_config_serialization() {
        let config = PipelineConfig {
            capture_dir: Some(PathBuf::from("/tmp/tremor")),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_fields_default() {
        let partial = r#"{ "spectrum": { "sample_rate_hz": 1000.0 }, "capture_enabled": false }"#;
        let config: PipelineConfig = serde_json::from_str(partial).unwrap();

        assert_eq!(config.spectrum.sample_rate_hz, 1000.0);
        assert_eq!(config.spectrum.frequency_step_hz, 0.25);
        assert!(!config.capture_enabled);
        assert_eq!(config.ingest_queue_capacity, 64);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = PipelineConfig {
            subscriber_capacity: 4,
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = PipelineConfig::load_from(&path).unwrap();
        assert_eq!(loaded.subscriber_capacity, 4);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "subscriber_capacity": 0 }"#).unwrap();
        assert!(PipelineConfig::load_from(&path).is_err());

        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            PipelineConfig::load_from(&path),
            Err(CoreError::Json(_))
        ));
    }

    #[test]
    fn test_explicit_capture_dir_wins() {
        let config = PipelineConfig {
            capture_dir: Some(PathBuf::from("/var/lib/tremor")),
            ..Default::default()
        };
        assert_eq!(
            config.resolved_capture_dir().unwrap(),
            PathBuf::from("/var/lib/tremor")
        );
    }
}
