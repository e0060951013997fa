//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// RecognitionConfig
// ---------------------------------------------------------------------------

/// Settings for the external ingredient recognition service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Base URL of an OpenAI-compatible endpoint with vision support.
    ///
    /// - Ollama default: `http://localhost:11434`
    /// - OpenAI: `https://api.openai.com`
    pub base_url: String,
    /// API key: `None` for local providers.
    pub api_key: Option<String>,
    /// Vision model identifier (e.g. `"llava:7b"`, `"gpt-4o-mini"`).
    pub model: String,
    /// Sampling temperature (0.0 – 1.0).
    pub temperature: f32,
    /// Maximum seconds to wait for a recognition response.
    pub timeout_secs: u64,
    /// Minimum confidence (0.0 – 1.0) for a match to be proposed to the
    /// user.  Anything below drops straight into manual entry.
    pub threshold: f32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            api_key: None,
            model: "llava:7b".into(),
            temperature: 0.1,
            timeout_secs: 20,
            threshold: 0.7,
        }
    }
}

// ---------------------------------------------------------------------------
// ScanConfig
// ---------------------------------------------------------------------------

/// Timing of the capture loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Milliseconds between capture ticks while scanning.
    pub interval_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { interval_ms: 3_000 }
    }
}

impl ScanConfig {
    /// Tick period as a [`std::time::Duration`].  Zero is bumped to 1 ms
    /// because `tokio::time::interval` panics on a zero period.
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_ms.max(1))
    }
}

// ---------------------------------------------------------------------------
// CameraConfig
// ---------------------------------------------------------------------------

/// Camera device and frame encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Zero-based index of the capture device.
    pub device_index: u32,
    /// JPEG quality (1 – 100) used when encoding sampled frames.
    pub jpeg_quality: u8,
    /// Frames wider than this are downscaled before upload.
    pub max_width: u32,
    /// Turn the camera on as soon as the window opens.
    pub activate_on_start: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            jpeg_quality: 80,
            max_width: 1024,
            activate_on_start: true,
        }
    }
}

// ---------------------------------------------------------------------------
// RecipeConfig
// ---------------------------------------------------------------------------

/// Settings for the recipe assistant (suggest / customize / adapt).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeConfig {
    /// Base URL of an OpenAI-compatible chat-completions endpoint.
    pub base_url: String,
    /// API key: `None` for local providers.
    pub api_key: Option<String>,
    /// Model identifier sent to the API.
    pub model: String,
    /// Sampling temperature (0.0 – 1.0).
    pub temperature: f32,
    /// Maximum seconds to wait for a response.
    pub timeout_secs: u64,
}

impl Default for RecipeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            api_key: None,
            model: "qwen2.5:7b".into(),
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Initial inner size of the window `(width, height)` in points.
    pub window_size: (f32, f32),
    /// Keep the window above all other windows.
    pub always_on_top: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_size: (420.0, 560.0),
            always_on_top: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use ingredient_scanner::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// assert!(config.recognition.threshold <= 1.0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Recognition service settings.
    pub recognition: RecognitionConfig,
    /// Capture loop timing.
    pub scan: ScanConfig,
    /// Camera device settings.
    pub camera: CameraConfig,
    /// Recipe assistant settings.
    pub recipes: RecipeConfig,
    /// Window settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// so callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.recognition.base_url, loaded.recognition.base_url);
        assert_eq!(original.recognition.api_key, loaded.recognition.api_key);
        assert_eq!(original.recognition.model, loaded.recognition.model);
        assert_eq!(original.recognition.threshold, loaded.recognition.threshold);
        assert_eq!(original.scan.interval_ms, loaded.scan.interval_ms);
        assert_eq!(original.camera.device_index, loaded.camera.device_index);
        assert_eq!(original.camera.jpeg_quality, loaded.camera.jpeg_quality);
        assert_eq!(original.recipes.model, loaded.recipes.model);
        assert_eq!(original.ui.window_size, loaded.ui.window_size);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.recognition.model, default.recognition.model);
        assert_eq!(config.scan.interval_ms, default.scan.interval_ms);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.recognition.threshold, 0.7);
        assert_eq!(cfg.recognition.base_url, "http://localhost:11434");
        assert!(cfg.recognition.api_key.is_none());
        assert_eq!(cfg.scan.interval_ms, 3_000);
        assert_eq!(cfg.camera.device_index, 0);
        assert_eq!(cfg.camera.jpeg_quality, 80);
        assert!(cfg.camera.activate_on_start);
    }

    /// A file that only sets a few keys still loads; the rest are defaults.
    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[recognition]\nthreshold = 0.85\n").expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.recognition.threshold, 0.85);
        assert_eq!(cfg.recognition.model, "llava:7b");
        assert_eq!(cfg.scan.interval_ms, 3_000);
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.recognition.base_url = "https://api.openai.com".into();
        cfg.recognition.api_key = Some("sk-test".into());
        cfg.recognition.model = "gpt-4o-mini".into();
        cfg.scan.interval_ms = 1_500;
        cfg.camera.device_index = 2;
        cfg.camera.activate_on_start = false;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.recognition.base_url, "https://api.openai.com");
        assert_eq!(loaded.recognition.api_key, Some("sk-test".into()));
        assert_eq!(loaded.recognition.model, "gpt-4o-mini");
        assert_eq!(loaded.scan.interval_ms, 1_500);
        assert_eq!(loaded.camera.device_index, 2);
        assert!(!loaded.camera.activate_on_start);
    }

    #[test]
    fn save_creates_the_app_dir() {
        let dir = tempdir().expect("temp dir");
        let paths = AppPaths::under(dir.path());
        assert!(!paths.config_dir.exists());

        AppConfig::default().save_to(&paths.settings_file).expect("save");

        assert!(paths.settings_file.is_file());
        let text = std::fs::read_to_string(&paths.settings_file).expect("read");
        assert!(text.contains("[recognition]"));
        assert!(text.contains("[recipes]"));
    }

    #[test]
    fn zero_interval_is_clamped() {
        let scan = ScanConfig { interval_ms: 0 };
        assert_eq!(scan.interval(), std::time::Duration::from_millis(1));
    }
}
