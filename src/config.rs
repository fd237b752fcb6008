//! Runtime configuration.
//!
//! Holds execution device selection, path configuration, and the explicit
//! credential record for the hosted APIs. Credentials are read from the
//! environment exactly once at process start and threaded through as values;
//! a missing key is a constructable error raised when the feature needing it
//! is requested, never a deferred surprise.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{PipelineError, Result};

/// Environment variable holding the chat-completion API key.
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";

/// Environment variable holding the speech-synthesis API key.
pub const ELEVEN_KEY_VAR: &str = "ELEVEN_API_KEY";

/// Execution device for ONNX inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Automatically detect and use the best available device.
    /// Priority: CUDA > CoreML > CPU.
    #[default]
    Auto,

    /// Force CPU execution.
    /// Slowest but universally available.
    Cpu,

    /// Use CUDA for NVIDIA GPU acceleration.
    Cuda,

    /// Use Metal/CoreML for Apple Silicon acceleration.
    Metal,
}

impl Device {
    /// Returns the string representation of the device.
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Auto => "auto",
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
            Device::Metal => "metal",
        }
    }

    /// Parses a device from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(Device::Auto),
            "cpu" => Some(Device::Cpu),
            "cuda" => Some(Device::Cuda),
            "metal" | "coreml" => Some(Device::Metal),
            _ => None,
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Runtime configuration, typically loaded from command-line arguments or
/// environment variables at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory containing model weight files.
    /// If None, uses the platform-specific cache location.
    pub model_path: Option<PathBuf>,

    /// Directory where artifacts are written.
    /// If None, uses the current directory.
    pub output_path: Option<PathBuf>,

    /// Execution device for inference.
    pub device: Device,

    /// Number of threads for intra-op parallelism in ONNX Runtime.
    /// If None, uses ONNX Runtime's default.
    pub threads: Option<u32>,
}

impl AppConfig {
    /// Creates an AppConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an AppConfig from environment variables.
    ///
    /// Reads the following, falling back to defaults for unset variables:
    /// - `TRACKFORGE_MODEL_PATH` - model weight directory
    /// - `TRACKFORGE_OUTPUT_PATH` - artifact output directory
    /// - `TRACKFORGE_DEVICE` - device selection (auto, cpu, cuda, metal)
    /// - `TRACKFORGE_THREADS` - thread count for CPU execution
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("TRACKFORGE_MODEL_PATH") {
            config.model_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("TRACKFORGE_OUTPUT_PATH") {
            config.output_path = Some(PathBuf::from(path));
        }

        if let Ok(device_str) = std::env::var("TRACKFORGE_DEVICE") {
            if let Some(device) = Device::parse(&device_str) {
                config.device = device;
            }
        }

        if let Ok(threads_str) = std::env::var("TRACKFORGE_THREADS") {
            if let Ok(threads) = threads_str.parse::<u32>() {
                if threads > 0 {
                    config.threads = Some(threads);
                }
            }
        }

        config
    }

    /// Returns the effective model path, using the platform default if not
    /// specified.
    pub fn effective_model_path(&self) -> PathBuf {
        if let Some(ref path) = self.model_path {
            path.clone()
        } else {
            default_model_path()
        }
    }

    /// Returns the effective output path, defaulting to the current
    /// directory.
    pub fn effective_output_path(&self) -> PathBuf {
        if let Some(ref path) = self.output_path {
            path.clone()
        } else {
            PathBuf::from(".")
        }
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if let Some(threads) = self.threads {
            if threads == 0 {
                return Some("threads must be > 0".to_string());
            }
            if threads > 256 {
                return Some(format!("threads too high: {} (max 256)", threads));
            }
        }

        None
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            output_path: None,
            device: Device::Auto,
            threads: None,
        }
    }
}

/// API credentials for the hosted services, read once at startup.
///
/// Both keys are optional at load time; `require_*` turns absence into a
/// MISSING_CREDENTIAL error at the point where the feature is requested.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Chat-completion API key, if configured.
    pub openai_api_key: Option<String>,

    /// Speech-synthesis API key, if configured.
    pub eleven_api_key: Option<String>,
}

impl Credentials {
    /// Reads both keys from the process environment.
    ///
    /// Empty values count as absent.
    pub fn from_env() -> Self {
        let read = |var: &str| std::env::var(var).ok().filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: read(OPENAI_KEY_VAR),
            eleven_api_key: read(ELEVEN_KEY_VAR),
        }
    }

    /// Returns the chat-completion key or a MISSING_CREDENTIAL error.
    pub fn require_openai(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| PipelineError::missing_credential(OPENAI_KEY_VAR))
    }

    /// Returns the speech-synthesis key or a MISSING_CREDENTIAL error.
    pub fn require_eleven(&self) -> Result<&str> {
        self.eleven_api_key
            .as_deref()
            .ok_or_else(|| PipelineError::missing_credential(ELEVEN_KEY_VAR))
    }
}

/// Returns the platform-specific default model storage path.
///
/// Uses the `directories` crate to find appropriate locations:
/// - macOS: ~/Library/Caches/trackforge/musicgen
/// - Linux: ~/.cache/trackforge/musicgen
/// - Windows: C:\Users\<user>\AppData\Local\trackforge\cache\musicgen
pub fn default_model_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "trackforge") {
        proj_dirs.cache_dir().join("musicgen")
    } else {
        // Fallback to current directory
        PathBuf::from("./models")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn device_parsing() {
        assert_eq!(Device::parse("auto"), Some(Device::Auto));
        assert_eq!(Device::parse("CPU"), Some(Device::Cpu));
        assert_eq!(Device::parse("cuda"), Some(Device::Cuda));
        assert_eq!(Device::parse("metal"), Some(Device::Metal));
        assert_eq!(Device::parse("coreml"), Some(Device::Metal));
        assert_eq!(Device::parse("npu"), None);
    }

    #[test]
    fn config_validation() {
        let mut config = AppConfig::new();
        assert!(config.validate().is_none());

        config.threads = Some(0);
        assert!(config.validate().is_some());

        config.threads = Some(4);
        assert!(config.validate().is_none());
    }

    #[test]
    fn effective_paths_non_empty() {
        let config = AppConfig::new();
        assert!(!config.effective_model_path().as_os_str().is_empty());
        assert!(!config.effective_output_path().as_os_str().is_empty());
    }

    #[test]
    fn missing_credentials_are_constructable_errors() {
        let creds = Credentials::default();
        let err = creds.require_openai().unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingCredential);
        assert!(err.message.contains(OPENAI_KEY_VAR));

        let err = creds.require_eleven().unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingCredential);
    }

    #[test]
    fn present_credentials_pass_through() {
        let creds = Credentials {
            openai_api_key: Some("sk-test".to_string()),
            eleven_api_key: None,
        };
        assert_eq!(creds.require_openai().unwrap(), "sk-test");
        assert!(creds.require_eleven().is_err());
    }
}
