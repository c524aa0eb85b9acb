use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::Argon2Params;
use crate::errors::{CaskError, Result};
use crate::vault::CharsetPolicy;

/// User configuration, loaded from `.cask.toml`.
///
/// Every field has a sensible default so Cask works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Seconds without an accepted command before the session stops.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Seconds a copied secret stays on the clipboard.
    #[serde(default = "default_clipboard_clear_secs")]
    pub clipboard_clear_secs: u64,

    /// Argon2 memory cost in KiB for new vaults (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count for new vaults (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree for new vaults (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// Default length of `gen` secrets.
    #[serde(default = "default_generate_length")]
    pub generate_length: usize,

    /// Whether `gen` includes symbols by default.
    #[serde(default = "default_true")]
    pub generate_symbols: bool,

    /// Whether `gen` includes digits by default.
    #[serde(default = "default_true")]
    pub generate_digits: bool,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_idle_timeout_secs() -> u64 {
    300 // 5 minutes
}

fn default_clipboard_clear_secs() -> u64 {
    30
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_generate_length() -> usize {
    24
}

fn default_true() -> bool {
    true
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            clipboard_clear_secs: default_clipboard_clear_secs(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            generate_length: default_generate_length(),
            generate_symbols: default_true(),
            generate_digits: default_true(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the working directory.
    pub const FILE_NAME: &'static str = ".cask.toml";

    /// Load settings from `<dir>/.cask.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load_file(&config_path)
    }

    /// Load settings from an explicit file, which must exist and parse.
    pub fn load_file(config_path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            CaskError::ConfigError(format!("Failed to read {}: {e}", config_path.display()))
        })?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            CaskError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;
        settings.validate().map_err(|e| {
            CaskError::ConfigError(format!("Invalid {}: {e}", config_path.display()))
        })?;

        tracing::debug!(path = %config_path.display(), "loaded settings");
        Ok(settings)
    }

    /// Reject values the session cannot run with.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.idle_timeout_secs == 0 {
            return Err("idle_timeout_secs must be greater than zero".into());
        }
        Ok(())
    }

    /// Idle timeout as a `Duration`.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Clipboard auto-clear delay as a `Duration`.
    pub fn clipboard_clear_after(&self) -> Duration {
        Duration::from_secs(self.clipboard_clear_secs)
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }

    /// The default charset policy for `gen`.
    pub fn charset_policy(&self) -> CharsetPolicy {
        CharsetPolicy {
            include_symbols: self.generate_symbols,
            include_digits: self.generate_digits,
            ..CharsetPolicy::default()
        }
    }
}

/// Parse a duration like `90s`, `5m`, `1h` or a bare number of seconds.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let input = input.trim();

    let (num_str, unit) = if let Some(s) = input.strip_suffix('s') {
        (s, 's')
    } else if let Some(s) = input.strip_suffix('m') {
        (s, 'm')
    } else if let Some(s) = input.strip_suffix('h') {
        (s, 'h')
    } else {
        (input, 's')
    };

    let num: u64 = num_str.trim().parse().map_err(|_| {
        CaskError::ConfigError(format!(
            "invalid duration '{input}' — use a format like 90s, 5m, or 1h"
        ))
    })?;

    let secs = match unit {
        'm' => num.checked_mul(60),
        'h' => num.checked_mul(3_600),
        _ => Some(num),
    }
    .ok_or_else(|| CaskError::ConfigError(format!("duration '{input}' is too large")))?;

    if secs == 0 {
        return Err(CaskError::ConfigError(
            "duration must be greater than zero".into(),
        ));
    }

    Ok(Duration::from_secs(secs))
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.idle_timeout(), Duration::from_secs(300));
        assert_eq!(s.clipboard_clear_secs, 30);
        assert_eq!(s.argon2_memory_kib, 65_536);
        assert_eq!(s.argon2_iterations, 3);
        assert_eq!(s.argon2_parallelism, 4);
        assert_eq!(s.generate_length, 24);
        assert!(s.generate_symbols);
        assert!(s.generate_digits);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.idle_timeout_secs, 300);
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
idle_timeout_secs = 60
clipboard_clear_secs = 10
argon2_memory_kib = 131072
argon2_iterations = 5
argon2_parallelism = 8
generate_length = 32
generate_symbols = false
"#;
        fs::write(tmp.path().join(".cask.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.idle_timeout(), Duration::from_secs(60));
        assert_eq!(settings.clipboard_clear_after(), Duration::from_secs(10));
        assert_eq!(settings.argon2_params().memory_kib, 131_072);
        assert_eq!(settings.argon2_params().iterations, 5);
        assert_eq!(settings.argon2_params().parallelism, 8);
        assert_eq!(settings.generate_length, 32);
        assert!(!settings.charset_policy().include_symbols);
        assert!(settings.charset_policy().include_digits);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".cask.toml"), "idle_timeout_secs = 10\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.idle_timeout_secs, 10);
        assert_eq!(settings.argon2_iterations, 3);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".cask.toml"), "not valid {{toml").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn load_rejects_zero_idle_timeout() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".cask.toml"), "idle_timeout_secs = 0\n").unwrap();

        let err = Settings::load(tmp.path()).unwrap_err();
        assert!(matches!(err, CaskError::ConfigError(_)));
        assert!(err.to_string().contains("idle_timeout_secs"));
    }

    #[test]
    fn load_accepts_huge_idle_timeout() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(".cask.toml"),
            "idle_timeout_secs = 9223372036854775807\n",
        )
        .unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.idle_timeout(), Duration::from_secs(i64::MAX as u64));
    }

    #[test]
    fn load_file_errors_when_missing() {
        let tmp = TempDir::new().unwrap();
        assert!(Settings::load_file(&tmp.path().join("nope.toml")).is_err());
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3_600));
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("xm").is_err());
        assert!(parse_duration("0s").is_err());
    }
}
