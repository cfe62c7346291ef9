mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Largest accepted `read_chunk_size`.
pub const MAX_READ_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./tracktap.toml",
        "~/.config/tracktap/config.toml",
        "/etc/tracktap/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration, rejecting values that cannot work
pub fn validate_config(config: &Config) -> Result<()> {
    if config.source.read_chunk_size == 0 {
        anyhow::bail!("source.read_chunk_size cannot be 0");
    }
    if config.source.read_chunk_size > MAX_READ_CHUNK_SIZE {
        anyhow::bail!(
            "source.read_chunk_size {} exceeds the maximum of {}",
            config.source.read_chunk_size,
            MAX_READ_CHUNK_SIZE
        );
    }

    Ok(())
}

/// Log warnings for values that are accepted but probably unintended.
///
/// Called once logging is set up, so the warnings are not lost.
pub fn warn_config(config: &Config) {
    if config.source.throttle_ms > 10_000 {
        tracing::warn!(
            throttle_ms = config.source.throttle_ms,
            "Very large read throttle configured"
        );
    }

    if let Some(filter) = &config.logging.filter {
        if filter.trim().is_empty() {
            tracing::warn!("Empty logging filter, falling back to defaults");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.source.read_chunk_size, 16384);
        assert_eq!(config.source.throttle_ms, 0);
        assert!(config.logging.filter.is_none());
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.source.read_chunk_size, 16384);
    }

    #[test]
    fn test_partial_section() {
        let file = write_config("[source]\nthrottle_ms = 5\n\n[logging]\nfilter = \"tracktap=trace\"\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.source.read_chunk_size, 16384);
        assert_eq!(config.source.throttle_ms, 5);
        assert_eq!(config.logging.filter.as_deref(), Some("tracktap=trace"));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let file = write_config("[source]\nread_chunk_size = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("read_chunk_size"));
    }

    #[test]
    fn test_oversized_chunk_rejected() {
        let mut config = Config::default();
        config.source.read_chunk_size = MAX_READ_CHUNK_SIZE + 1;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let file = write_config("[source\nread_chunk_size = 1");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_questionable_values_still_valid() {
        let file = write_config("[source]\nthrottle_ms = 20000\n\n[logging]\nfilter = \"\"\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.source.throttle_ms, 20_000);
        warn_config(&config);
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(load_config_or_default(Some(&path)).is_err());
    }
}
