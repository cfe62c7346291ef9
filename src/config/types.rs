use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the CLI plays a file through the data source.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Bytes requested per upstream read
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,

    /// Pause between reads, simulating a slow download
    #[serde(default)]
    pub throttle_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: default_read_chunk_size(),
            throttle_ms: 0,
        }
    }
}

fn default_read_chunk_size() -> usize {
    16 * 1024
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default tracing filter directive, used when `RUST_LOG` is unset
    #[serde(default)]
    pub filter: Option<String>,
}
