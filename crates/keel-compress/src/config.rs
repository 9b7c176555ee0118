//! Compressor configuration surface

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default zstd compression level
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Default scratch buffer size, the codec's recommended streaming output
/// chunk
pub const DEFAULT_CHUNK_SIZE: usize = 128 * 1024;

/// Default input size below which a flush skips the accelerator
pub const DEFAULT_FALLBACK_THRESHOLD: usize = 4000;

/// Match-finding strategy hint for the software path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Let the codec pick for the configured level
    #[default]
    Default,
    /// Fastest match finder, lowest ratio
    Fast,
    /// Double-fast hashing
    Dfast,
    /// Greedy matching
    Greedy,
    /// Lazy matching
    Lazy,
    /// Lazy matching, two attempts
    Lazy2,
    /// Binary-tree lazy matching
    Btlazy2,
    /// Binary-tree optimal parser
    Btopt,
    /// Optimal parser, higher effort
    Btultra,
    /// Strongest strategy, highest cost
    Btultra2,
}

impl Strategy {
    pub(crate) fn to_codec(self) -> Option<zstd::zstd_safe::Strategy> {
        use zstd::zstd_safe::Strategy as Z;
        match self {
            Strategy::Default => None,
            Strategy::Fast => Some(Z::ZSTD_fast),
            Strategy::Dfast => Some(Z::ZSTD_dfast),
            Strategy::Greedy => Some(Z::ZSTD_greedy),
            Strategy::Lazy => Some(Z::ZSTD_lazy),
            Strategy::Lazy2 => Some(Z::ZSTD_lazy2),
            Strategy::Btlazy2 => Some(Z::ZSTD_btlazy2),
            Strategy::Btopt => Some(Z::ZSTD_btopt),
            Strategy::Btultra => Some(Z::ZSTD_btultra),
            Strategy::Btultra2 => Some(Z::ZSTD_btultra2),
        }
    }
}

/// Streaming compressor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressorConfig {
    /// Compression level (1-22); ignored when a dictionary is bound, since
    /// the dictionary fixes its own level
    #[serde(default = "default_level")]
    pub compression_level: i32,

    /// Append a checksum to every frame
    #[serde(default)]
    pub enable_checksum: bool,

    /// Match-finding strategy hint
    #[serde(default)]
    pub strategy: Strategy,

    /// Size of the reusable output scratch buffer in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Offload sequence production to the accelerator
    #[serde(default)]
    pub enable_acceleration: bool,

    /// Flushes smaller than this use the software path even when
    /// acceleration is enabled
    #[serde(default = "default_fallback_threshold")]
    pub fallback_threshold: usize,

    /// Optional dictionary bytes to bind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<Vec<u8>>,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            enable_checksum: false,
            strategy: Strategy::Default,
            chunk_size: DEFAULT_CHUNK_SIZE,
            enable_acceleration: false,
            fallback_threshold: DEFAULT_FALLBACK_THRESHOLD,
            dictionary: None,
        }
    }
}

fn default_level() -> i32 {
    DEFAULT_COMPRESSION_LEVEL
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_fallback_threshold() -> usize {
    DEFAULT_FALLBACK_THRESHOLD
}

impl CompressorConfig {
    /// Reject values the codec cannot honor
    ///
    /// # Errors
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<()> {
        if !(1..=22).contains(&self.compression_level) {
            return Err(Error::InvalidLevel(self.compression_level));
        }
        if self.chunk_size == 0 {
            return Err(Error::InvalidChunkSize(self.chunk_size));
        }
        if let Some(dictionary) = &self.dictionary {
            if dictionary.is_empty() {
                return Err(Error::Dictionary("dictionary is empty".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CompressorConfig::default();
        config.validate().unwrap();
        assert_eq!(config.compression_level, 3);
        assert_eq!(config.chunk_size, 128 * 1024);
        assert_eq!(config.fallback_threshold, 4000);
        assert!(!config.enable_acceleration);
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: CompressorConfig =
            serde_json::from_str(r#"{"enable_acceleration": true, "strategy": "lazy2"}"#).unwrap();
        assert!(config.enable_acceleration);
        assert_eq!(config.strategy, Strategy::Lazy2);
        assert_eq!(config.compression_level, DEFAULT_COMPRESSION_LEVEL);
        assert_eq!(config.fallback_threshold, DEFAULT_FALLBACK_THRESHOLD);
    }

    #[test]
    fn test_validate_rejects_bad_level() {
        let config = CompressorConfig {
            compression_level: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidLevel(0))));

        let config = CompressorConfig {
            compression_level: 23,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidLevel(23))));
    }

    #[test]
    fn test_validate_rejects_zero_chunk() {
        let config = CompressorConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidChunkSize(0))));
    }

    #[test]
    fn test_validate_rejects_empty_dictionary() {
        let config = CompressorConfig {
            dictionary: Some(Vec::new()),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Dictionary(_))));
    }
}
